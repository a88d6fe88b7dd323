//! Axis orientation codes.
//!
//! A code such as `LIA` names, for each voxel axis in order, the world
//! direction that axis points toward (RAS world convention: `R` is +x,
//! `A` is +y, `S` is +z).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Matrix3;
use crate::error::{Result, SpatialError};

/// Direction a single voxel axis points toward in world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisCode {
    L,
    R,
    P,
    A,
    I,
    S,
}

impl AxisCode {
    /// World axis (0 = x, 1 = y, 2 = z) this code lies along.
    pub fn world_axis(self) -> usize {
        match self {
            AxisCode::L | AxisCode::R => 0,
            AxisCode::P | AxisCode::A => 1,
            AxisCode::I | AxisCode::S => 2,
        }
    }

    /// Sign of the world axis this code points toward.
    pub fn sign(self) -> f64 {
        match self {
            AxisCode::R | AxisCode::A | AxisCode::S => 1.0,
            AxisCode::L | AxisCode::P | AxisCode::I => -1.0,
        }
    }

    fn from_axis(world_axis: usize, positive: bool) -> Self {
        match (world_axis, positive) {
            (0, true) => AxisCode::R,
            (0, false) => AxisCode::L,
            (1, true) => AxisCode::A,
            (1, false) => AxisCode::P,
            (_, true) => AxisCode::S,
            (_, false) => AxisCode::I,
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'L' => Some(AxisCode::L),
            'R' => Some(AxisCode::R),
            'P' => Some(AxisCode::P),
            'A' => Some(AxisCode::A),
            'I' => Some(AxisCode::I),
            'S' => Some(AxisCode::S),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            AxisCode::L => 'L',
            AxisCode::R => 'R',
            AxisCode::P => 'P',
            AxisCode::A => 'A',
            AxisCode::I => 'I',
            AxisCode::S => 'S',
        }
    }
}

/// Orientation of the three voxel axes of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Orientation([AxisCode; 3]);

impl Orientation {
    /// Orientation of every network-space grid.
    pub const LIA: Orientation = Orientation([AxisCode::L, AxisCode::I, AxisCode::A]);

    /// Scanner-style right-anterior-superior orientation.
    pub const RAS: Orientation = Orientation([AxisCode::R, AxisCode::A, AxisCode::S]);

    /// Create an orientation, requiring each world axis exactly once.
    pub fn new(axes: [AxisCode; 3]) -> Result<Self> {
        let mut seen = [false; 3];
        for axis in axes {
            let w = axis.world_axis();
            if seen[w] {
                return Err(SpatialError::InvalidOrientation(Self(axes).to_string()));
            }
            seen[w] = true;
        }
        Ok(Self(axes))
    }

    /// Axis codes in voxel-axis order.
    pub fn axes(&self) -> [AxisCode; 3] {
        self.0
    }

    /// Signed permutation matrix whose column `i` is the world direction of voxel axis `i`.
    pub fn rotation(&self) -> Matrix3 {
        let mut m = Matrix3::zeros();
        for (col, axis) in self.0.iter().enumerate() {
            m[(axis.world_axis(), col)] = axis.sign();
        }
        m
    }

    /// Closest orientation code for an arbitrary direction matrix.
    ///
    /// Columns are matched greedily to world axes by decreasing magnitude, so
    /// oblique acquisitions still report a well-defined code.
    pub fn from_rotation(rotation: &Matrix3) -> Self {
        let mut entries: Vec<(usize, usize, f64)> = (0..3)
            .flat_map(|col| (0..3).map(move |row| (row, col)))
            .map(|(row, col)| (row, col, rotation[(row, col)]))
            .collect();
        entries.sort_by(|a, b| b.2.abs().total_cmp(&a.2.abs()));

        let mut axes = [AxisCode::R, AxisCode::A, AxisCode::S];
        let mut used_rows = [false; 3];
        let mut used_cols = [false; 3];
        for (row, col, value) in entries {
            if used_rows[row] || used_cols[col] {
                continue;
            }
            used_rows[row] = true;
            used_cols[col] = true;
            axes[col] = AxisCode::from_axis(row, value >= 0.0);
        }
        Self(axes)
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for axis in self.0 {
            write!(f, "{}", axis.as_char())?;
        }
        Ok(())
    }
}

impl FromStr for Orientation {
    type Err = SpatialError;

    fn from_str(code: &str) -> Result<Self> {
        let axes: Vec<AxisCode> = code.chars().filter_map(AxisCode::from_char).collect();
        if axes.len() != 3 || code.chars().count() != 3 {
            return Err(SpatialError::InvalidOrientation(code.to_string()));
        }
        Self::new([axes[0], axes[1], axes[2]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lia_rotation() {
        let m = Orientation::LIA.rotation();
        // L: voxel axis 0 toward -x
        assert_eq!(m[(0, 0)], -1.0);
        // I: voxel axis 1 toward -z
        assert_eq!(m[(2, 1)], -1.0);
        // A: voxel axis 2 toward +y
        assert_eq!(m[(1, 2)], 1.0);
        assert_eq!(m.iter().filter(|v| **v != 0.0).count(), 3);
    }

    #[test]
    fn test_parse_roundtrip() {
        let o: Orientation = "lia".parse().unwrap();
        assert_eq!(o, Orientation::LIA);
        assert_eq!(o.to_string(), "LIA");
    }

    #[test]
    fn test_parse_rejects_repeated_axis() {
        assert!("LRA".parse::<Orientation>().is_err());
        assert!("LI".parse::<Orientation>().is_err());
        assert!("LIAX".parse::<Orientation>().is_err());
    }

    #[test]
    fn test_from_rotation_recovers_code() {
        for code in ["LIA", "RAS", "PSL", "ILP"] {
            let o: Orientation = code.parse().unwrap();
            assert_eq!(Orientation::from_rotation(&o.rotation()), o);
        }
    }

    #[test]
    fn test_from_oblique_rotation() {
        let angle = 0.2f64;
        let rot = nalgebra::Rotation3::from_axis_angle(&nalgebra::Vector3::z_axis(), angle);
        let o = Orientation::from_rotation(rot.matrix());
        assert_eq!(o, Orientation::RAS);
    }
}
