//! Closed set of model variants and the conventions tied to each.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RegistrationError;

/// Kind of transform a variant produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    /// 4×4 homogeneous matrix.
    Matrix,
    /// Dense displacement field.
    Dense,
}

/// Registration model variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    /// Full affine alignment.
    Affine,
    /// Rigid alignment.
    Rigid,
    /// Deformable only; assumes the inputs are already affinely aligned.
    Deform,
    /// Affine followed by deformable, in a single model.
    #[default]
    Joint,
}

impl ModelVariant {
    /// All variants.
    pub const ALL: [ModelVariant; 4] = [Self::Affine, Self::Rigid, Self::Deform, Self::Joint];

    /// Transform kind the model returns.
    pub fn output_kind(self) -> OutputKind {
        match self {
            Self::Affine | Self::Rigid => OutputKind::Matrix,
            Self::Deform | Self::Joint => OutputKind::Dense,
        }
    }

    /// True for affine and rigid models.
    pub fn is_matrix(self) -> bool {
        self.output_kind() == OutputKind::Matrix
    }

    /// Whether the moving network space is centered on the fixed image.
    pub fn centers_on_fixed(self) -> bool {
        matches!(self, Self::Deform)
    }

    /// Whether the model takes a regularization weight.
    pub fn takes_regularization(self) -> bool {
        !self.is_matrix()
    }

    /// Whether forward and backward outputs trade places before tagging.
    ///
    /// Persisted matrices map target to source while fields sample the
    /// source from the target grid, so only matrix outputs are swapped.
    pub fn swaps_outputs(self) -> bool {
        self.is_matrix()
    }

    /// Lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Affine => "affine",
            Self::Rigid => "rigid",
            Self::Deform => "deform",
            Self::Joint => "joint",
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelVariant {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| {
                RegistrationError::invalid_configuration(format!("unknown model variant '{s}'"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_variants_swap() {
        assert!(ModelVariant::Affine.swaps_outputs());
        assert!(ModelVariant::Rigid.swaps_outputs());
        assert!(!ModelVariant::Deform.swaps_outputs());
        assert!(!ModelVariant::Joint.swaps_outputs());
    }

    #[test]
    fn test_only_deform_centers_on_fixed() {
        let centered: Vec<_> = ModelVariant::ALL
            .into_iter()
            .filter(|v| v.centers_on_fixed())
            .collect();
        assert_eq!(centered, vec![ModelVariant::Deform]);
    }

    #[test]
    fn test_parse_roundtrip() {
        for variant in ModelVariant::ALL {
            assert_eq!(variant.to_string().parse::<ModelVariant>().unwrap(), variant);
        }
        assert!("bspline".parse::<ModelVariant>().is_err());
    }
}
