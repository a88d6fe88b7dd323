//! Spatial types for points, vectors, matrices and axis orientation.
//!
//! All host-side geometry is f64 nalgebra; tensors only appear once a grid
//! of points has to be pushed through a transform.

pub mod orientation;

pub use orientation::{AxisCode, Orientation};

pub type Point3 = nalgebra::Point3<f64>;
pub type Vector3 = nalgebra::Vector3<f64>;
pub type Matrix3 = nalgebra::Matrix3<f64>;
pub type Matrix4 = nalgebra::Matrix4<f64>;
