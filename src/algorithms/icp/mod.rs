//! Dense projective point-to-plane alignment.
//!
//! Contents:
//! - [`reduction`]: correspondence search and normal-equation accumulation
//! - [`estimator`]: the coarse-to-fine solver built on top of it

pub mod estimator;
pub mod reduction;

pub use estimator::{IcpConfig, IcpEstimate, IcpEstimator};
pub use reduction::CorrespondenceGates;
