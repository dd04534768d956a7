//! Feature standardization.
//!
//! - [`StandardScaler`] / [`FittedStandardScaler`]: z-score scaling with
//!   population standard deviation, typestate split between fitting and use.
//! - [`ScalerParams`]: the `{mean, scale}` pair persisted for later stages.
//! - [`normalize`] and [`NormalizeStage`]: raw dataset in, aligned
//!   labels / standardized features / scaler parameters out.

pub mod normalize;
pub mod scaler;

pub use normalize::{normalize, NormalizeStage, NormalizedOutput};
pub use scaler::{FittedStandardScaler, ScalerParams, StandardScaler};
