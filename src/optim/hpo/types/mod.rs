//! Core HPO types

mod goal;
mod parameter;
mod space;
mod trial;


// Re-export all public types
pub use goal::Goal;
pub use parameter::{ParameterDomain, ParameterValue, Sample};
pub use space::HyperparameterSpace;
pub use trial::TrialResult;
