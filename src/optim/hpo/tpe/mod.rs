//! Tree-structured Parzen Estimator (TPE) optimizer
//!
//! Based on Bergstra et al. (2011) - Algorithms for Hyper-Parameter Optimization.
//! The model works in the search space's warped coordinates: log-scaled
//! ranges are modelled in log space, integer and categorical parameters as
//! unit cells.

mod optimizer;
mod parzen;

pub use optimizer::TPEOptimizer;
