//! Tolerance checks, scoring and the bounded corrective pass over compiled days.

pub mod nutri_eval;
pub mod optimizer;
pub mod tolerances;

pub use nutri_eval::evaluate_day;
pub use optimizer::{engine_version, validate};
pub use tolerances::QaConfig;
