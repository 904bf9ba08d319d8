mod comparison_service;

pub use comparison_service::{ClaimedRun, ComparisonDetail, ComparisonService};
