pub mod auth;
pub mod comparisons;
pub mod disputes;
pub mod inspections;
pub mod outsourcing;
