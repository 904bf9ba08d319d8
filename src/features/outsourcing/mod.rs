pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod token;

pub use handlers::OutsourcingState;
pub use services::{AccessTokenService, AssignmentService, ExternalInspectionService};
