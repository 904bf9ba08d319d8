pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state_machine;

pub use handlers::InspectionState;
pub use services::{InspectionService, LifecycleService, TemplateService};
