mod access_token_service;
mod assignment_service;
mod external_service;

pub use access_token_service::AccessTokenService;
pub use assignment_service::AssignmentService;
pub use external_service::ExternalInspectionService;
