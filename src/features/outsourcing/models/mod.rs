mod access_token;
mod assignment;

pub use access_token::{AccessToken, IssuedAccessToken};
pub use assignment::{
    AssignedBy, Assignment, AssignmentResponse, AssignmentState, CreateAssignment,
};
