mod access_handler;
mod assignment_handler;

pub use access_handler::*;
pub use assignment_handler::*;
