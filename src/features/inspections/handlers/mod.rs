mod inspection_handler;
mod template_handler;

pub use inspection_handler::*;
pub use template_handler::*;
