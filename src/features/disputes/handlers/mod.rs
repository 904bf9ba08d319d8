mod dispute_handler;

pub use dispute_handler::*;
