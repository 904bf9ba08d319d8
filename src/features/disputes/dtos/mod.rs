mod dispute_dto;

pub use dispute_dto::*;
