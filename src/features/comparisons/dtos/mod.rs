mod comparison_dto;

pub use comparison_dto::*;
