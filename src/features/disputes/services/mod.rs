mod dispute_service;

pub use dispute_service::DisputeService;
