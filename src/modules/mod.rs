//! Modules layer - Infrastructure components
//!
//! Evidence blob storage and the Inspection Store repository.

pub mod storage;
pub mod store;
