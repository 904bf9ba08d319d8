mod dispute;

pub use dispute::{DisputeStatus, ItemDispute, RaiseItemDispute};
