//! Concrete chart kinds.

pub mod process_flow;

pub use process_flow::ProcessFlow;
