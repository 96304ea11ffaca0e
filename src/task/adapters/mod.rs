//! Adapter implementations for task review ports.

pub mod memory;
