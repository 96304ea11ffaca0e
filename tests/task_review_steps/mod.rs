//! Step definitions for task review behaviour tests.

pub mod given;
pub mod then;
pub mod when;
pub mod world;
