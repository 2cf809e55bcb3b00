//! Database layer (in-process arena).

pub mod memory;

pub use memory::{MemoryDb, Tables};
