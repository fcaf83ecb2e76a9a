//! # Hub State
//!
//! In-memory state owned by the hub process.

mod registry;

pub use registry::{DrawerRegistry, DrawerSlot};
