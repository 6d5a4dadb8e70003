//! Synchronization primitives for the transmit path
//!
//! Spin locks only: every lock in the engine is held for a handful of
//! queue operations and never across a hardware call.

pub use spin::Mutex;
pub use spin::MutexGuard;
pub use spin::RwLock;
pub use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, AtomicUsize, Ordering};
