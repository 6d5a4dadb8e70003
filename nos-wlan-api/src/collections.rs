//! Collections module for the no_std transmit path

pub use hashbrown::HashMap;

pub use alloc::collections::VecDeque;
