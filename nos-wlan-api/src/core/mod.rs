//! Core module containing collaborator traits and shared types

pub mod traits;
pub mod types;

// Re-export commonly used items
pub use traits::*;
pub use types::*;
