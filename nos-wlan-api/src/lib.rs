//! NOS WLAN API - Core interfaces and types for the WLAN transmit path
//!
//! This crate provides the types shared between the WLAN transmit engine and
//! the components it talks to: the hardware descriptor pool, the transport
//! header classifier and the platform clock. The engine itself lives in
//! `nos-wlan-txrx` and depends only on the abstractions defined here.
//!
//! # Architecture
//!
//! - **Core**: collaborator traits (`HwTxTarget`, `TransportClassifier`,
//!   `TxClock`) and identifier/flag types
//! - **Buffer**: the owned outbound frame (`PacketBuffer`)
//! - **Error**: the transmit path error type
//!
//! # Usage
//!
//! ```rust
//! use nos_wlan_api::{HwTxTarget, PacketBuffer, Rejected};
//!
//! struct NullRadio;
//!
//! impl HwTxTarget for NullRadio {
//!     fn submit(&self, buf: PacketBuffer) -> Result<(), Rejected> {
//!         drop(buf);
//!         Ok(())
//!     }
//!
//!     fn free_descriptor_count(&self) -> u32 {
//!         64
//!     }
//! }
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![allow(dead_code)]

extern crate alloc;

pub mod buffer;
pub mod collections;
pub mod core;
pub mod error;
pub mod sync;

// Re-export commonly used types
pub use crate::buffer::{BufferList, PacketBuffer, PacketFlags};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::error::{Rejected, Result, TxError};
