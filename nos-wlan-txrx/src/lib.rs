//! NOS WLAN TXRX - High-latency transmit path
//!
//! Queueing, admission control, backpressure and coalescing for a wireless
//! device whose hardware descriptor pool sits behind a slow bus. Frames are
//! submitted per virtual interface to a [`PhysicalDevice`], which decides
//! for every frame whether it goes to the hardware now, waits in a queue,
//! or is refused.
//!
//! # Architecture
//!
//! - **Admission**: per-interface pause mask and bounded backlog
//!   ([`pause`], [`vdev`])
//! - **Scheduling**: device-wide round-robin drain under a budget ([`sched`])
//! - **Coalescing**: TCP pure-ACK hash table ([`ack`]) and frame bundling
//!   ([`bundle`]), each with load-driven enables ([`adaptive`])
//! - **Telemetry**: bounded per-packet stats ring ([`stats_ring`]) and
//!   atomic counters ([`counters`])
//!
//! There are no threads. Work happens on the submitting thread or in
//! [`PhysicalDevice::poll_timers`], which the host calls from its tick.
//!
//! # Usage
//!
//! ```rust,ignore
//! use nos_wlan_txrx::{PhysicalDevice, TxConfig, VdevConfig};
//!
//! let dev = PhysicalDevice::with_default_classifier(TxConfig::default(), radio, clock)?;
//! dev.attach_vdev(0, VdevConfig::default())?;
//! for refused in dev.submit(0, frame)? {
//!     drop(refused);
//! }
//! dev.poll_timers();
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![allow(dead_code)]

extern crate alloc;

#[macro_use]
mod logging;

pub mod ack;
pub mod adaptive;
pub mod bundle;
pub mod classify;
pub mod config;
pub mod counters;
pub mod pause;
pub mod pdev;
pub mod sched;
pub mod stats_ring;
pub mod throttle;
pub mod timer;
pub mod vdev;

// Re-export commonly used types
pub use crate::classify::EthernetTcpClassifier;
pub use crate::config::TxConfig;
pub use crate::counters::{DeviceCountersSnapshot, VdevCountersSnapshot};
pub use crate::pdev::PhysicalDevice;
pub use crate::sched::DrainReport;
pub use crate::stats_ring::{HostTxInfo, StatsEvictionPolicy, StatsRingPool, TxStatsRecord};
pub use crate::vdev::{VdevConfig, VirtualInterface};
pub use nos_wlan_api::{BufferList, PacketBuffer, PauseReason, TxError};
