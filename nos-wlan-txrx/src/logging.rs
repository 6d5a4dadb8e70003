//! Transmit path logging
//!
//! Everything logs under the `nos_wlan_txrx` target. Interface attach and
//! detach, throttle changes and adaptive switch flips go out at info;
//! pause transitions, backlog overflow, flushes and dropped frames at
//! debug. Nothing is logged per accepted frame. Without the `log` feature
//! the macros expand to nothing.

/// Trace-level logging
#[macro_export]
macro_rules! tx_trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::trace!(target: "nos_wlan_txrx", $($arg)*);
    }
}

/// Debug-level logging
#[macro_export]
macro_rules! tx_debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::debug!(target: "nos_wlan_txrx", $($arg)*);
    }
}

/// Info-level logging
#[macro_export]
macro_rules! tx_info {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::info!(target: "nos_wlan_txrx", $($arg)*);
    }
}

/// Warn-level logging
#[macro_export]
macro_rules! tx_warn {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::warn!(target: "nos_wlan_txrx", $($arg)*);
    }
}

/// Error-level logging
#[macro_export]
macro_rules! tx_error {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::error!(target: "nos_wlan_txrx", $($arg)*);
    }
}
