#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use core::alloc::Layout;
use core::fmt;

#[cfg(feature = "log")]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

// Without `log` the arguments are still type-checked, so values only used in
// messages do not trip unused warnings.
#[cfg(not(feature = "log"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if false {
            let _ = format_args!($($arg)*);
        }
    };
}

#[cfg(feature = "log")]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        log::warn!($($arg)*)
    };
}

#[cfg(not(feature = "log"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if false {
            let _ = format_args!($($arg)*);
        }
    };
}

pub mod hash_table;

/// A hash set using open addressing with linear probing.
///
/// This module provides a `HashSet` that wraps the `HashTable` and provides
/// a standard set interface with configurable hashers.
pub mod hash_set;

pub use hash_set::HashSet;
pub use hash_table::HashTable;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// Default hasher builder used by [`HashSet`].
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// Default hasher builder used by [`HashSet`].
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        /// Placeholder when neither `foldhash` nor `std` is enabled. It
        /// cannot be constructed, so a hasher must be supplied explicitly.
        #[derive(Clone, Copy, Debug)]
        pub enum DefaultHashBuilder {}
    }
}

/// The error type for fallible operations that may need to rehash.
///
/// A failed operation leaves the collection exactly as it was before the
/// call.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TryReserveError {
    /// The computed capacity exceeded the collection's maximum (usually
    /// `isize::MAX` bytes).
    CapacityOverflow,

    /// The memory allocator returned an error.
    AllocError {
        /// The layout of the allocation request that failed.
        layout: Layout,
    },
}

impl fmt::Display for TryReserveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryReserveError::CapacityOverflow => {
                f.write_str("memory allocation failed because the computed capacity exceeded the collection's maximum")
            }
            TryReserveError::AllocError { layout } => write!(
                f,
                "memory allocation of {} bytes (align {}) failed while rehashing",
                layout.size(),
                layout.align()
            ),
        }
    }
}

impl core::error::Error for TryReserveError {}
