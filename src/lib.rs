#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod backing;

pub mod bucket;

/// A fixed-bucket-count hash table over hybrid buckets.
///
/// This module provides the single-table building block that the
/// progressive `HashMap` composes: no load-factor logic and no resizing,
/// but a bounded `steal_elements` primitive that migration feeds on.
pub mod fixed_map;

pub mod hash_map;

pub use hash_map::Entry;
pub use hash_map::HashMap;
