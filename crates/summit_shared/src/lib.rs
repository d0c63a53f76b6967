//! # SUMMIT Shared
//!
//! Common types used by every layer that touches a climb trajectory.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on the codec or on any I/O.
//! The host hook produces `Point`s, the codec consumes them, and neither
//! side needs to know about the other.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod math;

pub use math::Point;
