//! # SUMMIT Trace - The Climb Recorder
//!
//! Records a player's path up the wall and packs it for the sync service.
//!
//! ## Architecture
//!
//! ```text
//! GAME HOOK                        SUMMIT TRACE
//!     │                                │
//!     │─── Point per frame ──────────►│ TrajectoryRecorder (filter, cap)
//!     │                                │
//!     │                                ├──► PointStore (raw .strk, exact)
//!     │                                │
//!     │                                └──► codec::encode (3/7/13-byte records)
//!     │                                            │
//!     │◄─── codec::decode ◄──── sync payload ◄─────┘
//! ```
//!
//! ## Codec Tiers
//!
//! - **Quarter**: 8-bit float deltas, 3 bytes per point
//! - **Half**: escape byte + 16-bit float deltas, 7 bytes per point
//! - **Absolute**: escape byte + raw `f32` point, 13 bytes per point
//! - **Elided**: a repeated point costs 0 bytes
//!
//! ## Example
//!
//! ```rust
//! use summit_shared::Point;
//! use summit_trace::codec;
//!
//! let path = [Point::new(0.0, 0.0, 0.0), Point::new(0.5, 1.0, 0.0)];
//! let bytes = codec::encode(&path);
//! assert_eq!(bytes.len(), 15);
//! assert_eq!(codec::decode(&bytes).unwrap(), path);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod codec;
pub mod config;
pub mod error;
pub mod narrow_float;
pub mod recorder;
pub mod store;

pub use codec::{
    decode, encode, encode_with_stats, inspect, EncodeStats, RecordKind, RecordReader,
    TrajectoryEncoder,
};
pub use config::{RecorderConfig, StoreConfig, TraceConfig};
pub use error::{CodecError, CodecResult, TraceError, TraceResult};
pub use narrow_float::{Half, Layout, NarrowFloat, Quarter};
pub use recorder::{RecordingStats, TrajectoryRecorder};
pub use store::{PointFileHeader, PointStore};
