//! # Trajectory Recorder
//!
//! Collects a live climb from the host's per-frame position hook.
//!
//! THE MATH:
//! 60 FPS * 12 bytes * 30 minute climb = 1.3 MB raw per attempt
//!
//! ## Solution: Filter + Delta Codec
//!
//! 1. **Distance filter**: samples within `min_sample_distance` of the last
//!    kept sample are dropped (standing still on a hold costs nothing)
//! 2. **Cap**: recordings stop growing at `max_points`
//! 3. **Codec**: kept samples encode at ~3 bytes each on smooth movement
//!
//! The recorder only owns the point list. Uploading the encoded payload and
//! persisting the raw list are the caller's business.

use summit_shared::Point;

use crate::codec::{encode_with_stats, EncodeStats};
use crate::config::RecorderConfig;

/// Recorder statistics for one recording.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RecordingStats {
    /// Samples offered while recording.
    pub samples_seen: u64,
    /// Samples kept.
    pub samples_kept: u64,
    /// Samples dropped for being too close to the previous one.
    pub skipped_too_close: u64,
    /// Samples dropped for having a NaN or infinite component.
    pub skipped_non_finite: u64,
    /// Samples dropped after hitting `max_points`.
    pub skipped_over_capacity: u64,
    /// Bytes the kept samples take uncompressed.
    pub bytes_uncompressed: u64,
    /// Bytes the kept samples take encoded.
    pub bytes_encoded: u64,
    /// Per-tier record counts of the encoded stream.
    pub tiers: EncodeStats,
}

impl RecordingStats {
    /// Uncompressed / encoded size, 1.0 when nothing was encoded.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_encoded == 0 {
            return 1.0;
        }
        self.bytes_uncompressed as f64 / self.bytes_encoded as f64
    }
}

/// Live trajectory recorder.
pub struct TrajectoryRecorder {
    /// Configuration.
    config: RecorderConfig,
    /// Kept samples.
    points: Vec<Point>,
    /// Running counters.
    stats: RecordingStats,
    /// Recording active.
    recording: bool,
}

impl TrajectoryRecorder {
    /// Creates an idle recorder.
    #[must_use]
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            points: Vec::new(),
            stats: RecordingStats::default(),
            recording: false,
        }
    }

    /// Starts a fresh recording, discarding any previous one.
    pub fn start(&mut self) {
        self.recording = true;
        self.points.clear();
        self.stats = RecordingStats::default();
        tracing::info!("Trajectory recording started");
    }

    /// True between `start` and `stop`.
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.recording
    }

    /// Offers one sample. Ignored when not recording.
    pub fn record(&mut self, point: Point) {
        if !self.recording {
            return;
        }

        self.stats.samples_seen += 1;

        if !point.is_finite() {
            self.stats.skipped_non_finite += 1;
            return;
        }

        if let Some(last) = self.points.last() {
            let min = self.config.min_sample_distance;
            if last.distance_squared(point) < min * min {
                self.stats.skipped_too_close += 1;
                return;
            }
        }

        if self.points.len() >= self.config.max_points {
            self.stats.skipped_over_capacity += 1;
            return;
        }

        self.points.push(point);
        self.stats.samples_kept += 1;
    }

    /// Kept samples so far.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Encodes the kept samples.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        encode_with_stats(&self.points).0
    }

    /// Stops recording and returns statistics, byte counts included.
    pub fn stop(&mut self) -> RecordingStats {
        self.recording = false;

        let (bytes, tiers) = encode_with_stats(&self.points);
        self.stats.bytes_uncompressed = (self.points.len() * Point::SIZE) as u64;
        self.stats.bytes_encoded = bytes.len() as u64;
        self.stats.tiers = tiers;

        tracing::info!(
            "Trajectory recording stopped: {} of {} samples kept, {} -> {} bytes ({:.1}x)",
            self.stats.samples_kept,
            self.stats.samples_seen,
            self.stats.bytes_uncompressed,
            self.stats.bytes_encoded,
            self.stats.compression_ratio()
        );

        self.stats
    }

    /// Hands over the kept samples, leaving the recorder idle and empty.
    pub fn take_points(&mut self) -> Vec<Point> {
        self.recording = false;
        std::mem::take(&mut self.points)
    }
}
