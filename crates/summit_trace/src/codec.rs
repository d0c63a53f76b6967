//! # Trajectory Codec
//!
//! Compact, lossy delta encoding for climb trajectories.
//!
//! ## Stream Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Baseline: x f32 │ y f32 │ z f32                  (12 bytes)  │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Quarter delta: dx q8 │ dy q8 │ dz q8               (3 bytes) │
//! │ Half delta:    0x63 │ dx h16 │ dy h16 │ dz h16     (7 bytes) │
//! │ Absolute:      0x62 │ x f32 │ y f32 │ z f32       (13 bytes) │
//! │ ...                                                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no header. Multi-byte fields are little-endian. The first byte of
//! every record after the baseline is read as a `Quarter`: a number means a
//! quarter delta, a NaN carries an escape code selecting the wider tiers.
//!
//! ## Baseline Discipline
//!
//! Encoder and decoder each keep a running baseline point. The encoder
//! advances it by the *quantized* delta it wrote, using the same `f32`
//! additions the decoder performs, so both sides stay bit-identical and
//! quantization error never accumulates.
//!
//! ## Elision
//!
//! A point identical to the baseline writes nothing. Repeated samples carry
//! no path information, so decoding never re-expands them.

use summit_shared::Point;

use crate::error::{CodecError, CodecResult};
use crate::narrow_float::{Half, NarrowFloat, Quarter};

/// Escape code announcing an absolute reposition record.
pub const ESCAPE_ABSOLUTE: u32 = 1;

/// Escape code announcing a half-float delta record.
pub const ESCAPE_HALF: u32 = 2;

/// `Quarter::encode_nan(ESCAPE_ABSOLUTE)`.
const ESCAPE_ABSOLUTE_TAG: Quarter = Quarter::from_bits(0x62);

/// `Quarter::encode_nan(ESCAPE_HALF)`.
const ESCAPE_HALF_TAG: Quarter = Quarter::from_bits(0x63);

/// Kind of record in an encoded stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Leading absolute point.
    Baseline,
    /// Three quarter-float deltas.
    QuarterDelta,
    /// Escape byte plus three half-float deltas.
    HalfDelta,
    /// Escape byte plus an absolute point.
    Absolute,
}

impl RecordKind {
    /// Size of the record on the wire.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Baseline => Point::SIZE,
            Self::QuarterDelta => 3 * Quarter::BYTES,
            Self::HalfDelta => 1 + 3 * Half::BYTES,
            Self::Absolute => 1 + Point::SIZE,
        }
    }
}

/// Per-tier record counts for one stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodeStats {
    /// Baseline records (0 or 1).
    pub baseline: usize,
    /// Quarter-delta records.
    pub quarter: usize,
    /// Half-delta records.
    pub half: usize,
    /// Absolute reposition records.
    pub absolute: usize,
    /// Points elided as duplicates. Always 0 when read back from a stream.
    pub elided: usize,
}

impl EncodeStats {
    /// Counts one record.
    pub fn count(&mut self, kind: RecordKind) {
        match kind {
            RecordKind::Baseline => self.baseline += 1,
            RecordKind::QuarterDelta => self.quarter += 1,
            RecordKind::HalfDelta => self.half += 1,
            RecordKind::Absolute => self.absolute += 1,
        }
    }

    /// Points present in the stream.
    #[must_use]
    pub const fn points_written(&self) -> usize {
        self.baseline + self.quarter + self.half + self.absolute
    }

    /// Points handed to the encoder, elided ones included.
    #[must_use]
    pub const fn points_seen(&self) -> usize {
        self.points_written() + self.elided
    }

    /// Stream length implied by the counts.
    #[must_use]
    pub const fn byte_len(&self) -> usize {
        self.baseline * RecordKind::Baseline.size()
            + self.quarter * RecordKind::QuarterDelta.size()
            + self.half * RecordKind::HalfDelta.size()
            + self.absolute * RecordKind::Absolute.size()
    }
}

/// What the encoder decided for one point.
enum Step {
    Elide,
    Quarter([Quarter; 3]),
    Half([Half; 3]),
    Absolute,
}

/// Picks the narrowest tier that can carry `target - baseline`.
fn select_step(baseline: Point, target: Point) -> Step {
    let deltas = (target - baseline).to_array();

    let quarters = deltas.map(Quarter::from_f32);
    if quarters.iter().all(|q| q.is_finite()) {
        if deltas.iter().all(|d| *d == 0.0) {
            return Step::Elide;
        }
        return Step::Quarter(quarters);
    }

    let halves = deltas.map(Half::from_f32);
    if halves.iter().all(|h| h.is_finite()) {
        return Step::Half(halves);
    }

    Step::Absolute
}

fn widen<F: NarrowFloat>(values: [F; 3]) -> Point {
    Point::from_array(values.map(NarrowFloat::to_f32))
}

// =============================================================================
// Encoder
// =============================================================================

/// Incremental trajectory encoder.
///
/// Lives for one encode; all state is discarded by `finish`.
#[derive(Debug, Default)]
pub struct TrajectoryEncoder {
    buffer: Vec<u8>,
    baseline: Point,
    stats: EncodeStats,
}

impl TrajectoryEncoder {
    /// Creates an encoder with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an encoder sized for `points` smooth samples.
    #[must_use]
    pub fn with_capacity(points: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(
                RecordKind::Baseline.size() + points.saturating_sub(1) * RecordKind::QuarterDelta.size(),
            ),
            ..Self::default()
        }
    }

    /// Appends one point.
    pub fn push(&mut self, point: Point) {
        if self.stats.baseline == 0 {
            self.buffer.extend_from_slice(&point.to_le_bytes());
            self.baseline = point;
            self.stats.count(RecordKind::Baseline);
            return;
        }

        match select_step(self.baseline, point) {
            Step::Elide => self.stats.elided += 1,
            Step::Quarter(quarters) => {
                self.buffer.extend(quarters.iter().map(|q| q.to_bits()));
                self.baseline = self.baseline + widen(quarters);
                self.stats.count(RecordKind::QuarterDelta);
            }
            Step::Half(halves) => {
                self.buffer.push(ESCAPE_HALF_TAG.to_bits());
                for half in halves {
                    self.buffer.extend_from_slice(&half.to_le_bytes());
                }
                self.baseline = self.baseline + widen(halves);
                self.stats.count(RecordKind::HalfDelta);
            }
            Step::Absolute => {
                self.buffer.push(ESCAPE_ABSOLUTE_TAG.to_bits());
                self.buffer.extend_from_slice(&point.to_le_bytes());
                self.baseline = point;
                self.stats.count(RecordKind::Absolute);
            }
        }
    }

    /// Counts so far.
    #[must_use]
    pub const fn stats(&self) -> &EncodeStats {
        &self.stats
    }

    /// Finishes the stream.
    ///
    /// A trajectory of fewer than two points produces an empty buffer.
    #[must_use]
    pub fn finish(self) -> (Vec<u8>, EncodeStats) {
        if self.stats.points_seen() < 2 {
            return (Vec::new(), EncodeStats::default());
        }
        (self.buffer, self.stats)
    }
}

/// Encodes a trajectory.
#[must_use]
pub fn encode(points: &[Point]) -> Vec<u8> {
    encode_with_stats(points).0
}

/// Encodes a trajectory and reports how many records each tier produced.
#[must_use]
pub fn encode_with_stats(points: &[Point]) -> (Vec<u8>, EncodeStats) {
    if points.len() < 2 {
        return (Vec::new(), EncodeStats::default());
    }

    let mut encoder = TrajectoryEncoder::with_capacity(points.len());
    for point in points {
        encoder.push(*point);
    }
    let (bytes, stats) = encoder.finish();

    tracing::debug!(
        "Encoded {} points into {} bytes (quarter={}, half={}, absolute={}, elided={})",
        points.len(),
        bytes.len(),
        stats.quarter,
        stats.half,
        stats.absolute,
        stats.elided
    );

    (bytes, stats)
}

// =============================================================================
// Decoder
// =============================================================================

/// Streaming reader over an encoded trajectory.
///
/// Yields one `(RecordKind, Point)` per record and stops for good after the
/// first error.
pub struct RecordReader<'a> {
    bytes: &'a [u8],
    position: usize,
    baseline: Point,
    started: bool,
    failed: bool,
}

impl<'a> RecordReader<'a> {
    /// Creates a reader at the start of `bytes`.
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            position: 0,
            baseline: Point::ZERO,
            started: false,
            failed: false,
        }
    }

    /// Byte offset of the next record.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Bytes left to read.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.position)
    }

    /// Borrows the whole record starting at the current position.
    fn record(&self, kind: RecordKind) -> CodecResult<&'a [u8]> {
        let start = self.position;
        self.bytes
            .get(start..start + kind.size())
            .ok_or(CodecError::Truncated {
                offset: start,
                needed: kind.size(),
                remaining: self.remaining(),
            })
    }

    /// Reads the next record, `Ok(None)` at the end of the stream.
    ///
    /// # Errors
    ///
    /// `Truncated` if the record is cut short, `UnknownEscape` for an escape
    /// code other than absolute or half.
    pub fn next_record(&mut self) -> CodecResult<Option<(RecordKind, Point)>> {
        let Some(&first) = self.bytes.get(self.position) else {
            return Ok(None);
        };

        if !self.started {
            let record = self.record(RecordKind::Baseline)?;
            self.baseline = read_point(record);
            self.started = true;
            self.position += RecordKind::Baseline.size();
            return Ok(Some((RecordKind::Baseline, self.baseline)));
        }

        let tag = Quarter::from_bits(first);
        let (kind, point) = if tag.is_nan() {
            match tag.decode_nan()? {
                ESCAPE_ABSOLUTE => {
                    let record = self.record(RecordKind::Absolute)?;
                    (RecordKind::Absolute, read_point(&record[1..]))
                }
                ESCAPE_HALF => {
                    let record = self.record(RecordKind::HalfDelta)?;
                    let delta = widen([
                        Half::from_le_bytes([record[1], record[2]]),
                        Half::from_le_bytes([record[3], record[4]]),
                        Half::from_le_bytes([record[5], record[6]]),
                    ]);
                    (RecordKind::HalfDelta, self.baseline + delta)
                }
                code => {
                    return Err(CodecError::UnknownEscape {
                        code,
                        offset: self.position,
                    })
                }
            }
        } else {
            let record = self.record(RecordKind::QuarterDelta)?;
            let delta = widen([tag, Quarter::from_bits(record[1]), Quarter::from_bits(record[2])]);
            (RecordKind::QuarterDelta, self.baseline + delta)
        };

        self.baseline = point;
        self.position += kind.size();

        Ok(Some((kind, point)))
    }
}

impl Iterator for RecordReader<'_> {
    type Item = CodecResult<(RecordKind, Point)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_record() {
            Ok(record) => record.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Reads 12 little-endian bytes as a point. `bytes` must hold exactly 12.
fn read_point(bytes: &[u8]) -> Point {
    let mut raw = [0u8; Point::SIZE];
    raw.copy_from_slice(bytes);
    Point::from_le_bytes(&raw)
}

/// Decodes a trajectory.
///
/// # Errors
///
/// Fails on a truncated record or an unknown escape code. No partial result
/// is returned.
pub fn decode(bytes: &[u8]) -> CodecResult<Vec<Point>> {
    let mut points = Vec::with_capacity(bytes.len() / RecordKind::QuarterDelta.size() + 1);
    for record in RecordReader::new(bytes) {
        match record {
            Ok((_, point)) => points.push(point),
            Err(err) => {
                tracing::warn!("Corrupt trajectory stream ({} bytes): {}", bytes.len(), err);
                return Err(err);
            }
        }
    }
    Ok(points)
}

/// Counts records per tier without materializing the points.
///
/// # Errors
///
/// Same as `decode`.
pub fn inspect(bytes: &[u8]) -> CodecResult<EncodeStats> {
    let mut stats = EncodeStats::default();
    for record in RecordReader::new(bytes) {
        let (kind, _) = record?;
        stats.count(kind);
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32, z: f32) -> Point {
        Point::new(x, y, z)
    }

    #[test]
    fn test_escape_tags_match_nan_channel() {
        assert_eq!(Quarter::encode_nan(ESCAPE_ABSOLUTE), Ok(ESCAPE_ABSOLUTE_TAG));
        assert_eq!(Quarter::encode_nan(ESCAPE_HALF), Ok(ESCAPE_HALF_TAG));
    }

    #[test]
    fn test_record_sizes() {
        assert_eq!(RecordKind::Baseline.size(), 12);
        assert_eq!(RecordKind::QuarterDelta.size(), 3);
        assert_eq!(RecordKind::HalfDelta.size(), 7);
        assert_eq!(RecordKind::Absolute.size(), 13);
    }

    #[test]
    fn test_short_trajectories_encode_empty() {
        assert!(encode(&[]).is_empty());
        assert!(encode(&[p(1.0, 2.0, 3.0)]).is_empty());
        assert_eq!(decode(&[]), Ok(Vec::new()));
    }

    #[test]
    fn test_quarter_record_bytes() {
        let bytes = encode(&[p(0.0, 0.0, 0.0), p(1.0, -1.0, 0.5)]);
        assert_eq!(bytes.len(), 15);
        assert_eq!(&bytes[12..], &[0x20, 0xA0, 0x10]);
    }

    #[test]
    fn test_half_record_bytes() {
        let bytes = encode(&[p(0.0, 0.0, 0.0), p(100.0, 0.0, 1.0)]);
        assert_eq!(bytes.len(), 19);
        assert_eq!(bytes[12], 0x63);
        assert_eq!(&bytes[13..15], &Half::from_f32(100.0).to_le_bytes());
        assert_eq!(&bytes[15..17], &[0, 0]);
        assert_eq!(&bytes[17..19], &Half::from_f32(1.0).to_le_bytes());
    }

    #[test]
    fn test_absolute_record_bytes() {
        let target = p(1000.0, 2.0, -3.0);
        let bytes = encode(&[p(0.0, 0.0, 0.0), target]);
        assert_eq!(bytes.len(), 25);
        assert_eq!(bytes[12], 0x62);
        assert_eq!(&bytes[13..], &target.to_le_bytes());
    }

    #[test]
    fn test_all_duplicates_still_write_baseline() {
        let (bytes, stats) = encode_with_stats(&[p(5.0, 5.0, 5.0); 4]);
        assert_eq!(bytes.len(), 12);
        assert_eq!(stats.elided, 3);
        assert_eq!(decode(&bytes).unwrap(), vec![p(5.0, 5.0, 5.0)]);
    }

    #[test]
    fn test_baseline_follows_quantized_delta() {
        // 0.3 is not representable; the decoder must land where the encoder thinks it is.
        let points = [p(0.0, 0.0, 0.0), p(0.3, 0.0, 0.0), p(0.6, 0.0, 0.0), p(0.9, 0.0, 0.0)];
        let mut encoder = TrajectoryEncoder::new();
        for point in points {
            encoder.push(point);
        }
        let baseline = encoder.baseline;
        let (bytes, _) = encoder.finish();

        let decoded = decode(&bytes).unwrap();
        assert!(decoded[3].bit_eq(baseline));
        assert!((decoded[3].x - 0.9).abs() <= 1.0 / 64.0);
    }

    #[test]
    fn test_non_finite_delta_uses_absolute() {
        let bytes = encode(&[p(0.0, 0.0, 0.0), p(f32::NAN, 0.0, 0.0)]);
        assert_eq!(bytes[12], 0x62);
        let decoded = decode(&bytes).unwrap();
        assert!(decoded[1].x.is_nan());
    }

    #[test]
    fn test_truncated_baseline() {
        assert_eq!(
            decode(&[0u8; 5]),
            Err(CodecError::Truncated { offset: 0, needed: 12, remaining: 5 })
        );
    }

    #[test]
    fn test_truncated_records() {
        let bytes = encode(&[p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)]);
        assert_eq!(
            decode(&bytes[..14]),
            Err(CodecError::Truncated { offset: 12, needed: 3, remaining: 2 })
        );

        let bytes = encode(&[p(0.0, 0.0, 0.0), p(50.0, 0.0, 0.0)]);
        assert_eq!(
            decode(&bytes[..18]),
            Err(CodecError::Truncated { offset: 12, needed: 7, remaining: 6 })
        );

        let bytes = encode(&[p(0.0, 0.0, 0.0), p(5000.0, 0.0, 0.0)]);
        assert_eq!(
            decode(&bytes[..13]),
            Err(CodecError::Truncated { offset: 12, needed: 13, remaining: 1 })
        );
    }

    #[test]
    fn test_unknown_escape() {
        let mut bytes = p(0.0, 0.0, 0.0).to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0x64, 0, 0, 0, 0, 0, 0]);
        assert_eq!(decode(&bytes), Err(CodecError::UnknownEscape { code: 3, offset: 12 }));

        // Canonical NaN from a NaN delta is not an escape either.
        bytes[12] = 0x70;
        assert_eq!(decode(&bytes), Err(CodecError::UnknownEscape { code: 15, offset: 12 }));
    }

    #[test]
    fn test_reader_stops_after_error() {
        let mut bytes = encode(&[p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0)]);
        bytes.push(0x20);
        let mut reader = RecordReader::new(&bytes);
        assert!(matches!(reader.next(), Some(Ok((RecordKind::Baseline, _)))));
        assert!(matches!(reader.next(), Some(Ok((RecordKind::QuarterDelta, _)))));
        assert!(matches!(reader.next(), Some(Err(CodecError::Truncated { .. }))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_inspect_counts_tiers() {
        let points = [
            p(0.0, 0.0, 0.0),
            p(0.5, 0.0, 0.0),
            p(0.5, 0.0, 0.0),
            p(60.0, 0.0, 0.0),
            p(-9000.0, 0.0, 0.0),
        ];
        let (bytes, stats) = encode_with_stats(&points);
        assert_eq!(stats.byte_len(), bytes.len());

        let read = inspect(&bytes).unwrap();
        assert_eq!(read.baseline, 1);
        assert_eq!(read.quarter, 1);
        assert_eq!(read.half, 1);
        assert_eq!(read.absolute, 1);
        assert_eq!(read.elided, 0);
        assert_eq!(EncodeStats { elided: 1, ..read }, stats);
    }
}
