//! # Local Point Store
//!
//! Uncompressed on-disk persistence for trajectories.
//!
//! Local saves deliberately bypass the delta codec: the raw list is exact,
//! and the codec is only used for the sync payload.
//!
//! ## File Format
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │ Header (12 bytes)                                  │
//! ├────────────────────────────────────────────────────┤
//! │ Magic (4) │ Version (4) │ Point Count (4)          │
//! ├────────────────────────────────────────────────────┤
//! │ Point 0: x f32 │ y f32 │ z f32                     │
//! ├────────────────────────────────────────────────────┤
//! │ ...                                                │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! All fields little-endian.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use summit_shared::Point;

use crate::error::{TraceError, TraceResult};

/// Magic number for point files.
pub const POINT_FILE_MAGIC: u32 = 0x4B52_5453; // "STRK"

/// Current point file version.
pub const POINT_FILE_VERSION: u32 = 1;

/// Point file extension.
pub const POINT_FILE_EXTENSION: &str = "strk";

/// Point file header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointFileHeader {
    /// Magic number for file identification.
    pub magic: u32,
    /// Format version.
    pub version: u32,
    /// Number of points that follow.
    pub point_count: u32,
}

impl PointFileHeader {
    /// Size of header in bytes.
    pub const SIZE: usize = 12;

    /// Creates a header for `point_count` points.
    #[must_use]
    pub const fn new(point_count: u32) -> Self {
        Self {
            magic: POINT_FILE_MAGIC,
            version: POINT_FILE_VERSION,
            point_count,
        }
    }

    /// Serializes the header to bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.point_count.to_le_bytes());
        bytes
    }

    /// Deserializes header from bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            magic: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            version: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            point_count: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        }
    }

    /// Checks magic and version.
    ///
    /// # Errors
    ///
    /// `BadMagic` or `UnsupportedVersion`.
    pub fn validate(&self) -> TraceResult<()> {
        if self.magic != POINT_FILE_MAGIC {
            return Err(TraceError::BadMagic { found: self.magic });
        }
        if self.version > POINT_FILE_VERSION {
            return Err(TraceError::UnsupportedVersion {
                found: self.version,
                supported: POINT_FILE_VERSION,
            });
        }
        Ok(())
    }
}

/// Writes a point list in the point file format.
///
/// # Errors
///
/// `InvalidConfig` if the list does not fit the 32-bit count, `Io` on write
/// failure.
pub fn write_points<W: Write>(writer: &mut W, points: &[Point]) -> TraceResult<()> {
    let count = u32::try_from(points.len()).map_err(|_| {
        TraceError::InvalidConfig(format!("{} points exceed the point file limit", points.len()))
    })?;
    writer.write_all(&PointFileHeader::new(count).to_bytes())?;
    for point in points {
        writer.write_all(&point.to_le_bytes())?;
    }
    Ok(())
}

/// Reads a point list written by `write_points`.
///
/// # Errors
///
/// `BadMagic`, `UnsupportedVersion`, `PointCountMismatch` on a short
/// payload, `Io` on read failure.
pub fn read_points<R: Read>(reader: &mut R) -> TraceResult<Vec<Point>> {
    let mut header_bytes = [0u8; PointFileHeader::SIZE];
    reader.read_exact(&mut header_bytes)?;
    let header = PointFileHeader::from_bytes(&header_bytes);
    header.validate()?;

    let mut payload = Vec::new();
    reader.read_to_end(&mut payload)?;

    let declared = header.point_count as usize;
    let actual = payload.len() / Point::SIZE;
    if actual < declared {
        return Err(TraceError::PointCountMismatch {
            declared: header.point_count,
            actual,
        });
    }

    let points = payload
        .chunks_exact(Point::SIZE)
        .take(declared)
        .map(|chunk| {
            let mut raw = [0u8; Point::SIZE];
            raw.copy_from_slice(chunk);
            Point::from_le_bytes(&raw)
        })
        .collect();
    Ok(points)
}

/// Directory of named point files.
#[derive(Clone, Debug)]
pub struct PointStore {
    directory: PathBuf,
}

impl PointStore {
    /// Creates a store rooted at `directory`. Nothing is touched on disk yet.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Store root.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file holding `name`.
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.directory.join(name).with_extension(POINT_FILE_EXTENSION)
    }

    /// Saves `points` under `name`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// As `write_points`, plus `Io` when the directory or file cannot be created.
    pub fn save(&self, name: &str, points: &[Point]) -> TraceResult<PathBuf> {
        std::fs::create_dir_all(&self.directory)?;
        let path = self.path_for(name);
        let mut writer = BufWriter::new(File::create(&path)?);
        write_points(&mut writer, points)?;
        writer.flush()?;
        tracing::info!("Saved {} points to {}", points.len(), path.display());
        Ok(path)
    }

    /// Loads the points saved under `name`.
    ///
    /// # Errors
    ///
    /// As `read_points`, plus `Io` when the file cannot be opened.
    pub fn load(&self, name: &str) -> TraceResult<Vec<Point>> {
        let path = self.path_for(name);
        let mut reader = BufReader::new(File::open(&path)?);
        let points = read_points(&mut reader)?;
        tracing::info!("Loaded {} points from {}", points.len(), path.display());
        Ok(points)
    }
}
