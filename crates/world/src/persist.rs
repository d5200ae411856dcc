//! Snapshot files with zstd compression.
//!
//! Layout: a 14-byte little-endian header (magic, schema version, CRC32 of the
//! compressed payload, payload length) followed by a zstd-compressed bincode
//! payload. The header version selects the payload schema, so v1 saves are
//! read and migrated transparently.

use crate::error::SnapshotError;
use crate::snapshot::{SnapshotV1, StateSnapshot, SNAPSHOT_SCHEMA_VERSION};
use anyhow::{Context, Result};
use crc32fast::Hasher;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

/// Magic number for snapshot files ("DLVS" = delve snapshot).
const SNAPSHOT_MAGIC: u32 = 0x444C5653;

const HEADER_LEN: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SnapshotHeader {
    magic: u32,
    version: u16,
    crc32: u32,
    payload_len: u32,
}

impl SnapshotHeader {
    fn new(version: u16, crc32: u32, payload_len: u32) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version,
            crc32,
            payload_len,
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN);
        bytes.extend_from_slice(&self.magic.to_le_bytes());
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&self.crc32.to_le_bytes());
        bytes.extend_from_slice(&self.payload_len.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            anyhow::bail!("Snapshot header too short");
        }

        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != SNAPSHOT_MAGIC {
            anyhow::bail!(
                "Invalid snapshot magic: expected 0x{:08X}, got 0x{:08X}",
                SNAPSHOT_MAGIC,
                magic
            );
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        let crc32 = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
        let payload_len = u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]);

        Ok(Self {
            magic,
            version,
            crc32,
            payload_len,
        })
    }
}

fn crc_of(bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

fn frame(version: u16, serialized: &[u8]) -> Result<Vec<u8>> {
    // Level 3 for balanced speed/compression.
    let compressed = zstd::encode_all(serialized, 3).context("Failed to compress snapshot")?;
    let payload_len =
        u32::try_from(compressed.len()).context("Compressed snapshot exceeds 4 GiB")?;
    let header = SnapshotHeader::new(version, crc_of(&compressed), payload_len);

    let mut bytes = header.to_bytes();
    bytes.extend_from_slice(&compressed);
    Ok(bytes)
}

/// Encode a snapshot in the current schema.
pub fn encode_snapshot(snapshot: &StateSnapshot) -> Result<Vec<u8>> {
    snapshot.check_version()?;
    let serialized = bincode::serialize(snapshot).context("Failed to serialize snapshot")?;
    frame(SNAPSHOT_SCHEMA_VERSION as u16, &serialized)
}

/// Encode a v1 snapshot. Only used to produce legacy fixtures.
pub fn encode_snapshot_v1(snapshot: &SnapshotV1) -> Result<Vec<u8>> {
    let serialized = bincode::serialize(snapshot).context("Failed to serialize v1 snapshot")?;
    frame(1, &serialized)
}

/// Decode any supported schema, migrating to the current one.
pub fn decode_snapshot(bytes: &[u8]) -> Result<StateSnapshot> {
    let header = SnapshotHeader::from_bytes(bytes)?;
    let compressed = bytes
        .get(HEADER_LEN..HEADER_LEN + header.payload_len as usize)
        .context("Snapshot payload truncated")?;

    let computed_crc = crc_of(compressed);
    if computed_crc != header.crc32 {
        anyhow::bail!(
            "CRC32 mismatch: expected {:08X}, got {:08X}",
            header.crc32,
            computed_crc
        );
    }

    let decompressed = zstd::decode_all(compressed).context("Failed to decompress snapshot")?;

    match u32::from(header.version) {
        1 => {
            let old: SnapshotV1 = bincode::deserialize(&decompressed)
                .context("Failed to deserialize v1 snapshot")?;
            Ok(old.into())
        }
        SNAPSHOT_SCHEMA_VERSION => {
            bincode::deserialize(&decompressed).context("Failed to deserialize snapshot")
        }
        found => Err(SnapshotError::UnsupportedVersion {
            found,
            supported: SNAPSHOT_SCHEMA_VERSION,
        }
        .into()),
    }
}

/// Write `snapshot` to `path`, replacing any existing file.
///
/// Writes to a sibling temp file first and renames it into place.
pub fn save_snapshot(path: impl AsRef<Path>, snapshot: &StateSnapshot) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create snapshot directory")?;
    }
    let bytes = encode_snapshot(snapshot)?;

    let tmp_path = path.with_extension("tmp");
    let mut file = File::create(&tmp_path).context("Failed to create snapshot file")?;
    file.write_all(&bytes)
        .context("Failed to write snapshot")?;
    file.sync_all().context("Failed to sync snapshot")?;
    drop(file);
    fs::rename(&tmp_path, path).context("Failed to move snapshot into place")?;
    Ok(())
}

pub fn load_snapshot(path: impl AsRef<Path>) -> Result<StateSnapshot> {
    let path = path.as_ref();
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open snapshot {}", path.display()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .context("Failed to read snapshot")?;
    decode_snapshot(&bytes)
}
