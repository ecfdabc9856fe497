//! On-disk form of a [`VectorIndex`]: two artifacts in one directory.
//!
//! - `vectors.bin`: `b"RCLV"`, format version (u32), dim (u32), count (u64),
//!   then `count * dim` little-endian f32s.
//! - `vectors.meta.json`: the side-table (doc ids, previews, metadata) plus the
//!   header values and a blake3 checksum of `vectors.bin`.
//!
//! Both files are written to a temp name and renamed into place. Loading
//! refuses to serve when either is missing or they disagree.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};
use std::path::Path;

use recall_core::types::Meta;
use recall_core::{Error, Result};

use crate::index::{SkippedDocument, VectorIndex};

pub const VECTORS_FILE: &str = "vectors.bin";
pub const META_FILE: &str = "vectors.meta.json";

const MAGIC: &[u8; 4] = b"RCLV";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub format_version: u32,
    pub dim: usize,
    pub count: usize,
    pub embedder_id: String,
    pub built_at: DateTime<Utc>,
    /// blake3 hex digest of `vectors.bin`.
    pub checksum: String,
    #[serde(default)]
    pub skipped: Vec<SkippedDocument>,
    pub doc_ids: Vec<String>,
    pub texts: Vec<String>,
    pub metadata: Vec<Meta>,
}

impl VectorIndex {
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let bin = encode_vectors(self)?;
        let meta = IndexMeta {
            format_version: FORMAT_VERSION,
            dim: self.dim,
            count: self.len(),
            embedder_id: self.embedder_id.clone(),
            built_at: self.built_at,
            checksum: blake3::hash(&bin).to_hex().to_string(),
            skipped: self.skipped.clone(),
            doc_ids: self.doc_ids.clone(),
            texts: self.texts.clone(),
            metadata: self.metadata.clone(),
        };
        let json = serde_json::to_vec_pretty(&meta)?;
        write_atomic(&dir.join(VECTORS_FILE), &bin)?;
        write_atomic(&dir.join(META_FILE), &json)?;
        tracing::info!(dir = %dir.display(), count = meta.count, dim = meta.dim, "vector index saved");
        Ok(())
    }

    /// Load and cross-check both artifacts.
    pub fn load(dir: &Path) -> Result<Self> {
        let bin_path = dir.join(VECTORS_FILE);
        let meta_path = dir.join(META_FILE);
        for p in [&bin_path, &meta_path] {
            if !p.is_file() { return Err(Error::IndexArtifactMissing(p.clone())); }
        }

        let bin = std::fs::read(&bin_path)?;
        let (dim, count, vectors) = decode_vectors(&bin)?;
        let meta: IndexMeta = serde_json::from_slice(&std::fs::read(&meta_path)?)?;

        if meta.format_version != FORMAT_VERSION {
            return Err(Error::IndexCorrupt(format!("unsupported metadata format version {}", meta.format_version)));
        }
        if blake3::hash(&bin).to_hex().as_str() != meta.checksum {
            return Err(Error::IndexCorrupt(format!("checksum of {} does not match metadata", VECTORS_FILE)));
        }
        check("dimension", dim, meta.dim)?;
        check("vector count", count, meta.count)?;
        check("doc_ids", count, meta.doc_ids.len())?;
        check("texts", count, meta.texts.len())?;
        check("metadata", count, meta.metadata.len())?;

        tracing::info!(dir = %dir.display(), count, dim, embedder_id = %meta.embedder_id, "vector index loaded");
        Ok(Self {
            dim,
            embedder_id: meta.embedder_id,
            vectors,
            doc_ids: meta.doc_ids,
            texts: meta.texts,
            metadata: meta.metadata,
            skipped: meta.skipped,
            built_at: meta.built_at,
        })
    }

    /// [`VectorIndex::load`] plus a check that the stored vectors were made by
    /// a compatible embedder.
    pub fn load_for(dir: &Path, dim: usize, embedder_id: &str) -> Result<Self> {
        let index = Self::load(dir)?;
        if index.dim != dim {
            return Err(Error::DimensionMismatch { expected: dim, found: index.dim });
        }
        if index.embedder_id != embedder_id {
            tracing::warn!(stored = %index.embedder_id, current = %embedder_id, "index was built by a different embedder");
        }
        Ok(index)
    }
}

fn check(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected == found { Ok(()) } else { Err(Error::IndexMismatch { what, expected, found }) }
}

fn encode_vectors(index: &VectorIndex) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(HEADER_LEN + index.vectors.len() * 4);
    buf.extend_from_slice(MAGIC);
    buf.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    let dim = u32::try_from(index.dim)
        .map_err(|_| Error::InvalidConfig(format!("vector dimension {} does not fit the {VECTORS_FILE} header", index.dim)))?;
    buf.write_u32::<LittleEndian>(dim)?;
    buf.write_u64::<LittleEndian>(index.len() as u64)?;
    for x in &index.vectors { buf.write_f32::<LittleEndian>(*x)?; }
    Ok(buf)
}

fn decode_vectors(bin: &[u8]) -> Result<(usize, usize, Vec<f32>)> {
    if bin.len() < HEADER_LEN {
        return Err(Error::IndexCorrupt(format!("{VECTORS_FILE} is shorter than its header")));
    }
    let mut r = Cursor::new(bin);
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(Error::IndexCorrupt(format!("{VECTORS_FILE} has a bad magic number")));
    }
    let version = r.read_u32::<LittleEndian>()?;
    if version != FORMAT_VERSION {
        return Err(Error::IndexCorrupt(format!("unsupported vector format version {version}")));
    }
    let dim = r.read_u32::<LittleEndian>()? as usize;
    let count = r.read_u64::<LittleEndian>()? as usize;
    let expected_bytes = count.checked_mul(dim).and_then(|n| n.checked_mul(4))
        .ok_or_else(|| Error::IndexCorrupt("vector header overflows".to_string()))?;
    let payload = bin.len() - HEADER_LEN;
    if payload != expected_bytes {
        return Err(Error::IndexCorrupt(format!("{VECTORS_FILE} holds {payload} bytes of vectors, header says {expected_bytes}")));
    }
    let mut vectors = vec![0f32; count * dim];
    r.read_f32_into::<LittleEndian>(&mut vectors)?;
    Ok((dim, count, vectors))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
