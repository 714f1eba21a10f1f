//! Versioned binary persistence for relations.
//!
//! The on-disk layout is fixed:
//!
//! ```text
//! offset  size           field
//! 0       7 bytes        magic, ASCII "ZODDREL"
//! 7       1 byte         format version (currently 1)
//! 8       8 bytes        tuple count, little-endian u64
//! 16      n * size(T)    records, encoded per `Storable`
//! ```
//!
//! Loading validates the header, then re-sorts and re-deduplicates the
//! payload: the producer's ordering is never trusted, so a file written by
//! a foreign tool still yields a canonical relation.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use memmap2::Mmap;
use tracing::trace;

use crate::context::Context;
use crate::relation::Relation;
use crate::storable::Storable;
use crate::tuple::Tuple;

/// File magic, the first seven bytes of every persisted relation.
pub const MAGIC: [u8; 7] = *b"ZODDREL";

/// Current format version.
pub const VERSION: u8 = 1;

/// Cap on speculative preallocation while loading, so a forged length
/// cannot commit memory before the payload proves it exists.
const PREALLOC_LIMIT: usize = 1 << 16;

/// Error type for persistence operations.
#[derive(Debug)]
pub enum PersistError {
    /// Bad magic, an impossible length, or malformed record bytes.
    InvalidFormat,
    /// The header names a version this build does not read.
    UnsupportedVersion(u8),
    /// The declared length exceeds the caller's limit.
    TooLarge {
        /// Length declared in the header.
        len: u64,
        /// Limit the caller imposed.
        max_len: usize,
    },
    /// An error from the underlying reader or writer.
    Io(io::Error),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat => write!(f, "not a valid relation file"),
            Self::UnsupportedVersion(version) => {
                write!(f, "unsupported format version {version}")
            }
            Self::TooLarge { len, max_len } => {
                write!(f, "declared length {len} exceeds limit {max_len}")
            }
            Self::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for PersistError {
    fn from(err: io::Error) -> Self {
        // Record decoders signal semantic corruption as InvalidData.
        if err.kind() == io::ErrorKind::InvalidData {
            Self::InvalidFormat
        } else {
            Self::Io(err)
        }
    }
}

/// Write a relation to `writer` in the versioned format.
pub fn save<T, W>(relation: &Relation<T>, writer: &mut W) -> Result<(), PersistError>
where
    T: Tuple + Storable,
    W: Write + ?Sized,
{
    writer.write_all(&MAGIC)?;
    writer.write_all(&[VERSION])?;
    writer.write_all(&(relation.len() as u64).to_le_bytes())?;
    for tuple in relation {
        tuple.store(writer)?;
    }
    Ok(())
}

/// Read a relation from `reader`, accepting any declared length that fits
/// in memory.
pub fn load<T, R>(ctx: &Context, reader: &mut R) -> Result<Relation<T>, PersistError>
where
    T: Tuple + Storable,
    R: Read + ?Sized,
{
    load_impl(ctx, reader, None)
}

/// Read a relation from `reader`, rejecting declared lengths above
/// `max_len` with [`PersistError::TooLarge`] before any record is read.
pub fn load_with_limit<T, R>(
    ctx: &Context,
    reader: &mut R,
    max_len: usize,
) -> Result<Relation<T>, PersistError>
where
    T: Tuple + Storable,
    R: Read + ?Sized,
{
    load_impl(ctx, reader, Some(max_len))
}

fn load_impl<T, R>(
    ctx: &Context,
    reader: &mut R,
    max_len: Option<usize>,
) -> Result<Relation<T>, PersistError>
where
    T: Tuple + Storable,
    R: Read + ?Sized,
{
    let mut magic = [0u8; 7];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(PersistError::InvalidFormat);
    }

    let mut version = [0u8; 1];
    reader.read_exact(&mut version)?;
    if version[0] != VERSION {
        return Err(PersistError::UnsupportedVersion(version[0]));
    }

    let mut len_bytes = [0u8; 8];
    reader.read_exact(&mut len_bytes)?;
    let declared = u64::from_le_bytes(len_bytes);
    let len = usize::try_from(declared).map_err(|_| PersistError::InvalidFormat)?;
    if let Some(max_len) = max_len {
        if len > max_len {
            return Err(PersistError::TooLarge {
                len: declared,
                max_len,
            });
        }
    }

    let mut elements = Vec::with_capacity(len.min(PREALLOC_LIMIT));
    for _ in 0..len {
        elements.push(T::load(reader)?);
    }

    trace!(len, "relation payload read");
    Ok(Relation::from_vec(ctx, elements))
}

/// Save to a file, going through a temp file plus rename so readers never
/// observe a half-written relation.
pub fn save_to_path<T>(relation: &Relation<T>, path: &Path) -> Result<(), PersistError>
where
    T: Tuple + Storable,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&temp_path)?;
        save(relation, &mut file)?;
        file.sync_all()?;
    }
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Load from a file through a memory map, avoiding read syscalls for the
/// record scan. The payload is still validated and re-canonicalized like
/// any other load.
pub fn load_from_path<T>(ctx: &Context, path: &Path) -> Result<Relation<T>, PersistError>
where
    T: Tuple + Storable,
{
    let file = File::open(path)?;
    // Safety: the map is read-only and private to this call; mutation of
    // the underlying file while loading can corrupt records, which the
    // decoders surface as InvalidFormat rather than undefined behavior.
    let mmap = unsafe { Mmap::map(&file) }?;
    let mut bytes: &[u8] = &mmap;
    load(ctx, &mut bytes)
}
