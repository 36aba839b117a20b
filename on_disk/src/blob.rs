//! Content-addressed file storage.
//!
//! Blobs are identified like git blobs: the SHA-1 of `blob <len>\0` followed
//! by the content. Each blob is stored zlib-compressed at
//! `objects/<first 2 hex digits>/<remaining 38 hex digits>`.

use std::fmt::{self, Write as _};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use sha1::{Digest, Sha1};

/// Identifies a blob by the hash of its content.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct BlobId([u8; 20]);

impl BlobId {
    /// Compute the ID of `content`.
    pub(crate) fn of(content: &[u8]) -> BlobId {
        let mut hasher = Sha1::new();
        hasher.update(b"blob ");
        hasher.update(content.len().to_string());
        hasher.update(b"\0");
        hasher.update(content);

        let mut id = [0u8; 20];
        id.copy_from_slice(&hasher.finalize()[..]);
        BlobId(id)
    }

    /// Convert a 40-character lowercase hex ID.
    pub(crate) fn from_hex(hex: &str) -> Option<BlobId> {
        let hex = hex.as_bytes();
        if hex.len() != 40 {
            return None;
        }

        let mut id = [0u8; 20];
        for (byte, pair) in id.iter_mut().zip(hex.chunks(2)) {
            *byte = digit_value(pair[0])? << 4 | digit_value(pair[1])?;
        }
        Some(BlobId(id))
    }

    fn path_in(&self, objects_dir: &Path) -> PathBuf {
        let hex = self.to_string();
        objects_dir.join(&hex[..2]).join(&hex[2..])
    }
}

static CHARS: &[u8] = b"0123456789abcdef";

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in self.0.iter() {
            f.write_char(CHARS[(byte >> 4) as usize].into())?;
            f.write_char(CHARS[(byte & 0xf) as usize].into())?;
        }

        Ok(())
    }
}

impl FromStr for BlobId {
    type Err = io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlobId::from_hex(s).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid blob ID `{}`", s),
            )
        })
    }
}

fn digit_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// Store `content` under `objects_dir` unless an identical blob is there
/// already.
pub(crate) fn put(objects_dir: &Path, content: &[u8]) -> io::Result<BlobId> {
    let id = BlobId::of(content);
    let path = id.path_in(objects_dir);
    if path.exists() {
        return Ok(id);
    }

    let dir = path.parent().unwrap_or(objects_dir);
    fs::create_dir_all(dir)?;

    let tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut encoder = ZlibEncoder::new(tmp.as_file(), Compression::default());
        encoder.write_all(content)?;
        encoder.finish()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(&path).map_err(|err| err.error)?;

    Ok(id)
}

/// Read the blob `id` from `objects_dir`.
pub(crate) fn get(objects_dir: &Path, id: &BlobId) -> io::Result<Vec<u8>> {
    let file = fs::File::open(id.path_in(objects_dir))?;
    let mut content = Vec::new();
    ZlibDecoder::new(file).read_to_end(&mut content)?;

    if BlobId::of(&content) != *id {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("blob {} is corrupt", id),
        ));
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_CONTENT: &[u8; 13] = b"test content\n";

    #[test]
    fn matches_git_blob_id() {
        // `echo 'test content' | git hash-object --stdin`
        assert_eq!(
            BlobId::of(TEST_CONTENT).to_string(),
            "d670460b4b4aece5915caf5c68d12f560a9fe3e4"
        );
        assert_eq!(
            BlobId::of(b"").to_string(),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
    }

    #[test]
    fn from_hex() {
        let id = BlobId::from_hex("d670460b4b4aece5915caf5c68d12f560a9fe3e4").unwrap();
        assert_eq!(id, BlobId::of(TEST_CONTENT));

        assert!(BlobId::from_hex("").is_none());
        assert!(BlobId::from_hex("d670460b").is_none());
        assert!(BlobId::from_hex("D670460B4B4AECE5915CAF5C68D12F560A9FE3E4").is_none());
        assert!("xyz".parse::<BlobId>().is_err());
    }

    #[test]
    fn put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let objects = dir.path();

        let id = put(objects, TEST_CONTENT).unwrap();
        assert!(objects
            .join("d6/70460b4b4aece5915caf5c68d12f560a9fe3e4")
            .is_file());
        assert_eq!(get(objects, &id).unwrap(), TEST_CONTENT.to_vec());

        // Storing the same content again is a no-op.
        assert_eq!(put(objects, TEST_CONTENT).unwrap(), id);
    }

    #[test]
    fn corrupt_blob_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let objects = dir.path();

        let id = put(objects, TEST_CONTENT).unwrap();
        let other = put(objects, b"other").unwrap();
        fs::copy(other.path_in(objects), id.path_in(objects)).unwrap();

        let err = get(objects, &id).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn missing_blob() {
        let dir = tempfile::tempdir().unwrap();
        let err = get(dir.path(), &BlobId::of(TEST_CONTENT)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
