//! Content digests. Full-file MD5/SHA-256 below 1 GiB; above that a
//! sampled digest over the first/last/middle 1 MiB blocks (spec.md
//! §4.2). The `mtime` algorithm never touches file content.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use md5::Md5;
use sha2::{Digest as Sha2Digest, Sha256};
use thiserror::Error;

use sync_config::ChecksumAlgorithm;

pub const SAMPLE_THRESHOLD_BYTES: u64 = 1024 * 1024 * 1024;
const SAMPLE_BLOCK_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Hex-encoded digest of `path` under `algorithm`. `size` and `mtime`
/// are the caller's already-known `stat()` results; `mtime` is
/// returned verbatim for the `Mtime` algorithm, no content is read.
pub fn compute_digest(
    path: &Path,
    algorithm: ChecksumAlgorithm,
    size: u64,
    mtime: i64,
) -> Result<String, DigestError> {
    if algorithm == ChecksumAlgorithm::Mtime {
        return Ok(mtime.to_string());
    }

    let mut file = File::open(path).map_err(|e| DigestError::Open {
        path: path.display().to_string(),
        source: e,
    })?;

    if size >= SAMPLE_THRESHOLD_BYTES {
        return sampled_digest(&mut file, path, algorithm, size);
    }

    let mut buf = Vec::with_capacity(size as usize);
    file.read_to_end(&mut buf).map_err(|e| DigestError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(hash_bytes(algorithm, &buf))
}

fn sampled_digest(
    file: &mut File,
    path: &Path,
    algorithm: ChecksumAlgorithm,
    size: u64,
) -> Result<String, DigestError> {
    let read_err = |e: std::io::Error| DigestError::Read {
        path: path.display().to_string(),
        source: e,
    };

    let mut combined = Vec::with_capacity(3 * SAMPLE_BLOCK_BYTES as usize);

    let mut head = vec![0u8; SAMPLE_BLOCK_BYTES as usize];
    file.seek(SeekFrom::Start(0)).map_err(read_err)?;
    file.read_exact(&mut head).map_err(read_err)?;
    combined.extend_from_slice(&head);

    let middle_offset = (size / 2).saturating_sub(SAMPLE_BLOCK_BYTES / 2);
    let mut middle = vec![0u8; SAMPLE_BLOCK_BYTES as usize];
    file.seek(SeekFrom::Start(middle_offset)).map_err(read_err)?;
    file.read_exact(&mut middle).map_err(read_err)?;
    combined.extend_from_slice(&middle);

    let tail_offset = size - SAMPLE_BLOCK_BYTES;
    let mut tail = vec![0u8; SAMPLE_BLOCK_BYTES as usize];
    file.seek(SeekFrom::Start(tail_offset)).map_err(read_err)?;
    file.read_exact(&mut tail).map_err(read_err)?;
    combined.extend_from_slice(&tail);

    Ok(hash_bytes(algorithm, &combined))
}

fn hash_bytes(algorithm: ChecksumAlgorithm, bytes: &[u8]) -> String {
    match algorithm {
        ChecksumAlgorithm::Md5 => {
            let mut hasher = Md5::new();
            hasher.update(bytes);
            hex::encode(hasher.finalize())
        }
        ChecksumAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            hex::encode(hasher.finalize())
        }
        ChecksumAlgorithm::Mtime => unreachable!("handled before content is read"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn mtime_algorithm_never_opens_the_file() {
        let digest = compute_digest(Path::new("/does/not/exist"), ChecksumAlgorithm::Mtime, 0, 12345).unwrap();
        assert_eq!(digest, "12345");
    }

    #[test]
    fn small_file_digest_is_deterministic() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"hello world").unwrap();
        let d1 = compute_digest(f.path(), ChecksumAlgorithm::Sha256, 11, 0).unwrap();
        let d2 = compute_digest(f.path(), ChecksumAlgorithm::Sha256, 11, 0).unwrap();
        assert_eq!(d1, d2);
        assert_eq!(d1.len(), 64);
    }

    #[test]
    fn md5_digest_has_expected_length() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"hello world").unwrap();
        let d = compute_digest(f.path(), ChecksumAlgorithm::Md5, 11, 0).unwrap();
        assert_eq!(d.len(), 32);
    }

    #[test]
    fn sampled_digest_covers_large_files() {
        let mut f = NamedTempFile::new().unwrap();
        let size = SAMPLE_THRESHOLD_BYTES + 10;
        f.as_file().set_len(size).unwrap();
        // write distinguishing bytes at head/middle/tail so the sample
        // actually depends on all three regions
        f.write_all(b"head").unwrap();
        f.seek(SeekFrom::Start(size / 2)).unwrap();
        f.write_all(b"middle").unwrap();
        f.seek(SeekFrom::Start(size - 4)).unwrap();
        f.write_all(b"tail").unwrap();
        f.flush().unwrap();

        let digest = compute_digest(f.path(), ChecksumAlgorithm::Sha256, size, 0).unwrap();
        assert_eq!(digest.len(), 64);
    }
}
