//! Content hashers with streaming support.
//!
//! # Overview
//!
//! Every hasher implements the single-method [`ContentHasher`] capability:
//! a path goes in, a [`HashOutcome`] comes out. The outcome is a tagged
//! result rather than a plain `Result` because content-specific hashers can
//! refuse a file whose structure they do not accept (a [`HashOutcome::Skipped`]),
//! which is neither a digest nor an I/O failure.
//!
//! Concrete hashers are selected by [`HashAlgorithm`]:
//! - `blake3` (default) and `sha256`/`sha512` hash the full file content
//! - `id3-stripped` hashes audio payload only, ignoring ID3v2/ID3v1 tags,
//!   so re-tagged copies of the same track compare equal
//!
//! All hashers stream the file through a fixed-size buffer; memory usage is
//! independent of file size.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::Digest as _;

use super::HashError;

/// Read buffer size for streaming file content (64 KiB).
pub const READ_BUFFER_SIZE: usize = 64 * 1024;

/// A fixed-length content digest. Equality is byte-wise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(Vec<u8>);

impl Digest {
    /// Wrap raw digest bytes.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Digest as lowercase hexadecimal.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Result of hashing one file.
#[derive(Debug)]
pub enum HashOutcome {
    /// The file was hashed.
    Hashed(Digest),
    /// The hasher refused the file because of its structure.
    Skipped(String),
    /// The file could not be read.
    Failed(HashError),
}

/// Capability: compute a content digest for a file.
pub trait ContentHasher: Send + Sync {
    /// Name of the algorithm as reported to users.
    fn name(&self) -> &'static str;

    /// Hash the file at `path`.
    fn hash_file(&self, path: &Path) -> HashOutcome;
}

/// Available content hash algorithms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum HashAlgorithm {
    /// BLAKE3 over the full content.
    #[default]
    Blake3,
    /// SHA-256 over the full content.
    Sha256,
    /// SHA-512 over the full content.
    Sha512,
    /// BLAKE3 over audio payload with ID3v2/ID3v1 tags removed.
    Id3Stripped,
}

impl HashAlgorithm {
    /// Build the hasher for this algorithm.
    #[must_use]
    pub fn build(self) -> Box<dyn ContentHasher> {
        match self {
            Self::Blake3 => Box::new(Blake3Hasher),
            Self::Sha256 => Box::new(Sha256Hasher),
            Self::Sha512 => Box::new(Sha512Hasher),
            Self::Id3Stripped => Box::new(Id3StrippedHasher),
        }
    }

    /// Whether two files of different sizes can share a digest.
    ///
    /// Size bucketing is only sound for hashers that cover the whole file.
    #[must_use]
    pub fn covers_full_content(self) -> bool {
        !matches!(self, Self::Id3Stripped)
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blake3 => write!(f, "blake3"),
            Self::Sha256 => write!(f, "sha256"),
            Self::Sha512 => write!(f, "sha512"),
            Self::Id3Stripped => write!(f, "id3-stripped"),
        }
    }
}

/// Incremental digest state fed by [`stream_reader`].
trait StreamingDigest {
    fn update(&mut self, data: &[u8]);
    fn finish(self) -> Digest;
}

impl StreamingDigest for blake3::Hasher {
    fn update(&mut self, data: &[u8]) {
        blake3::Hasher::update(self, data);
    }

    fn finish(self) -> Digest {
        Digest::from_bytes(self.finalize().as_bytes().to_vec())
    }
}

impl StreamingDigest for sha2::Sha256 {
    fn update(&mut self, data: &[u8]) {
        sha2::Digest::update(self, data);
    }

    fn finish(self) -> Digest {
        Digest::from_bytes(self.finalize().to_vec())
    }
}

impl StreamingDigest for sha2::Sha512 {
    fn update(&mut self, data: &[u8]) {
        sha2::Digest::update(self, data);
    }

    fn finish(self) -> Digest {
        Digest::from_bytes(self.finalize().to_vec())
    }
}

/// Feed everything `reader` yields into `state`.
fn stream_reader<R: Read, D: StreamingDigest>(mut reader: R, mut state: D) -> io::Result<Digest> {
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        state.update(&buffer[..n]);
    }
    Ok(state.finish())
}

/// Hash the full content of `path`.
fn hash_full<D: StreamingDigest>(path: &Path, state: D) -> HashOutcome {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => return HashOutcome::Failed(HashError::from_io(path, e)),
    };
    match stream_reader(BufReader::new(file), state) {
        Ok(digest) => HashOutcome::Hashed(digest),
        Err(e) => HashOutcome::Failed(HashError::from_io(path, e)),
    }
}

/// BLAKE3 over the full file content.
#[derive(Debug, Default, Clone, Copy)]
pub struct Blake3Hasher;

impl ContentHasher for Blake3Hasher {
    fn name(&self) -> &'static str {
        "blake3"
    }

    fn hash_file(&self, path: &Path) -> HashOutcome {
        hash_full(path, blake3::Hasher::new())
    }
}

/// SHA-256 over the full file content.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn hash_file(&self, path: &Path) -> HashOutcome {
        hash_full(path, sha2::Sha256::new())
    }
}

/// SHA-512 over the full file content.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha512Hasher;

impl ContentHasher for Sha512Hasher {
    fn name(&self) -> &'static str {
        "sha512"
    }

    fn hash_file(&self, path: &Path) -> HashOutcome {
        hash_full(path, sha2::Sha512::new())
    }
}

const ID3V2_HEADER_LEN: u64 = 10;
const ID3V2_FOOTER_FLAG: u8 = 0x10;
const ID3V1_TAG_LEN: u64 = 128;

/// BLAKE3 over audio payload with leading ID3v2 and trailing ID3v1 tags removed.
///
/// Files without tags are hashed in full. A leading `ID3` marker with an
/// invalid header (unknown major version, non-syncsafe size, tag longer than
/// the file) makes the hasher skip the file.
#[derive(Debug, Default, Clone, Copy)]
pub struct Id3StrippedHasher;

impl Id3StrippedHasher {
    /// Byte range of the audio payload, or the reason the file is refused.
    fn payload_range(file: &mut File, len: u64) -> io::Result<Result<(u64, u64), String>> {
        let mut start = 0;
        let mut end = len;

        if len >= ID3V2_HEADER_LEN {
            let mut header = [0u8; ID3V2_HEADER_LEN as usize];
            file.read_exact(&mut header)?;
            if &header[..3] == b"ID3" {
                let major = header[3];
                if !(2..=4).contains(&major) {
                    return Ok(Err(format!("unsupported ID3v2 version 2.{}", major)));
                }
                if header[6..10].iter().any(|b| b & 0x80 != 0) {
                    return Ok(Err("malformed ID3v2 size field".to_string()));
                }
                let body = header[6..10]
                    .iter()
                    .fold(0u64, |acc, b| (acc << 7) | u64::from(*b));
                let footer = if header[5] & ID3V2_FOOTER_FLAG != 0 {
                    ID3V2_HEADER_LEN
                } else {
                    0
                };
                start = ID3V2_HEADER_LEN + body + footer;
                if start > len {
                    return Ok(Err("ID3v2 tag exceeds file length".to_string()));
                }
            }
        }

        if end - start >= ID3V1_TAG_LEN {
            let mut marker = [0u8; 3];
            file.seek(SeekFrom::Start(end - ID3V1_TAG_LEN))?;
            file.read_exact(&mut marker)?;
            if &marker == b"TAG" {
                end -= ID3V1_TAG_LEN;
            }
        }

        Ok(Ok((start, end)))
    }
}

impl ContentHasher for Id3StrippedHasher {
    fn name(&self) -> &'static str {
        "id3-stripped"
    }

    fn hash_file(&self, path: &Path) -> HashOutcome {
        let run = || -> io::Result<Result<Digest, String>> {
            let mut file = File::open(path)?;
            let len = file.metadata()?.len();
            let (start, end) = match Self::payload_range(&mut file, len)? {
                Ok(range) => range,
                Err(reason) => return Ok(Err(reason)),
            };
            file.seek(SeekFrom::Start(start))?;
            let payload = BufReader::new(file).take(end - start);
            Ok(Ok(stream_reader(payload, blake3::Hasher::new())?))
        };

        match run() {
            Ok(Ok(digest)) => HashOutcome::Hashed(digest),
            Ok(Err(reason)) => HashOutcome::Skipped(reason),
            Err(e) => HashOutcome::Failed(HashError::from_io(path, e)),
        }
    }
}
