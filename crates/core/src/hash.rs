//! Streaming SHA-256 digests.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::Result;

/// Digest block size. Source images run to gigabytes, so files are hashed
/// in fixed-size blocks rather than read whole.
const BLOCK_SIZE: usize = 8192;

/// Compute the SHA-256 digest of a file as a lowercase hex string.
pub fn sha256_file(path: &Path) -> Result<String> {
  let mut reader = BufReader::new(File::open(path)?);
  let mut hasher = Sha256::new();
  let mut block = [0u8; BLOCK_SIZE];

  loop {
    let n = reader.read(&mut block)?;
    if n == 0 {
      break;
    }
    hasher.update(&block[..n]);
  }

  Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;
  use tempfile::NamedTempFile;

  #[test]
  fn digest_of_known_content() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"hello world").unwrap();
    file.flush().unwrap();

    let digest = sha256_file(file.path()).unwrap();
    assert_eq!(
      digest,
      "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
    );
  }

  #[test]
  fn digest_of_empty_file() {
    let file = NamedTempFile::new().unwrap();
    let digest = sha256_file(file.path()).unwrap();
    assert_eq!(
      digest,
      "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
  }
}
