use std::fs;
use std::io::{ErrorKind, Read};
use std::path::Path;

use log::debug;

use crate::error::{Result, SweepError};

/// Lowercase hex blake3 digest of one chunk.
pub type ChunkDigest = String;

/// Hashes `file_path` in fixed, positional chunks of `chunk_size` bytes.
///
/// The file is read once from start to end. Every chunk except possibly the last
/// is exactly `chunk_size` bytes long; an empty file yields no digests.
pub fn hash_file_chunks(file_path: &Path, chunk_size: usize) -> Result<Vec<ChunkDigest>> {
    debug!("Calculating chunk hashes for: '{}'", file_path.display());

    let file = fs::File::open(file_path).map_err(|e| SweepError::io(file_path, e))?;
    let digests =
        hash_reader_chunks(file, chunk_size).map_err(|e| SweepError::io(file_path, e))?;

    debug!(
        "Hashed '{}' into {} chunk(s)",
        file_path.display(),
        digests.len()
    );
    Ok(digests)
}

/// Same as [`hash_file_chunks`] for any reader.
pub fn hash_reader_chunks<R: Read>(mut reader: R, chunk_size: usize) -> std::io::Result<Vec<ChunkDigest>> {
    if chunk_size == 0 {
        return Err(std::io::Error::new(
            ErrorKind::InvalidInput,
            "chunk_size must be greater than zero",
        ));
    }

    let mut digests = Vec::new();
    let mut buffer = vec![0u8; chunk_size];

    loop {
        let filled = fill_chunk(&mut reader, &mut buffer)?;
        if filled == 0 {
            break;
        }
        digests.push(blake3::hash(&buffer[..filled]).to_hex().to_string());
        if filled < chunk_size {
            break;
        }
    }

    Ok(digests)
}

/// Reads until `buffer` is full or the reader is exhausted. Short reads are retried
/// so chunk boundaries never depend on how the OS splits reads.
fn fill_chunk<R: Read>(reader: &mut R, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Hands out at most 7 bytes per read.
    struct Trickle<R>(R);

    impl<R: Read> Read for Trickle<R> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let len = buf.len().min(7);
            self.0.read(&mut buf[..len])
        }
    }

    #[test]
    fn test_empty_input_has_no_chunks() {
        let digests = hash_reader_chunks(Cursor::new(Vec::new()), 16).unwrap();
        assert!(digests.is_empty());
    }

    #[test]
    fn test_chunk_count_and_short_tail() {
        let data = vec![1u8; 40];
        let digests = hash_reader_chunks(Cursor::new(&data), 16).unwrap();
        assert_eq!(digests.len(), 3);
        assert_eq!(digests[0], digests[1]);
        assert_ne!(digests[1], digests[2]);
        assert_eq!(digests[2], blake3::hash(&data[32..]).to_hex().to_string());
    }

    #[test]
    fn test_exact_multiple_has_no_empty_tail() {
        let digests = hash_reader_chunks(Cursor::new(vec![9u8; 32]), 16).unwrap();
        assert_eq!(digests.len(), 2);
    }

    #[test]
    fn test_short_reads_do_not_move_boundaries() {
        let data: Vec<u8> = (0..100u8).collect();
        let whole = hash_reader_chunks(Cursor::new(&data), 32).unwrap();
        let trickled = hash_reader_chunks(Trickle(Cursor::new(&data)), 32).unwrap();
        assert_eq!(whole, trickled);
    }

    #[test]
    fn test_digests_are_lowercase_hex() {
        let digests = hash_reader_chunks(Cursor::new(b"hello".to_vec()), 16).unwrap();
        assert_eq!(digests[0].len(), 64);
        assert!(digests[0].chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let err = hash_reader_chunks(Cursor::new(b"data".to_vec()), 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        fs::write(&path, b"data").unwrap();
        assert!(matches!(hash_file_chunks(&path, 0), Err(SweepError::Io { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = hash_file_chunks(&dir.path().join("missing.bin"), 16).unwrap_err();
        assert!(matches!(err, SweepError::Io { .. }));
    }
}
