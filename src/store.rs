use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tempfile::{NamedTempFile, TempDir};
use zstd::stream::{Encoder, decode_all};

use crate::error::{Result, SweepError};
use crate::hasher::ChunkDigest;

const RECORD_EXTENSION: &str = "json.zst";
const COMPRESSION_LEVEL: i32 = 3;
/// Keeps `{name}_{64 hex}.json.zst` under the usual 255-byte file name limit.
const MAX_NAME_PREFIX: usize = 96;

/// A file's path together with its positional chunk digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    #[serde(with = "lossless_path")]
    pub source_path: PathBuf,
    #[serde(rename = "digests")]
    pub chunk_hashes: Vec<ChunkDigest>,
}

impl Fingerprint {
    pub fn new(source_path: impl Into<PathBuf>, chunk_hashes: Vec<ChunkDigest>) -> Self {
        Self {
            source_path: source_path.into(),
            chunk_hashes,
        }
    }
}

/// Paths are stored as plain strings when they are valid UTF-8, otherwise as the
/// platform's raw path units, so every name the walker can return round-trips.
mod lossless_path {
    use std::path::{Path, PathBuf};

    use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum StoredPath {
        Text(String),
        /// Unix path bytes.
        #[cfg_attr(not(unix), allow(dead_code))]
        Raw { raw: Vec<u8> },
        /// Windows UTF-16 code units, possibly unpaired surrogates.
        #[cfg_attr(not(windows), allow(dead_code))]
        Wide { wide: Vec<u16> },
    }

    pub fn serialize<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
        let stored = match path.to_str() {
            Some(text) => StoredPath::Text(text.to_string()),
            None => to_units(path),
        };
        stored.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PathBuf, D::Error> {
        match StoredPath::deserialize(deserializer)? {
            StoredPath::Text(text) => Ok(PathBuf::from(text)),
            stored => from_units(stored).map_err(D::Error::custom),
        }
    }

    #[cfg(unix)]
    fn to_units(path: &Path) -> StoredPath {
        use std::os::unix::ffi::OsStrExt;
        StoredPath::Raw {
            raw: path.as_os_str().as_bytes().to_vec(),
        }
    }

    #[cfg(windows)]
    fn to_units(path: &Path) -> StoredPath {
        use std::os::windows::ffi::OsStrExt;
        StoredPath::Wide {
            wide: path.as_os_str().encode_wide().collect(),
        }
    }

    #[cfg(unix)]
    fn from_units(stored: StoredPath) -> Result<PathBuf, &'static str> {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;
        match stored {
            StoredPath::Raw { raw } => Ok(PathBuf::from(OsStr::from_bytes(&raw))),
            _ => Err("path was recorded on a platform with UTF-16 paths"),
        }
    }

    #[cfg(windows)]
    fn from_units(stored: StoredPath) -> Result<PathBuf, &'static str> {
        use std::ffi::OsString;
        use std::os::windows::ffi::OsStringExt;
        match stored {
            StoredPath::Wide { wide } => Ok(PathBuf::from(OsString::from_wide(&wide))),
            _ => Err("path was recorded on a platform with byte paths"),
        }
    }
}

/// Record key derived from the full source path plus its base name.
///
/// Depends only on the path, never on where the record is stored, so files from
/// every depth of the tree land side by side in one flat scratch area.
pub fn record_key(source_path: &Path) -> String {
    let path_hash = blake3::hash(source_path.as_os_str().as_encoded_bytes());
    let base_name = source_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string());
    let mut prefix_end = base_name.len().min(MAX_NAME_PREFIX);
    while !base_name.is_char_boundary(prefix_end) {
        prefix_end -= 1;
    }
    format!("{}_{}", &base_name[..prefix_end], path_hash.to_hex())
}

/// Flat scratch directory holding one compressed JSON record per fingerprinted file.
///
/// `put` may be called from many threads at once: each record has its own key and
/// is written to a temporary file first, then renamed into place.
pub struct FingerprintStore {
    root: PathBuf,
    // Removes an auto-provisioned scratch area on drop (unless kept).
    _guard: Option<TempDir>,
}

impl FingerprintStore {
    /// Creates the scratch area.
    ///
    /// With `scratch_dir` the given directory is created if needed, emptied of records
    /// left by an earlier run, and never removed. Otherwise a fresh temporary directory
    /// is used, removed on drop unless `keep`.
    pub fn provision(scratch_dir: Option<&Path>, keep: bool) -> Result<Self> {
        let store = match scratch_dir {
            Some(dir) => {
                fs::create_dir_all(dir).map_err(|source| SweepError::Provisioning {
                    path: dir.to_path_buf(),
                    source,
                })?;
                let store = Self {
                    root: dir.to_path_buf(),
                    _guard: None,
                };
                store.clear_records()?;
                store
            }
            None => {
                let dir = tempfile::Builder::new()
                    .prefix(concat!(env!("CARGO_PKG_NAME"), "-"))
                    .keep(keep)
                    .tempdir()
                    .map_err(|source| SweepError::Provisioning {
                        path: std::env::temp_dir(),
                        source,
                    })?;
                Self {
                    root: dir.path().to_path_buf(),
                    _guard: Some(dir),
                }
            }
        };
        info!("Scratch area at: '{}'", store.root.display());
        Ok(store)
    }

    fn clear_records(&self) -> Result<()> {
        let entries = fs::read_dir(&self.root).map_err(|source| SweepError::Provisioning {
            path: self.root.clone(),
            source,
        })?;
        for entry in entries.flatten() {
            let path = entry.path();
            if is_record(&path) {
                debug!("Removing stale record: '{}'", path.display());
                fs::remove_file(&path).map_err(|source| SweepError::Provisioning {
                    path: path.clone(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn record_path(&self, source_path: &Path) -> PathBuf {
        self.root
            .join(format!("{}.{}", record_key(source_path), RECORD_EXTENSION))
    }

    /// Persists one fingerprint, returning the record's location.
    pub fn put(&self, fingerprint: &Fingerprint) -> Result<PathBuf> {
        let destination = self.record_path(&fingerprint.source_path);
        let content = serde_json::to_vec(fingerprint)
            .map_err(|e| SweepError::storage(&destination, e))?;

        let staging = NamedTempFile::new_in(&self.root)
            .map_err(|e| SweepError::storage(&self.root, e))?;
        let mut encoder = Encoder::new(staging.as_file(), COMPRESSION_LEVEL)
            .map_err(|e| SweepError::storage(&destination, e))?;
        encoder
            .write_all(&content)
            .map_err(|e| SweepError::storage(&destination, e))?;
        encoder
            .finish()
            .map_err(|e| SweepError::storage(&destination, e))?;
        staging
            .persist(&destination)
            .map_err(|e| SweepError::storage(&destination, e.error))?;

        debug!(
            "Stored fingerprint for '{}' at '{}'",
            fingerprint.source_path.display(),
            destination.display()
        );
        Ok(destination)
    }

    /// Reads back every record in directory enumeration order.
    pub fn list(&self) -> Result<Vec<Fingerprint>> {
        let entries = fs::read_dir(&self.root).map_err(|e| SweepError::storage(&self.root, e))?;
        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SweepError::storage(&self.root, e))?;
            let path = entry.path();
            if !is_record(&path) {
                warn!("Ignoring stray entry in scratch area: '{}'", path.display());
                continue;
            }
            records.push(Self::load(&path)?);
        }

        info!("Loaded {} fingerprint record(s)", records.len());
        Ok(records)
    }

    /// Reads a single record file.
    pub fn load(record_path: &Path) -> Result<Fingerprint> {
        let compressed = fs::read(record_path).map_err(|e| SweepError::storage(record_path, e))?;
        let decoded = decode_all(&compressed[..]).map_err(|e| SweepError::storage(record_path, e))?;
        serde_json::from_slice(&decoded).map_err(|e| SweepError::storage(record_path, e))
    }
}

fn is_record(path: &Path) -> bool {
    let suffix = format!(".{RECORD_EXTENSION}");
    path.is_file()
        && path
            .file_name()
            .map(|n| n.to_string_lossy().ends_with(&suffix))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(path: &str, digests: &[&str]) -> Fingerprint {
        Fingerprint::new(path, digests.iter().map(|d| d.to_string()).collect())
    }

    #[test]
    fn test_put_then_load_round_trips() {
        let scratch = tempfile::tempdir().unwrap();
        let store = FingerprintStore::provision(Some(scratch.path()), false).unwrap();
        let fingerprint = sample("/data/dir with spaces/ünïcode.txt", &["bb", "aa", "bb", "cc"]);

        let record = store.put(&fingerprint).unwrap();
        assert_eq!(FingerprintStore::load(&record).unwrap(), fingerprint);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_round_trips() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let scratch = tempfile::tempdir().unwrap();
        let store = FingerprintStore::provision(Some(scratch.path()), false).unwrap();
        let path = Path::new("/data").join(OsStr::from_bytes(b"bad\xff.txt"));
        let fingerprint = Fingerprint::new(&path, vec!["aa".to_string()]);

        let record = store.put(&fingerprint).unwrap();
        let loaded = FingerprintStore::load(&record).unwrap();
        assert_eq!(loaded, fingerprint);
        assert_eq!(loaded.source_path.as_os_str().as_bytes(), b"/data/bad\xff.txt");
    }

    #[test]
    fn test_utf8_path_stored_as_plain_string() {
        let json = serde_json::to_value(sample("/data/a.txt", &["01"])).unwrap();
        assert_eq!(json["source_path"], "/data/a.txt");
        assert_eq!(json["digests"][0], "01");
    }

    #[test]
    fn test_empty_digest_list_round_trips() {
        let scratch = tempfile::tempdir().unwrap();
        let store = FingerprintStore::provision(Some(scratch.path()), false).unwrap();
        let fingerprint = sample("/data/empty.bin", &[]);
        store.put(&fingerprint).unwrap();
        assert_eq!(store.list().unwrap(), vec![fingerprint]);
    }

    #[test]
    fn test_same_base_name_in_different_dirs_gets_distinct_keys() {
        let a = record_key(Path::new("/root/a/notes.txt"));
        let b = record_key(Path::new("/root/b/notes.txt"));
        assert_ne!(a, b);
        assert!(a.starts_with("notes.txt_"));
        assert!(b.starts_with("notes.txt_"));
        assert_eq!(a, record_key(Path::new("/root/a/notes.txt")));
    }

    #[test]
    fn test_long_base_name_is_truncated() {
        let long = format!("/x/{}", "é".repeat(200));
        let key = record_key(Path::new(&long));
        assert!(key.len() <= MAX_NAME_PREFIX + 1 + 64);
    }

    #[test]
    fn test_list_is_flat_and_ignores_strays() {
        let scratch = tempfile::tempdir().unwrap();
        let store = FingerprintStore::provision(Some(scratch.path()), false).unwrap();
        store.put(&sample("/t/a/deep/x.bin", &["01"])).unwrap();
        store.put(&sample("/t/y.bin", &["02"])).unwrap();
        fs::write(scratch.path().join("notes.txt"), "not a record").unwrap();

        let mut listed: Vec<_> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|f| f.source_path)
            .collect();
        listed.sort();
        assert_eq!(listed, vec![PathBuf::from("/t/a/deep/x.bin"), PathBuf::from("/t/y.bin")]);
    }

    #[test]
    fn test_corrupt_record_is_storage_error() {
        let scratch = tempfile::tempdir().unwrap();
        let store = FingerprintStore::provision(Some(scratch.path()), false).unwrap();
        fs::write(scratch.path().join("bad_0.json.zst"), b"garbage").unwrap();
        assert!(matches!(store.list(), Err(SweepError::Storage { .. })));
    }

    #[test]
    fn test_reused_scratch_dir_starts_empty() {
        let scratch = tempfile::tempdir().unwrap();
        let first = FingerprintStore::provision(Some(scratch.path()), false).unwrap();
        first.put(&sample("/t/old.bin", &["01"])).unwrap();
        drop(first);

        let second = FingerprintStore::provision(Some(scratch.path()), false).unwrap();
        assert!(second.list().unwrap().is_empty());
        assert!(scratch.path().is_dir());
    }

    #[test]
    fn test_temporary_scratch_is_removed_on_drop() {
        let store = FingerprintStore::provision(None, false).unwrap();
        let root = store.root().to_path_buf();
        assert!(root.is_dir());
        drop(store);
        assert!(!root.exists());
    }

    #[test]
    fn test_provisioning_failure() {
        let scratch = tempfile::tempdir().unwrap();
        let blocker = scratch.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let err = FingerprintStore::provision(Some(&blocker.join("sub")), false)
            .err()
            .unwrap();
        assert!(matches!(err, SweepError::Provisioning { .. }));
    }
}
