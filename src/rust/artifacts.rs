use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::PredictorError;

pub const HOME_ENV: &str = "VIRAL_PREDICTOR_HOME";

/// Locates classifier and dataset artifacts and checks their integrity.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Creates a store rooted at the default artifacts directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_dir())
    }

    /// Returns the default artifacts directory path
    pub fn get_default_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var(HOME_ENV) {
            return PathBuf::from(path);
        }

        // 2. Use platform-specific data directory
        if let Some(data_dir) = dirs::data_dir() {
            return data_dir.join("viral-predictor");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".local").join("share").join("viral-predictor");
        }

        // 4. If all else fails, use system temp directory
        env::temp_dir().join("viral-predictor")
    }

    pub fn new<P: AsRef<Path>>(root: P) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a configured path: absolute paths are kept, relative ones
    /// are looked up in the working directory first, then in the store.
    pub fn locate<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() || path.exists() {
            return path.to_path_buf();
        }
        self.root.join(path)
    }

    /// Hex sha256 digest of a file
    pub fn sha256_file(path: &Path) -> Result<String, PredictorError> {
        log::debug!("Hashing file: {:?}", path);
        let bytes = fs::read(path)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Checks that an artifact exists and, when a digest is pinned, that it matches
    ///
    /// # Errors
    /// - `ClassifierUnavailable` if the file is missing or its digest differs
    pub fn verify(&self, path: &Path, expected_sha256: Option<&str>) -> Result<(), PredictorError> {
        if !path.exists() {
            return Err(PredictorError::ClassifierUnavailable(format!(
                "Artifact not found: {}",
                path.display()
            )));
        }
        let Some(expected) = expected_sha256 else {
            log::warn!("No sha256 pinned for {:?}, loading unverified", path);
            return Ok(());
        };

        let actual = Self::sha256_file(path)?;
        log::info!("Calculated hash: {}", actual);
        log::info!("Expected hash:   {}", expected);
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            log::error!("Hash mismatch for {:?}: expected {}, got {}", path, expected, actual);
            return Err(PredictorError::ClassifierUnavailable(format!(
                "Hash mismatch for {}: expected {}, got {}",
                path.display(),
                expected,
                actual
            )));
        }
        log::info!("Artifact {:?} verified", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_verify_pinned_digest() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let path = dir.path().join("model.onnx");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(b"viral").unwrap();

        let digest = ArtifactStore::sha256_file(&path).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(store.verify(&path, Some(digest.as_str())).is_ok());
        assert!(store.verify(&path, Some(digest.to_uppercase().as_str())).is_ok());
        assert!(store.verify(&path, None).is_ok());

        let err = store.verify(&path, Some("0".repeat(64).as_str())).unwrap_err();
        assert!(matches!(err, PredictorError::ClassifierUnavailable(_)));
    }

    #[test]
    fn test_verify_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let err = store.verify(&dir.path().join("absent.onnx"), None).unwrap_err();
        assert!(matches!(err, PredictorError::ClassifierUnavailable(_)));
    }

    #[test]
    fn test_locate_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        assert_eq!(store.locate("no-such-model.onnx"), dir.path().join("no-such-model.onnx"));
        assert_eq!(store.locate("/abs/model.onnx"), PathBuf::from("/abs/model.onnx"));
    }

    #[test]
    fn test_default_dir_from_env() {
        env::set_var(HOME_ENV, "/tmp/test-viral-home");
        let path = ArtifactStore::get_default_dir();
        assert_eq!(path, PathBuf::from("/tmp/test-viral-home"));
        env::remove_var(HOME_ENV);

        let path = ArtifactStore::get_default_dir();
        assert!(path.to_str().unwrap().contains("viral-predictor"));
    }
}
