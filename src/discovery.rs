//! Port discovery file
//!
//! The agent advertises its bound TCP port by writing it as decimal text to
//! a well-known path, so external orchestration can find the broadcast
//! endpoint. Publication failure is fatal at startup (the process must not
//! run undiscoverable); removal failure at shutdown is logged but not fatal.

use std::path::{Path, PathBuf};

/// Error type for discovery file operations
#[derive(Debug)]
pub enum DiscoveryError {
    /// The port file could not be written
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The port file could not be removed
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryError::Persist { path, source } => {
                write!(f, "failed to publish port file {}: {}", path.display(), source)
            }
            DiscoveryError::Remove { path, source } => {
                write!(f, "failed to remove port file {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiscoveryError::Persist { source, .. } => Some(source),
            DiscoveryError::Remove { source, .. } => Some(source),
        }
    }
}

/// A published port advertisement
#[derive(Debug)]
pub struct DiscoveryFile {
    path: PathBuf,
}

impl DiscoveryFile {
    /// Write the port as decimal text to `path`
    pub fn publish(path: impl Into<PathBuf>, port: u16) -> Result<Self, DiscoveryError> {
        let path = path.into();
        std::fs::write(&path, port.to_string()).map_err(|source| DiscoveryError::Persist {
            path: path.clone(),
            source,
        })?;

        tracing::info!(path = %path.display(), port = port, "published port discovery file");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the advertisement; used on clean shutdown
    pub fn remove(self) -> Result<(), DiscoveryError> {
        std::fs::remove_file(&self.path).map_err(|source| DiscoveryError::Remove {
            path: self.path.clone(),
            source,
        })?;

        tracing::info!(path = %self.path.display(), "removed port discovery file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("motion-relay-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_publish_writes_decimal_port() {
        let path = temp_path("publish.port");

        let file = DiscoveryFile::publish(&path, 41234).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "41234");

        file.remove().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_publish_fails_on_bad_path() {
        let path = temp_path("no-such-dir").join("nested.port");

        let err = DiscoveryFile::publish(&path, 1).unwrap_err();
        assert!(matches!(err, DiscoveryError::Persist { .. }));
    }

    #[test]
    fn test_remove_fails_when_already_gone() {
        let path = temp_path("remove.port");

        let file = DiscoveryFile::publish(&path, 9).unwrap();
        std::fs::remove_file(&path).unwrap();

        let err = file.remove().unwrap_err();
        assert!(matches!(err, DiscoveryError::Remove { .. }));
    }
}
