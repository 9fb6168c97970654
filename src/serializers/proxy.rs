//! File handling around a serializer backend

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use super::{Serializer, SerializerRegistry};
use crate::cassette::format::CassetteData;
use crate::{Result, RewindError};

/// Reads and writes one cassette file through a backend
///
/// Writing is refused unless serialization has been allowed, so a pure
/// playback session never touches the file.
#[derive(Clone)]
pub struct SerializerProxy {
    serializer: Arc<dyn Serializer>,
    path: PathBuf,
    allow_serialization: bool,
}

impl SerializerProxy {
    /// Wrap `serializer` for the file at `path`
    #[must_use]
    pub fn new(serializer: Arc<dyn Serializer>, path: PathBuf) -> Self {
        Self {
            serializer,
            path,
            allow_serialization: false,
        }
    }

    /// Resolve the backend `serialize_with` and the cassette path for `name`
    ///
    /// # Errors
    ///
    /// Returns error if no backend is registered under `serialize_with`
    pub fn find(
        registry: &SerializerRegistry,
        serialize_with: &str,
        library_dir: &Path,
        name: &str,
    ) -> Result<Self> {
        let serializer = registry.get(serialize_with)?;
        let path = serializer.cassette_path(library_dir, name);
        Ok(Self::new(serializer, path))
    }

    /// Path of the cassette file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the backend in use
    #[must_use]
    pub fn serializer_name(&self) -> &str {
        self.serializer.name()
    }

    /// Whether [`serialize`](Self::serialize) will write
    #[must_use]
    pub fn allow_serialization(&self) -> bool {
        self.allow_serialization
    }

    /// Permit or forbid writing
    pub fn set_allow_serialization(&mut self, allow: bool) {
        self.allow_serialization = allow;
    }

    fn ensure_directory(&self) -> Result<()> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => {
                Err(RewindError::MissingDirectory(dir.to_path_buf()))
            }
            _ => Ok(()),
        }
    }

    /// Write the cassette, if allowed
    ///
    /// # Errors
    ///
    /// Returns error if the directory is missing, encoding fails, or the
    /// file cannot be written
    pub fn serialize(&self, data: &CassetteData) -> Result<()> {
        if !self.allow_serialization {
            debug!("Serialization disabled, not writing {}", self.path.display());
            return Ok(());
        }

        self.ensure_directory()?;
        let bytes = self.serializer.serialize(data)?;
        fs::write(&self.path, bytes)?;

        debug!(
            "Wrote {} interactions to {}",
            data.http_interactions.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Read the cassette
    ///
    /// A missing file, an empty one, and one that fails to decode all come
    /// back as an empty cassette.
    ///
    /// # Errors
    ///
    /// Returns error if the directory is missing or the file exists but
    /// cannot be read
    pub fn deserialize(&self) -> Result<CassetteData> {
        self.ensure_directory()?;

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No cassette at {} yet", self.path.display());
                return Ok(CassetteData::default());
            }
            Err(e) => return Err(e.into()),
        };

        if bytes.is_empty() {
            return Ok(CassetteData::default());
        }

        if !self.serializer.stored_as_binary() && std::str::from_utf8(&bytes).is_err() {
            warn!(
                "Cassette {} is not valid UTF-8, starting empty",
                self.path.display()
            );
            return Ok(CassetteData::default());
        }

        match self.serializer.deserialize(&bytes) {
            Ok(data) => Ok(data),
            Err(e) => {
                warn!(
                    "Cassette {} could not be decoded ({}), starting empty",
                    self.path.display(),
                    e
                );
                Ok(CassetteData::default())
            }
        }
    }
}

impl std::fmt::Debug for SerializerProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializerProxy")
            .field("serializer", &self.serializer.name())
            .field("path", &self.path)
            .field("allow_serialization", &self.allow_serialization)
            .finish()
    }
}
