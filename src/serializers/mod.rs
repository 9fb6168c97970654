//! Cassette storage backends
//!
//! A [`Serializer`] turns [`CassetteData`] into bytes and back. The
//! [`SerializerProxy`] owns everything around that: the file path, whether
//! writing is allowed, and tolerance of missing or corrupt files.

mod binary;
mod json;
mod proxy;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use binary::BinarySerializer;
pub use json::{JsonSerializer, PrettyJsonSerializer};
pub use proxy::SerializerProxy;

use crate::cassette::format::CassetteData;
use crate::{Result, RewindError};

/// A storage format for cassettes
pub trait Serializer: Send + Sync {
    /// Name used to select this backend in `serialize_with`
    fn name(&self) -> &str;

    /// File extension, without the dot
    fn extension(&self) -> &str;

    /// Whether the file holds arbitrary bytes rather than UTF-8 text
    fn stored_as_binary(&self) -> bool {
        false
    }

    /// Encode a cassette
    ///
    /// # Errors
    ///
    /// Returns error if the data cannot be encoded
    fn serialize(&self, data: &CassetteData) -> Result<Vec<u8>>;

    /// Decode a cassette
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a cassette in this format
    fn deserialize(&self, bytes: &[u8]) -> Result<CassetteData>;

    /// Path of the cassette `name` inside `library_dir`
    fn cassette_path(&self, library_dir: &Path, name: &str) -> PathBuf {
        library_dir.join(format!("{name}.{}", self.extension()))
    }
}

/// Serializers available by name
#[derive(Clone)]
pub struct SerializerRegistry {
    serializers: HashMap<String, Arc<dyn Serializer>>,
}

impl SerializerRegistry {
    /// A registry with no backends
    #[must_use]
    pub fn empty() -> Self {
        Self {
            serializers: HashMap::new(),
        }
    }

    /// Register a backend, replacing any with the same name
    pub fn register(&mut self, serializer: impl Serializer + 'static) {
        self.serializers
            .insert(serializer.name().to_string(), Arc::new(serializer));
    }

    /// Look up a backend by name
    ///
    /// # Errors
    ///
    /// Returns error if no backend has that name
    pub fn get(&self, name: &str) -> Result<Arc<dyn Serializer>> {
        self.serializers
            .get(name)
            .cloned()
            .ok_or_else(|| RewindError::UnknownSerializer(name.to_string()))
    }

    /// Registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.serializers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for SerializerRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(JsonSerializer);
        registry.register(PrettyJsonSerializer);
        registry.register(BinarySerializer);
        registry
    }
}

impl fmt::Debug for SerializerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializerRegistry")
            .field("serializers", &self.names())
            .finish()
    }
}
