//! Content catalog - tool descriptors from built-in content or a directory

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::descriptor::{DescriptorError, ToolDescriptor};

/// Built-in descriptors, embedded at compile time
const BUILTIN: &[(&str, &str)] = &[
    ("compress-image.json", include_str!("../content/tools/compress-image.json")),
    ("text-counter.json", include_str!("../content/tools/text-counter.json")),
    ("url-encoder.json", include_str!("../content/tools/url-encoder.json")),
];

/// Catalog errors
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("{path}: {source}")]
    Descriptor { path: String, source: DescriptorError },

    #[error("Failed to read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("Duplicate tool id '{0}'")]
    Duplicate(String),
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tools: Vec<ToolDescriptor>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in tools
    pub fn builtin() -> Result<Self, ContentError> {
        let mut catalog = Self::new();
        for (name, text) in BUILTIN {
            let descriptor = ToolDescriptor::from_json(text)
                .map_err(|source| ContentError::Descriptor { path: name.to_string(), source })?;
            catalog.insert(descriptor)?;
        }
        Ok(catalog)
    }

    /// Load every `*.json` descriptor in `dir`, sorted by file name
    pub async fn load_dir(dir: impl AsRef<Path>) -> Result<Self, ContentError> {
        let dir = dir.as_ref();
        let io_err = |source| ContentError::Io { path: dir.to_path_buf(), source };

        let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut catalog = Self::new();
        for path in paths {
            catalog.insert(load_file(&path).await?)?;
        }
        tracing::debug!(dir = %dir.display(), tools = catalog.len(), "Loaded content directory");
        Ok(catalog)
    }

    pub fn insert(&mut self, descriptor: ToolDescriptor) -> Result<(), ContentError> {
        if self.get(&descriptor.id).is_some() {
            return Err(ContentError::Duplicate(descriptor.id));
        }
        self.tools.push(descriptor);
        Ok(())
    }

    /// Add the tools of `other`; ids must stay unique
    pub fn merge(&mut self, other: Catalog) -> Result<(), ContentError> {
        let ids: HashSet<&str> = self.tools.iter().map(|t| t.id.as_str()).collect();
        if let Some(dup) = other.tools.iter().find(|t| ids.contains(t.id.as_str())) {
            return Err(ContentError::Duplicate(dup.id.clone()));
        }
        self.tools.extend(other.tools);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.id == id)
    }

    pub fn list(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Read and validate one descriptor file
pub async fn load_file(path: &Path) -> Result<ToolDescriptor, ContentError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ContentError::Io { path: path.to_path_buf(), source })?;
    ToolDescriptor::from_json(&text)
        .map_err(|source| ContentError::Descriptor { path: path.display().to_string(), source })
}
