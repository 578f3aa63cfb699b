//! Layered configuration assembly
//!
//! A [`ConfigBuilder`] stacks parsed documents in increasing precedence;
//! [`Config`] resolves the merged result into a JSON tree.

use serde_json::Value;

use crate::error::HoconResult;
use crate::parser::Document;
use crate::path::ConfigPath;
use crate::resolve::Resolver;
use crate::tree::Tree;

#[derive(Debug, Clone)]
struct Layer {
    prefix: ConfigPath,
    document: Document,
}

/// Builder stacking configuration layers
///
/// # Examples
/// ```
/// use kilt_hocon::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .layer("defaults", "build { image: ${original.image} }")?
///     .layer("context", r#"original.image: "busybox""#)?
///     .build();
/// assert_eq!(config.get("build.image")?, Some(serde_json::json!("busybox")));
/// # Ok::<(), kilt_hocon::HoconError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    layers: Vec<Layer>,
}

impl ConfigBuilder {
    /// Create empty builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text` and stack it on top of the existing layers
    ///
    /// # Errors
    /// Returns [`HoconError::Syntax`](crate::HoconError::Syntax) if the text is malformed
    pub fn layer(self, source_name: &str, text: &str) -> HoconResult<Self> {
        let document = Document::parse(source_name, text)?;
        Ok(self.document(document))
    }

    /// Parse `text` and stack it under the `prefix` path
    ///
    /// # Errors
    /// Returns error if the text or the prefix is malformed
    pub fn layer_at(self, prefix: &str, source_name: &str, text: &str) -> HoconResult<Self> {
        let prefix = ConfigPath::parse(prefix)?;
        let document = Document::parse(source_name, text)?;
        Ok(self.document_at(prefix, document))
    }

    /// Stack an already parsed document
    #[inline]
    #[must_use]
    pub fn document(self, document: Document) -> Self {
        self.document_at(ConfigPath::root(), document)
    }

    /// Stack an already parsed document under `prefix`
    #[must_use]
    pub fn document_at(mut self, prefix: ConfigPath, document: Document) -> Self {
        self.layers.push(Layer { prefix, document });
        self
    }

    /// Number of stacked layers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Check if no layer was stacked
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Merge all layers, lowest precedence first
    #[must_use]
    pub fn build(self) -> Config {
        let mut tree = Tree::new(Some(ConfigPath::root()));
        for layer in self.layers {
            tracing::trace!(
                source = layer.document.source_name(),
                prefix = %layer.prefix,
                fields = layer.document.len(),
                "merging configuration layer"
            );
            tree.apply(&layer.prefix, layer.document.fields);
        }
        Config { tree }
    }
}

/// Merged configuration, resolved on demand
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    tree: Tree,
}

impl Config {
    /// Parse a single document into a configuration
    ///
    /// # Errors
    /// Returns error if the text is malformed
    pub fn parse(source_name: &str, text: &str) -> HoconResult<Self> {
        Ok(ConfigBuilder::new().layer(source_name, text)?.build())
    }

    /// Resolve every substitution and return the whole tree
    ///
    /// # Errors
    /// Returns error on unresolved hard substitutions, cycles or
    /// incompatible concatenations anywhere in the tree
    pub fn resolve(&self) -> HoconResult<Value> {
        Resolver::new(&self.tree.root).resolve_root()
    }

    /// Resolve the value at `path`
    ///
    /// Only substitutions reachable from `path` are resolved.
    ///
    /// # Errors
    /// Returns error if the path is malformed or resolution fails
    pub fn get(&self, path: &str) -> HoconResult<Option<Value>> {
        let path = ConfigPath::parse(path)?;
        Resolver::new(&self.tree.root).lookup(&path)
    }

    /// Check if a value exists at `path`
    ///
    /// # Errors
    /// Returns error if the path is malformed or resolution fails
    pub fn has_path(&self, path: &str) -> HoconResult<bool> {
        Ok(self.get(path)?.is_some())
    }
}
