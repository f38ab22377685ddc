//! The document map a generation run works on.
//!
//! A workspace is one root document plus any documents it references, keyed by
//! path-like document keys (`api.yaml`, `schemas/common.yaml`). Relative
//! references resolve against the referring document's directory.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::error::GenerationError;
use crate::spec::Document;

/// A set of linked OpenAPI documents.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: String,
    documents: IndexMap<String, Document>,
}

impl Workspace {
    /// Create a workspace holding only the root document.
    pub fn new(root: impl Into<String>, document: Document) -> Self {
        let root = root.into();
        let mut documents = IndexMap::new();
        documents.insert(root.clone(), document);
        Self { root, documents }
    }

    /// Add a linked document.
    pub fn insert(&mut self, key: impl Into<String>, document: Document) {
        self.documents.insert(key.into(), document);
    }

    /// Builder form of [`Workspace::insert`].
    pub fn with_document(mut self, key: impl Into<String>, document: Document) -> Self {
        self.insert(key, document);
        self
    }

    /// Build a workspace from already-parsed JSON values.
    pub fn from_values<K, I>(root: &str, values: I) -> Result<Self, GenerationError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut documents = IndexMap::new();
        for (key, value) in values {
            let key = key.into();
            let document = Document::from_value(value).map_err(|e| GenerationError::DocumentParse {
                document: key.clone(),
                message: e.to_string(),
            })?;
            documents.insert(key, document);
        }

        let Some(root_document) = documents.shift_remove(root) else {
            return Err(GenerationError::DocumentParse {
                document: root.to_string(),
                message: "root document is missing from the workspace".to_string(),
            });
        };

        let mut workspace = Workspace::new(root, root_document);
        for (key, document) in documents {
            workspace.insert(key, document);
        }
        debug!(
            root = %workspace.root,
            documents = workspace.documents.len(),
            "Workspace loaded."
        );
        Ok(workspace)
    }

    /// Build a workspace from JSON or YAML source strings.
    ///
    /// Sources whose first non-whitespace character is `{` are parsed as JSON,
    /// everything else as YAML.
    pub fn from_sources<K, S, I>(root: &str, sources: I) -> Result<Self, GenerationError>
    where
        K: Into<String>,
        S: AsRef<str>,
        I: IntoIterator<Item = (K, S)>,
    {
        let mut values = Vec::new();
        for (key, source) in sources {
            let key = key.into();
            let source = source.as_ref();
            let parsed = if source.trim_start().starts_with('{') {
                serde_json::from_str::<Value>(source).map_err(|e| e.to_string())
            } else {
                serde_yaml::from_str::<Value>(source).map_err(|e| e.to_string())
            };
            let value = parsed.map_err(|message| GenerationError::DocumentParse {
                document: key.clone(),
                message,
            })?;
            values.push((key, value));
        }
        Self::from_values(root, values)
    }

    /// Key of the root document.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn document(&self, key: &str) -> Option<&Document> {
        self.documents.get(key)
    }

    pub(crate) fn document_mut(&mut self, key: &str) -> Option<&mut Document> {
        self.documents.get_mut(key)
    }

    /// All documents, root first, then in insertion order.
    pub fn documents(&self) -> impl Iterator<Item = (&str, &Document)> {
        self.documents.iter().map(|(k, d)| (k.as_str(), d))
    }

    /// Document keys, root first, then in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.documents.keys().cloned().collect()
    }

    /// Resolve the document part of a reference relative to the referring document.
    ///
    /// An empty target refers to `from` itself. Returns `None` when no document
    /// with the resolved key exists.
    pub fn resolve_document_key(&self, from: &str, target: &str) -> Option<String> {
        if target.is_empty() {
            return self.documents.contains_key(from).then(|| from.to_string());
        }
        let joined = join_relative(from, target);
        if self.documents.contains_key(&joined) {
            return Some(joined);
        }
        let trimmed = target.trim_start_matches("./");
        self.documents
            .contains_key(trimmed)
            .then(|| trimmed.to_string())
    }
}

/// Join `target` onto the directory of `from`, folding `.` and `..` segments.
fn join_relative(from: &str, target: &str) -> String {
    let mut segments: Vec<&str> = if target.starts_with('/') {
        Vec::new()
    } else {
        let mut base: Vec<&str> = from.split('/').collect();
        base.pop();
        base
    };

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.retain(|s| !s.is_empty());
    segments.join("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_join_relative() {
        assert_eq!(join_relative("api.yaml", "./common.yaml"), "common.yaml");
        assert_eq!(
            join_relative("specs/pets/api.yaml", "../shared/pets.json"),
            "specs/shared/pets.json"
        );
        assert_eq!(join_relative("a/b.yaml", "c.yaml"), "a/c.yaml");
    }

    #[test]
    fn test_from_sources_json_and_yaml() {
        let workspace = Workspace::from_sources(
            "api.yaml",
            [
                (
                    "api.yaml",
                    "openapi: 3.0.3\ncomponents:\n  schemas:\n    Pet:\n      type: object\n",
                ),
                (
                    "schemas/common.json",
                    r##"{"components": {"schemas": {"Id": {"type": "string"}}}}"##,
                ),
            ],
        )
        .unwrap();

        assert_eq!(workspace.root(), "api.yaml");
        assert_eq!(workspace.keys(), vec!["api.yaml", "schemas/common.json"]);
        let root = workspace.document("api.yaml").unwrap();
        assert!(root.components.schemas.contains_key("Pet"));
        assert_eq!(
            workspace.resolve_document_key("api.yaml", "./schemas/common.json"),
            Some("schemas/common.json".to_string())
        );
        assert_eq!(
            workspace.resolve_document_key("schemas/common.json", "../api.yaml"),
            Some("api.yaml".to_string())
        );
        assert_eq!(workspace.resolve_document_key("api.yaml", "missing.yaml"), None);
    }

    #[test]
    fn test_from_sources_reports_parse_errors() {
        let err = Workspace::from_sources("api.json", [("api.json", "{ not json")]).unwrap_err();
        assert!(matches!(err, GenerationError::DocumentParse { document, .. } if document == "api.json"));
    }

    #[test]
    fn test_missing_root() {
        let err = Workspace::from_values("api.json", [("other.json", serde_json::json!({}))])
            .unwrap_err();
        assert!(matches!(err, GenerationError::DocumentParse { .. }));
    }
}
