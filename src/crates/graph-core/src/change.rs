//! File-change values produced by pipeline nodes.
//!
//! A [`FileChange`] describes one mutation of the vault: creating, updating,
//! or deleting a file at a relative path. The variants encode the content
//! invariant directly: create and update carry content, delete does not.
//! Constructors validate the path, so a held `FileChange` is always
//! well-formed.

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// A single file operation accumulated during pipeline execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FileChange {
    /// Create a new file with the given content.
    Create { path: String, content: String },

    /// Replace the content of an existing file.
    Update { path: String, content: String },

    /// Remove a file. Carries no content by construction.
    Delete { path: String },
}

impl FileChange {
    /// Create a `Create` change, validating the path.
    pub fn create(path: impl Into<String>, content: impl Into<String>) -> Result<Self> {
        let path = path.into();
        validate_path(&path)?;
        Ok(Self::Create {
            path,
            content: content.into(),
        })
    }

    /// Create an `Update` change, validating the path.
    pub fn update(path: impl Into<String>, content: impl Into<String>) -> Result<Self> {
        let path = path.into();
        validate_path(&path)?;
        Ok(Self::Update {
            path,
            content: content.into(),
        })
    }

    /// Create a `Delete` change, validating the path.
    pub fn delete(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        validate_path(&path)?;
        Ok(Self::Delete { path })
    }

    /// The relative path this change applies to.
    pub fn path(&self) -> &str {
        match self {
            Self::Create { path, .. } | Self::Update { path, .. } | Self::Delete { path } => path,
        }
    }

    /// The content carried by this change, if any.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Create { content, .. } | Self::Update { content, .. } => Some(content),
            Self::Delete { .. } => None,
        }
    }

    /// Whether this change creates a new file.
    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create { .. })
    }
}

/// Validate that a change path is relative, forward-slash separated, and
/// cannot escape the vault root.
fn validate_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(GraphError::InvalidChange("path must not be empty".into()));
    }
    if path.starts_with('/') {
        return Err(GraphError::InvalidChange(format!(
            "path must be relative, got '{}'",
            path
        )));
    }
    if path.contains('\\') {
        return Err(GraphError::InvalidChange(format!(
            "path must use forward slashes, got '{}'",
            path
        )));
    }
    if path.split('/').any(|segment| segment == "..") {
        return Err(GraphError::InvalidChange(format!(
            "path must not contain '..' segments, got '{}'",
            path
        )));
    }
    if path.split('/').any(|segment| segment.is_empty()) {
        return Err(GraphError::InvalidChange(format!(
            "path must not contain empty segments, got '{}'",
            path
        )));
    }
    Ok(())
}
