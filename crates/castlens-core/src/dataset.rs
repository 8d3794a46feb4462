//! Dataset loading.
//!
//! A dataset file is JSON: either a bare array of items, or an object whose
//! `items` (or `casts`) field holds that array.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ErrorCode;
use crate::model::ContentItem;

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("dataset not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read dataset {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse dataset {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl DatasetError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::DatasetNotFound,
            Self::Read { .. } | Self::Parse { .. } => ErrorCode::DatasetParseError,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DatasetFile {
    Bare(Vec<ContentItem>),
    Wrapped {
        #[serde(alias = "casts")]
        items: Vec<ContentItem>,
    },
}

/// Parse dataset JSON from a string.
///
/// # Errors
///
/// Fails when the text is neither an item array nor a wrapper object.
pub fn parse_dataset(raw: &str) -> Result<Vec<ContentItem>, serde_json::Error> {
    Ok(match serde_json::from_str::<DatasetFile>(raw)? {
        DatasetFile::Bare(items) | DatasetFile::Wrapped { items } => items,
    })
}

/// Read and parse the dataset at `path`.
///
/// # Errors
///
/// Fails if the file is missing, unreadable, or not dataset JSON.
pub fn load_dataset(path: &Path) -> Result<Vec<ContentItem>, DatasetError> {
    let raw = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            DatasetError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            DatasetError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let items = parse_dataset(&raw).map_err(|source| DatasetError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), items = items.len(), "loaded dataset");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_and_wrapped_shapes() {
        let bare = parse_dataset(r#"[{"id": "0x1", "text": "gm"}]"#).expect("bare");
        assert_eq!(bare.len(), 1);

        let items = parse_dataset(r#"{"items": [{"id": "0x1"}, {"id": "0x2"}]}"#).expect("items");
        assert_eq!(items.len(), 2);

        let casts = parse_dataset(r#"{"casts": [{"hash": "0x3", "text": "hi"}], "meta": 1}"#)
            .expect("casts");
        assert_eq!(casts[0].id.as_deref(), Some("0x3"));
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(parse_dataset("42").is_err());
        assert!(parse_dataset(r#"{"rows": []}"#).is_err());
        assert!(parse_dataset("[1, 2]").is_err());
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = load_dataset(&dir.path().join("nope.json")).expect_err("missing");
        assert_eq!(missing.code(), ErrorCode::DatasetNotFound);

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{not json").expect("write");
        let err = load_dataset(&bad).expect_err("malformed");
        assert_eq!(err.code(), ErrorCode::DatasetParseError);

        let good = dir.path().join("good.json");
        fs::write(&good, r#"[{"id": "a"}]"#).expect("write");
        assert_eq!(load_dataset(&good).expect("load").len(), 1);
    }
}
