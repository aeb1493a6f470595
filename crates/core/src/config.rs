//! Loading range, suite and capture documents from disk.
//!
//! Files ending in `.json` are parsed as JSON; `.yaml`/`.yml` (and anything
//! else) as YAML.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::providers::RangeSet;
use crate::scenario::{CaptureSet, ScenarioSuite};

/// Serialization format of a document, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// Parse `body` as a document of type `T`.
pub fn parse_document<T: DeserializeOwned>(body: &str, format: DocumentFormat) -> Result<T> {
    match format {
        DocumentFormat::Json => serde_json::from_str(body).context("Failed to parse JSON document"),
        DocumentFormat::Yaml => serde_yaml::from_str(body).context("Failed to parse YAML document"),
    }
}

pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_document(&body, DocumentFormat::from_path(path))
        .with_context(|| format!("Invalid document at {}", path.display()))
}

pub fn load_range_set(path: &Path) -> Result<RangeSet> {
    load_document(path)
}

pub fn load_suite(path: &Path) -> Result<ScenarioSuite> {
    load_document(path)
}

pub fn load_captures(path: &Path) -> Result<CaptureSet> {
    load_document(path)
}
