//! Offline source backed by a JSON array of publication records.

use super::{FetchError, FetchErrorKind, FetchResult, SourceClient};
use crate::model::publication::{Publication, PublicationField, PublicationRecord};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Prefix marking a DOI lookup instead of a catalog identifier.
pub const DOI_PREFIX: &str = "DOI:";

const CATALOG_SOURCE_ID: &str = "catalog";

pub type CatalogRecord = PublicationRecord;

/// In-memory catalog with identifier and DOI indexes.
#[derive(Debug, Clone)]
pub struct CatalogSource {
    records: HashMap<String, CatalogRecord>,
    doi_index: HashMap<String, String>,
}

impl CatalogSource {
    /// Indexes `records`; later records shadow earlier ones with the same identifier.
    pub fn from_records(records: Vec<CatalogRecord>) -> FetchResult<Self> {
        let mut by_id = HashMap::with_capacity(records.len());
        let mut doi_index = HashMap::new();
        for record in records {
            let identifier = match record.get(PublicationField::Identifier.as_str()) {
                Some(Value::String(identifier)) if !identifier.trim().is_empty() => {
                    identifier.clone()
                }
                _ => {
                    return Err(FetchError::new(
                        FetchErrorKind::Malformed,
                        "catalog record has no string identifier",
                    ))
                }
            };
            if let Some(Value::String(doi)) = record.get(PublicationField::Doi.as_str()) {
                doi_index.insert(normalize_doi(doi), identifier.clone());
            }
            by_id.insert(identifier, record);
        }
        Ok(Self {
            records: by_id,
            doi_index,
        })
    }

    pub fn from_json_str(text: &str) -> FetchResult<Self> {
        let records: Vec<CatalogRecord> = serde_json::from_str(text)
            .map_err(|err| FetchError::new(FetchErrorKind::Malformed, err.to_string()))?;
        Self::from_records(records)
    }

    pub fn from_path(path: impl AsRef<Path>) -> FetchResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            FetchError::new(
                FetchErrorKind::Other,
                format!("failed to read catalog `{}`: {err}", path.display()),
            )
        })?;
        Self::from_json_str(&text)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn resolve(&self, identifier: &str) -> Option<&CatalogRecord> {
        match identifier.strip_prefix(DOI_PREFIX) {
            Some(doi) => self
                .doi_index
                .get(&normalize_doi(doi))
                .and_then(|identifier| self.records.get(identifier)),
            None => self.records.get(identifier),
        }
    }
}

impl SourceClient for CatalogSource {
    type Record = CatalogRecord;

    fn source_id(&self) -> &str {
        CATALOG_SOURCE_ID
    }

    fn fetch_chunk(&self, identifiers: &[String]) -> FetchResult<Vec<(String, Option<CatalogRecord>)>> {
        Ok(identifiers
            .iter()
            .map(|identifier| (identifier.clone(), self.resolve(identifier).cloned()))
            .collect())
    }

    fn convert(&self, _identifier: &str, record: CatalogRecord) -> FetchResult<Publication> {
        Publication::from_record(record)
            .map_err(|err| FetchError::new(FetchErrorKind::Malformed, err.to_string()))
    }
}

fn normalize_doi(doi: &str) -> String {
    doi.trim().to_ascii_lowercase()
}
