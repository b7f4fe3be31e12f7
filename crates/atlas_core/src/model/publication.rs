//! Publication domain model.
//!
//! # Responsibility
//! - Define the canonical record for one paper, independent of the source API.
//! - Validate recognized fields when a record is converted into a publication.
//! - Carry unrecognized fields through untouched.
//!
//! # Invariants
//! - `identifier` is non-empty after construction and never changes.
//! - `citations`/`references` are the edges used for traversal; a diverging
//!   `citation_count` is reported, never reconciled.
//! - Dates are stored as calendar dates and serialized as ISO `YYYY-MM-DD`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Field-name to value mapping used at the storage and source boundaries.
pub type PublicationRecord = Map<String, Value>;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Recognized (validated) publication fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PublicationField {
    Identifier,
    Abstract,
    PublicationDate,
    CitationCount,
    Citations,
    References,
    Doi,
    Url,
    Title,
    Issn,
}

const RECOGNIZED_FIELDS: &[PublicationField] = &[
    PublicationField::Identifier,
    PublicationField::Abstract,
    PublicationField::PublicationDate,
    PublicationField::CitationCount,
    PublicationField::Citations,
    PublicationField::References,
    PublicationField::Doi,
    PublicationField::Url,
    PublicationField::Title,
    PublicationField::Issn,
];

impl PublicationField {
    /// Stable record key for this field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::Abstract => "abstract",
            Self::PublicationDate => "publication_date",
            Self::CitationCount => "citation_count",
            Self::Citations => "citations",
            Self::References => "references",
            Self::Doi => "doi",
            Self::Url => "url",
            Self::Title => "title",
            Self::Issn => "issn",
        }
    }

    /// Parses a record key into a recognized field. Keys match exactly.
    pub fn parse(value: &str) -> Option<Self> {
        RECOGNIZED_FIELDS
            .iter()
            .copied()
            .find(|field| field.as_str() == value)
    }

    /// All recognized fields in record order.
    pub fn all() -> &'static [PublicationField] {
        RECOGNIZED_FIELDS
    }
}

impl Display for PublicationField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation failures raised while constructing a publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicationValidationError {
    MissingIdentifier,
    EmptyIdentifier,
    InvalidFieldType {
        field: PublicationField,
        expected: &'static str,
    },
    InvalidDate(String),
    ReservedExtraField(String),
}

impl Display for PublicationValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingIdentifier => write!(f, "publication record has no identifier"),
            Self::EmptyIdentifier => write!(f, "publication identifier must not be empty"),
            Self::InvalidFieldType { field, expected } => {
                write!(f, "publication field `{field}` must be {expected}")
            }
            Self::InvalidDate(value) => {
                write!(f, "publication_date `{value}` is not an ISO YYYY-MM-DD date")
            }
            Self::ReservedExtraField(key) => {
                write!(f, "extra field `{key}` collides with a recognized field")
            }
        }
    }
}

impl Error for PublicationValidationError {}

/// Canonical record for one scientific publication.
///
/// Fields are private: a publication is immutable once validated. Build one
/// with [`Publication::builder`] or [`Publication::from_record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PublicationRecord", into = "PublicationRecord")]
pub struct Publication {
    identifier: String,
    abstract_text: Option<String>,
    publication_date: Option<NaiveDate>,
    citation_count: Option<u64>,
    citations: Vec<String>,
    references: Vec<String>,
    doi: Option<String>,
    url: Option<String>,
    title: Option<String>,
    issn: Option<String>,
    extra: BTreeMap<String, Value>,
}

impl Publication {
    /// Starts a typed builder for a publication with the given identifier.
    pub fn builder(identifier: impl Into<String>) -> PublicationBuilder {
        PublicationBuilder::new(identifier)
    }

    /// Converts a field map into a validated publication.
    ///
    /// `null` on an optional field means absent. Keys that are not recognized
    /// fields are kept verbatim in [`Publication::extra`].
    ///
    /// # Errors
    /// - `MissingIdentifier` / `EmptyIdentifier` when no usable identifier exists.
    /// - `InvalidFieldType` / `InvalidDate` when a recognized field has the wrong shape.
    pub fn from_record(record: PublicationRecord) -> Result<Self, PublicationValidationError> {
        let mut record = record;

        let identifier = match record.remove(PublicationField::Identifier.as_str()) {
            None | Some(Value::Null) => return Err(PublicationValidationError::MissingIdentifier),
            Some(Value::String(value)) => value,
            Some(_) => {
                return Err(PublicationValidationError::InvalidFieldType {
                    field: PublicationField::Identifier,
                    expected: "a string",
                })
            }
        };

        let publication = Self {
            identifier,
            abstract_text: take_string(&mut record, PublicationField::Abstract)?,
            publication_date: take_date(&mut record)?,
            citation_count: take_count(&mut record)?,
            citations: take_string_list(&mut record, PublicationField::Citations)?,
            references: take_string_list(&mut record, PublicationField::References)?,
            doi: take_string(&mut record, PublicationField::Doi)?,
            url: take_string(&mut record, PublicationField::Url)?,
            title: take_string(&mut record, PublicationField::Title)?,
            issn: take_string(&mut record, PublicationField::Issn)?,
            extra: record.into_iter().collect(),
        };
        publication.validate()?;
        Ok(publication)
    }

    /// Converts this publication back into a field map.
    ///
    /// Absent optional fields are omitted; edge lists are always written.
    pub fn to_record(&self) -> PublicationRecord {
        let mut record: PublicationRecord = self
            .extra
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        record.insert(
            PublicationField::Identifier.as_str().to_string(),
            Value::String(self.identifier.clone()),
        );
        put_string(&mut record, PublicationField::Abstract, &self.abstract_text);
        if let Some(date) = self.publication_date {
            record.insert(
                PublicationField::PublicationDate.as_str().to_string(),
                Value::String(date.format(DATE_FORMAT).to_string()),
            );
        }
        if let Some(count) = self.citation_count {
            record.insert(
                PublicationField::CitationCount.as_str().to_string(),
                Value::from(count),
            );
        }
        put_string_list(&mut record, PublicationField::Citations, &self.citations);
        put_string_list(&mut record, PublicationField::References, &self.references);
        put_string(&mut record, PublicationField::Doi, &self.doi);
        put_string(&mut record, PublicationField::Url, &self.url);
        put_string(&mut record, PublicationField::Title, &self.title);
        put_string(&mut record, PublicationField::Issn, &self.issn);
        record
    }

    fn validate(&self) -> Result<(), PublicationValidationError> {
        if self.identifier.trim().is_empty() {
            return Err(PublicationValidationError::EmptyIdentifier);
        }
        if let Some(key) = self
            .extra
            .keys()
            .find(|key| PublicationField::parse(key).is_some())
        {
            return Err(PublicationValidationError::ReservedExtraField(key.clone()));
        }
        Ok(())
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn abstract_text(&self) -> Option<&str> {
        self.abstract_text.as_deref()
    }

    pub fn publication_date(&self) -> Option<NaiveDate> {
        self.publication_date
    }

    pub fn citation_count(&self) -> Option<u64> {
        self.citation_count
    }

    pub fn citations(&self) -> &[String] {
        &self.citations
    }

    pub fn references(&self) -> &[String] {
        &self.references
    }

    pub fn doi(&self) -> Option<&str> {
        self.doi.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn issn(&self) -> Option<&str> {
        self.issn.as_deref()
    }

    /// Pass-through attributes that are not part of the validated schema.
    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }

    /// Outgoing graph edges: references first, then citations.
    pub fn edges(&self) -> impl Iterator<Item = &str> {
        self.references
            .iter()
            .chain(self.citations.iter())
            .map(String::as_str)
    }

    /// Returns whether a recognized field carries a value.
    ///
    /// Edge lists count as present only when non-empty.
    pub fn has_field(&self, field: PublicationField) -> bool {
        match field {
            PublicationField::Identifier => true,
            PublicationField::Abstract => self.abstract_text.is_some(),
            PublicationField::PublicationDate => self.publication_date.is_some(),
            PublicationField::CitationCount => self.citation_count.is_some(),
            PublicationField::Citations => !self.citations.is_empty(),
            PublicationField::References => !self.references.is_empty(),
            PublicationField::Doi => self.doi.is_some(),
            PublicationField::Url => self.url.is_some(),
            PublicationField::Title => self.title.is_some(),
            PublicationField::Issn => self.issn.is_some(),
        }
    }

    /// Returns `(citation_count, citations.len())` when both are known and disagree.
    pub fn citation_count_mismatch(&self) -> Option<(u64, usize)> {
        let count = self.citation_count?;
        let listed = self.citations.len();
        if usize::try_from(count).map_or(true, |count| count != listed) {
            Some((count, listed))
        } else {
            None
        }
    }
}

impl PartialOrd for Publication {
    /// Orders by identifier; distinct publications sharing an identifier are unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.identifier.cmp(&other.identifier) {
            Ordering::Equal if self != other => None,
            ordering => Some(ordering),
        }
    }
}

impl TryFrom<PublicationRecord> for Publication {
    type Error = PublicationValidationError;

    fn try_from(value: PublicationRecord) -> Result<Self, Self::Error> {
        Self::from_record(value)
    }
}

impl From<Publication> for PublicationRecord {
    fn from(value: Publication) -> Self {
        value.to_record()
    }
}

/// Typed builder for [`Publication`].
#[derive(Debug, Clone)]
pub struct PublicationBuilder {
    inner: Publication,
}

impl PublicationBuilder {
    fn new(identifier: impl Into<String>) -> Self {
        Self {
            inner: Publication {
                identifier: identifier.into(),
                abstract_text: None,
                publication_date: None,
                citation_count: None,
                citations: Vec::new(),
                references: Vec::new(),
                doi: None,
                url: None,
                title: None,
                issn: None,
                extra: BTreeMap::new(),
            },
        }
    }

    pub fn abstract_text(mut self, value: impl Into<String>) -> Self {
        self.inner.abstract_text = Some(value.into());
        self
    }

    pub fn publication_date(mut self, value: NaiveDate) -> Self {
        self.inner.publication_date = Some(value);
        self
    }

    pub fn citation_count(mut self, value: u64) -> Self {
        self.inner.citation_count = Some(value);
        self
    }

    pub fn citations<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.citations = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn references<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.references = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn doi(mut self, value: impl Into<String>) -> Self {
        self.inner.doi = Some(value.into());
        self
    }

    pub fn url(mut self, value: impl Into<String>) -> Self {
        self.inner.url = Some(value.into());
        self
    }

    pub fn title(mut self, value: impl Into<String>) -> Self {
        self.inner.title = Some(value.into());
        self
    }

    pub fn issn(mut self, value: impl Into<String>) -> Self {
        self.inner.issn = Some(value.into());
        self
    }

    /// Adds one unvalidated pass-through attribute.
    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.inner.extra.insert(key.into(), value);
        self
    }

    /// Validates and returns the publication.
    pub fn build(self) -> Result<Publication, PublicationValidationError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

fn take_string(
    record: &mut PublicationRecord,
    field: PublicationField,
) -> Result<Option<String>, PublicationValidationError> {
    match record.remove(field.as_str()) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(_) => Err(PublicationValidationError::InvalidFieldType {
            field,
            expected: "a string",
        }),
    }
}

fn take_date(
    record: &mut PublicationRecord,
) -> Result<Option<NaiveDate>, PublicationValidationError> {
    match take_string(record, PublicationField::PublicationDate) {
        Ok(Some(raw)) => NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
            .map(Some)
            .map_err(|_| PublicationValidationError::InvalidDate(raw)),
        Ok(None) => Ok(None),
        Err(_) => Err(PublicationValidationError::InvalidFieldType {
            field: PublicationField::PublicationDate,
            expected: "an ISO date string",
        }),
    }
}

fn take_count(record: &mut PublicationRecord) -> Result<Option<u64>, PublicationValidationError> {
    match record.remove(PublicationField::CitationCount.as_str()) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number.as_u64().map(Some).ok_or(
            PublicationValidationError::InvalidFieldType {
                field: PublicationField::CitationCount,
                expected: "a non-negative integer",
            },
        ),
        Some(_) => Err(PublicationValidationError::InvalidFieldType {
            field: PublicationField::CitationCount,
            expected: "a non-negative integer",
        }),
    }
}

fn take_string_list(
    record: &mut PublicationRecord,
    field: PublicationField,
) -> Result<Vec<String>, PublicationValidationError> {
    let invalid = PublicationValidationError::InvalidFieldType {
        field,
        expected: "a list of strings",
    };
    match record.remove(field.as_str()) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(value) => Ok(value),
                _ => Err(invalid.clone()),
            })
            .collect(),
        Some(_) => Err(invalid),
    }
}

fn put_string(record: &mut PublicationRecord, field: PublicationField, value: &Option<String>) {
    if let Some(value) = value {
        record.insert(field.as_str().to_string(), Value::String(value.clone()));
    }
}

fn put_string_list(record: &mut PublicationRecord, field: PublicationField, values: &[String]) {
    record.insert(
        field.as_str().to_string(),
        Value::Array(values.iter().cloned().map(Value::String).collect()),
    );
}
