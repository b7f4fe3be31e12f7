#![allow(dead_code)]

use atlas_core::observer::{ExpandReport, IterationReport, ProjectReport};
use atlas_core::{
    Backend, BibEntry, Embeddings, ExpansionObserver, FetchOptions, Librarian, Publication,
    Vectorizer, VectorizerError,
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Complete publication whose abstract is `abstract of <id>`.
pub fn publication(identifier: &str, references: &[&str], citations: &[&str]) -> Publication {
    Publication::builder(identifier)
        .abstract_text(abstract_of(identifier))
        .publication_date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
        .references(references.iter().copied())
        .citations(citations.iter().copied())
        .build()
        .unwrap()
}

pub fn abstract_of(identifier: &str) -> String {
    format!("abstract of {identifier}")
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Librarian over a fixed map that records every request.
pub struct StubLibrarian {
    catalog: BTreeMap<String, Publication>,
    requests: Mutex<Vec<Vec<String>>>,
}

impl StubLibrarian {
    pub fn new(publications: impl IntoIterator<Item = Publication>) -> Self {
        Self {
            catalog: publications
                .into_iter()
                .map(|publication| (publication.identifier().to_string(), publication))
                .collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requested_ids(&self) -> Vec<String> {
        let mut all: Vec<String> = self.requests().into_iter().flatten().collect();
        all.sort();
        all
    }
}

impl Backend for StubLibrarian {
    fn backend_id(&self) -> &str {
        "stub"
    }
}

impl Librarian for StubLibrarian {
    fn get_publications(
        &self,
        identifiers: &[String],
        _options: &FetchOptions,
    ) -> Vec<Option<Publication>> {
        self.requests.lock().unwrap().push(identifiers.to_vec());
        identifiers
            .iter()
            .map(|identifier| self.catalog.get(identifier).cloned())
            .collect()
    }

    fn bibtex_entry_to_identifier(&self, entry: &BibEntry) -> Option<String> {
        entry.field("identifier").map(str::to_string)
    }
}

/// Vectorizer returning fixed rows keyed by identifier, with call counters.
pub struct StubVectorizer {
    dim: usize,
    rows: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
    documents: AtomicUsize,
}

impl StubVectorizer {
    /// Rows are looked up through `abstract_of(identifier)`; unknown
    /// abstracts embed as a constant row.
    pub fn new(dim: usize, rows: &[(&str, Vec<f32>)]) -> Self {
        Self {
            dim,
            rows: rows
                .iter()
                .map(|(identifier, row)| (abstract_of(identifier), row.clone()))
                .collect(),
            calls: AtomicUsize::new(0),
            documents: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn documents(&self) -> usize {
        self.documents.load(Ordering::SeqCst)
    }
}

impl Backend for StubVectorizer {
    fn backend_id(&self) -> &str {
        "stub"
    }
}

impl Vectorizer for StubVectorizer {
    fn embed(&self, documents: &[&str]) -> Result<Embeddings, VectorizerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.documents.fetch_add(documents.len(), Ordering::SeqCst);
        let mut data = Vec::with_capacity(documents.len() * self.dim);
        for document in documents {
            match self.rows.get(*document) {
                Some(row) => data.extend_from_slice(row),
                None => data.extend(std::iter::repeat(1.0).take(self.dim)),
            }
        }
        Ok(Embeddings::from_flat(self.dim, data)?)
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    pub projects: Mutex<Vec<ProjectReport>>,
    pub expands: Mutex<Vec<ExpandReport>>,
    pub iterations: Mutex<Vec<IterationReport>>,
}

impl ExpansionObserver for RecordingObserver {
    fn on_project(&self, report: &ProjectReport) {
        self.projects.lock().unwrap().push(report.clone());
    }

    fn on_expand(&self, report: &ExpandReport) {
        self.expands.lock().unwrap().push(report.clone());
    }

    fn on_iteration(&self, report: &IterationReport) {
        self.iterations.lock().unwrap().push(report.clone());
    }
}
