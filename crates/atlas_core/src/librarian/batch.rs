use super::catalog::DOI_PREFIX;
use super::{FetchOptions, FetchResult, Librarian, WorkerPool};
use crate::bibtex::BibEntry;
use crate::model::publication::Publication;
use crate::registry::Backend;
use log::{info, warn};
use std::collections::HashSet;
use std::time::Instant;

/// Raw per-chunk access to one bibliographic source.
///
/// Implementors only talk to the source; chunking, retry and parallel
/// conversion come from [`BatchLibrarian`].
pub trait SourceClient: Send + Sync {
    /// Source-native record shape.
    type Record: Send;

    fn source_id(&self) -> &str;

    /// Fetches one chunk of raw records.
    ///
    /// Pairs are keyed by the *requested* identifier; `None` marks an
    /// identifier the source does not know.
    fn fetch_chunk(&self, identifiers: &[String]) -> FetchResult<Vec<(String, Option<Self::Record>)>>;

    /// Converts one raw record into a publication.
    fn convert(&self, identifier: &str, record: Self::Record) -> FetchResult<Publication>;

    /// Maps a seed entry to an identifier: explicit `identifier` field first,
    /// then `DOI:<doi>`.
    fn bibtex_entry_to_identifier(&self, entry: &BibEntry) -> Option<String> {
        if let Some(identifier) = entry.field("identifier").map(str::trim) {
            if !identifier.is_empty() {
                return Some(identifier.to_string());
            }
        }
        entry
            .field("doi")
            .map(str::trim)
            .filter(|doi| !doi.is_empty())
            .map(|doi| format!("{DOI_PREFIX}{doi}"))
    }
}

/// [`Librarian`] built from any [`SourceClient`].
pub struct BatchLibrarian<C: SourceClient> {
    client: C,
    pool: WorkerPool,
}

impl<C: SourceClient> BatchLibrarian<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            pool: WorkerPool::sequential(),
        }
    }

    /// Replaces the conversion pool.
    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn fetch_chunk_into(
        &self,
        chunk_index: usize,
        chunk: &[String],
        options: &FetchOptions,
        out: &mut Vec<Option<Publication>>,
    ) {
        let label = format!("{}#{}", self.client.source_id(), chunk_index);
        let raw = match options
            .retry
            .run(&label, |_| self.client.fetch_chunk(chunk))
        {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    "event=fetch_chunk module=librarian status=warn source={} chunk={} size={} error={}",
                    self.client.source_id(),
                    chunk_index,
                    chunk.len(),
                    err
                );
                out.extend(chunk.iter().map(|_| None));
                return;
            }
        };

        let mut answered: HashSet<&str> = HashSet::with_capacity(chunk.len());
        let mut present = Vec::with_capacity(raw.len());
        for (identifier, record) in raw {
            if let Some(requested) = chunk.iter().find(|id| **id == identifier) {
                answered.insert(requested.as_str());
            }
            match record {
                Some(record) => present.push((identifier, record)),
                None => out.push(None),
            }
        }
        out.extend(
            chunk
                .iter()
                .filter(|id| !answered.contains(id.as_str()))
                .map(|_| None),
        );

        let converted = self
            .pool
            .map_keyed(present, |identifier, record| self.client.convert(identifier, record));
        for (identifier, result) in converted {
            match result {
                Ok(publication) => {
                    if let Some((count, listed)) = publication.citation_count_mismatch() {
                        warn!(
                            "event=citation_count_mismatch module=librarian status=warn identifier={} citation_count={} citations={}",
                            publication.identifier(),
                            count,
                            listed
                        );
                    }
                    out.push(Some(publication));
                }
                Err(err) => {
                    warn!(
                        "event=convert_record module=librarian status=warn source={} identifier={} error={}",
                        self.client.source_id(),
                        identifier,
                        err
                    );
                    out.push(None);
                }
            }
        }
    }
}

impl<C: SourceClient> Backend for BatchLibrarian<C> {
    fn backend_id(&self) -> &str {
        self.client.source_id()
    }
}

impl<C: SourceClient> Librarian for BatchLibrarian<C> {
    fn get_publications(
        &self,
        identifiers: &[String],
        options: &FetchOptions,
    ) -> Vec<Option<Publication>> {
        let started_at = Instant::now();
        let mut out = Vec::with_capacity(identifiers.len());
        for (chunk_index, chunk) in identifiers.chunks(options.call_size.max(1)).enumerate() {
            self.fetch_chunk_into(chunk_index, chunk, options, &mut out);
        }

        info!(
            "event=get_publications module=librarian status=ok source={} requested={} fetched={} duration_ms={}",
            self.client.source_id(),
            identifiers.len(),
            out.iter().filter(|entry| entry.is_some()).count(),
            started_at.elapsed().as_millis()
        );
        out
    }

    fn bibtex_entry_to_identifier(&self, entry: &BibEntry) -> Option<String> {
        self.client.bibtex_entry_to_identifier(entry)
    }
}
