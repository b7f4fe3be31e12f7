mod support;

use atlas_core::{
    Atlas, Backend, Cartographer, CartographyError, Embeddings, Publication, PublicationField,
    Vectorizer, VectorizerError,
};
use std::sync::Arc;
use support::{publication, RecordingObserver, StubLibrarian, StubVectorizer};

fn cartographer(vectorizer: Arc<StubVectorizer>) -> Cartographer {
    Cartographer::new(Arc::new(StubLibrarian::new(Vec::new())), vectorizer)
}

fn undated(identifier: &str) -> Publication {
    Publication::builder(identifier)
        .abstract_text("no date")
        .build()
        .unwrap()
}

#[test]
fn filter_moves_incomplete_publications_to_bad_ids() {
    let vectorizer = Arc::new(StubVectorizer::new(2, &[]));
    let cartographer = cartographer(vectorizer);
    let atlas = Atlas::from_publications(vec![publication("A", &[], &[]), undated("B")])
        .with_bad_ids(["OLD"]);

    let filtered = cartographer.filter(
        atlas,
        &[PublicationField::Abstract, PublicationField::PublicationDate],
    );

    assert_eq!(filtered.identifiers().collect::<Vec<_>>(), vec!["A"]);
    assert!(filtered.is_bad("B"));
    assert!(filtered.is_bad("OLD"));
}

#[test]
fn filter_returns_input_unchanged_when_nothing_is_missing() {
    let cartographer = cartographer(Arc::new(StubVectorizer::new(2, &[])));
    let atlas = Atlas::from_publications(vec![publication("A", &[], &[])]);

    let filtered = cartographer.filter(atlas.clone(), &[PublicationField::Abstract]);

    assert_eq!(filtered, atlas);
}

#[test]
fn project_never_reembeds_known_publications() {
    let vectorizer = Arc::new(StubVectorizer::new(
        2,
        &[("A", vec![1.0, 0.0]), ("B", vec![0.0, 1.0]), ("C", vec![0.5, 0.5])],
    ));
    let cartographer = cartographer(vectorizer.clone());
    let atlas = Atlas::from_publications(vec![publication("A", &[], &[]), publication("B", &[], &[])]);

    let projected = cartographer.project(atlas).expect("first projection should succeed");
    assert_eq!(vectorizer.calls(), 1);
    assert_eq!(vectorizer.documents(), 2);

    let projected = cartographer
        .project(projected)
        .expect("second projection should succeed");
    assert_eq!(vectorizer.calls(), 1, "nothing new to embed");

    let mut publications: Vec<Publication> = projected.publications().cloned().collect();
    publications.push(publication("C", &[], &[]));
    let grown = Atlas::from_publications(publications)
        .with_projection(projected.projection().cloned());
    let projected = cartographer.project(grown).expect("third projection should succeed");

    assert_eq!(vectorizer.calls(), 2);
    assert_eq!(vectorizer.documents(), 3, "only C was embedded");
    let projection = projected.projection().expect("projection should exist");
    assert_eq!(projection.len(), 3);
    assert_eq!(projection.embedding_for("C").unwrap(), &[0.5, 0.5]);
    assert_eq!(projection.embedding_for("A").unwrap(), &[1.0, 0.0]);
}

#[test]
fn project_keeps_publications_and_projection_in_bijection() {
    let vectorizer = Arc::new(StubVectorizer::new(2, &[]));
    let observer = Arc::new(RecordingObserver::default());
    let cartographer = cartographer(vectorizer).with_observer(observer.clone());
    let atlas = Atlas::from_publications(vec![
        publication("A", &[], &[]),
        undated("B"),
        publication("C", &[], &[]),
    ]);

    let projected = cartographer.project(atlas).expect("projection should succeed");

    let projection = projected.projection().expect("projection should exist");
    let mut projected_ids = projection.identifiers().to_vec();
    projected_ids.sort();
    assert_eq!(projected_ids, vec!["A", "C"]);
    assert_eq!(projected.identifiers().collect::<Vec<_>>(), vec!["A", "C"]);
    assert!(projected.is_bad("B"));

    let reports = observer.projects.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].embedded, 2);
    assert_eq!(reports[0].dropped_unprojected, 0);
}

#[test]
fn project_of_empty_atlas_yields_empty_projection() {
    let vectorizer = Arc::new(StubVectorizer::new(2, &[]));
    let cartographer = cartographer(vectorizer.clone());

    let projected = cartographer
        .project(Atlas::new())
        .expect("empty projection should succeed");

    assert!(projected.projection().is_some_and(|projection| projection.is_empty()));
    assert_eq!(vectorizer.calls(), 0);
}

struct ShortVectorizer;

impl Backend for ShortVectorizer {
    fn backend_id(&self) -> &str {
        "short"
    }
}

impl Vectorizer for ShortVectorizer {
    fn embed(&self, _documents: &[&str]) -> Result<Embeddings, VectorizerError> {
        Ok(Embeddings::from_flat(2, vec![1.0, 0.0])?)
    }

    fn dimension(&self) -> usize {
        2
    }
}

#[test]
fn project_rejects_backend_returning_wrong_row_count() {
    let cartographer = Cartographer::new(
        Arc::new(StubLibrarian::new(Vec::new())),
        Arc::new(ShortVectorizer),
    );
    let atlas = Atlas::from_publications(vec![publication("A", &[], &[]), publication("B", &[], &[])]);

    let error = cartographer
        .project(atlas)
        .expect_err("row count mismatch must fail");

    assert!(matches!(
        error,
        CartographyError::VectorizerContract {
            expected: 2,
            actual: 1
        }
    ));
}
