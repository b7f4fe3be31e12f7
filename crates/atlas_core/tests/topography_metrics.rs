mod support;

use atlas_core::{
    Atlas, Cartographer, CartographyError, Embeddings, Projection, ProjectionError, Publication,
    TopographyMetric, TopographyOptions,
};
use chrono::NaiveDate;
use std::f64::consts::{FRAC_PI_4, PI};
use std::sync::Arc;
use support::{ids, StubLibrarian, StubVectorizer};

fn cartographer() -> Cartographer {
    Cartographer::new(
        Arc::new(StubLibrarian::new(Vec::new())),
        Arc::new(StubVectorizer::new(2, &[])),
    )
}

fn dated(identifier: &str, year: i32) -> Publication {
    Publication::builder(identifier)
        .abstract_text("text")
        .publication_date(NaiveDate::from_ymd_opt(year, 1, 1).unwrap())
        .build()
        .unwrap()
}

/// `d` is the newest; `u` has no date and never counts as prior.
fn landscape() -> Atlas {
    Atlas::from_publications(vec![
        dated("a", 2000),
        dated("b", 2001),
        dated("c", 2002),
        dated("d", 2010),
        Publication::builder("u").abstract_text("text").build().unwrap(),
    ])
    .with_projection(Some(
        Projection::new(
            ids(&["a", "b", "c", "d", "u"]),
            Embeddings::from_rows([[1.0_f32, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 1.0]])
                .unwrap(),
        )
        .unwrap(),
    ))
}

fn all_metrics(identifiers: Option<Vec<String>>) -> TopographyOptions {
    TopographyOptions {
        metrics: vec![
            TopographyMetric::SmoothingLength,
            TopographyMetric::Density,
            TopographyMetric::ConstantAsymmetry,
            TopographyMetric::KernelConstantAsymmetry,
        ],
        min_prior_pubs: 2,
        kernel_size: 2,
        identifiers,
    }
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-5,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn every_metric_matches_hand_computed_values() {
    let rows = cartographer()
        .measure_topography(&landscape(), &all_metrics(Some(ids(&["d", "u", "a"]))))
        .expect("measurement should succeed");

    assert_eq!(
        rows.iter().map(|row| row.identifier.as_str()).collect::<Vec<_>>(),
        vec!["d", "u", "a"]
    );

    // Kernel of d is {a, c}; the farthest member c sits at 45 degrees.
    let values = rows[0].values.as_ref().expect("d has three dated priors");
    assert_close(values[0], FRAC_PI_4);
    assert_close(values[1], 8.0 / PI);
    // Offsets to a, b, c: (0,0) + (1,-1) + (0,-1).
    assert_close(values[2], 5.0_f64.sqrt());
    // Offsets to a, c: (0,0) + (0,-1).
    assert_close(values[3], 1.0);

    assert!(rows[1].values.is_none(), "undated publications are not measured");
    assert!(rows[2].values.is_none(), "a has no prior publications");
}

#[test]
fn default_selection_measures_every_projected_publication() {
    let rows = cartographer()
        .measure_topography(&landscape(), &all_metrics(None))
        .unwrap();

    assert_eq!(rows.len(), 5);
    let measured: Vec<&str> = rows
        .iter()
        .filter(|row| row.values.is_some())
        .map(|row| row.identifier.as_str())
        .collect();
    assert_eq!(measured, vec!["c", "d"]);
}

#[test]
fn unprojected_identifier_is_reported() {
    let error = cartographer()
        .measure_topography(&landscape(), &all_metrics(Some(ids(&["missing"]))))
        .expect_err("unknown identifier must fail");

    assert!(matches!(
        error,
        CartographyError::Projection(ProjectionError::NotFound(id)) if id == "missing"
    ));
}

#[test]
fn unprojected_atlas_yields_no_rows() {
    let atlas = Atlas::from_publications(vec![dated("a", 2000)]);

    let rows = cartographer()
        .measure_topography(&atlas, &TopographyOptions::default())
        .unwrap();

    assert!(rows.is_empty());
}
