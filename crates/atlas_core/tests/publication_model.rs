use atlas_core::{Publication, PublicationField, PublicationValidationError};
use chrono::NaiveDate;
use serde_json::json;

#[test]
fn json_round_trip_preserves_extra_fields() {
    let text = r#"{
        "identifier": "2019ApJ...1A",
        "abstract": "Dust in the wind.",
        "publication_date": "2019-06-30",
        "citation_count": 2,
        "citations": ["c1", "c2"],
        "references": ["r1"],
        "title": "Winds",
        "bibstem": "ApJ",
        "keywords": ["dust", "winds"]
    }"#;

    let publication: Publication = serde_json::from_str(text).expect("record should parse");
    assert_eq!(publication.identifier(), "2019ApJ...1A");
    assert_eq!(
        publication.publication_date(),
        NaiveDate::from_ymd_opt(2019, 6, 30)
    );
    assert_eq!(publication.extra().get("bibstem"), Some(&json!("ApJ")));
    assert!(publication.citation_count_mismatch().is_none());

    let written = serde_json::to_value(&publication).expect("publication should serialize");
    assert_eq!(written["keywords"], json!(["dust", "winds"]));
    assert_eq!(written["publication_date"], json!("2019-06-30"));
    let reparsed: Publication = serde_json::from_value(written).expect("output should reparse");
    assert_eq!(reparsed, publication);
}

#[test]
fn edges_list_references_before_citations() {
    let publication = Publication::builder("P")
        .references(["r1", "r2"])
        .citations(["c1"])
        .build()
        .unwrap();

    assert_eq!(publication.edges().collect::<Vec<_>>(), vec!["r1", "r2", "c1"]);
}

#[test]
fn wrong_field_shapes_are_rejected() {
    let missing = serde_json::from_value::<Publication>(json!({"abstract": "x"}));
    assert!(missing.is_err());

    let record = json!({"identifier": "P", "citations": "c1"})
        .as_object()
        .cloned()
        .unwrap();
    let error = Publication::from_record(record).expect_err("citations must be a list");
    assert!(matches!(
        error,
        PublicationValidationError::InvalidFieldType {
            field: PublicationField::Citations,
            ..
        }
    ));

    let record = json!({"identifier": "P", "publication_date": "30/06/2019"})
        .as_object()
        .cloned()
        .unwrap();
    assert_eq!(
        Publication::from_record(record).expect_err("date must be ISO"),
        PublicationValidationError::InvalidDate("30/06/2019".to_string())
    );
}

#[test]
fn required_field_presence_follows_values() {
    let bare = Publication::builder("P").build().unwrap();
    let complete = Publication::builder("P")
        .abstract_text("text")
        .publication_date(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap())
        .build()
        .unwrap();

    assert!(!bare.has_field(PublicationField::Abstract));
    assert!(bare.has_field(PublicationField::Identifier));
    assert!(complete.has_field(PublicationField::Abstract));
    assert!(complete.has_field(PublicationField::PublicationDate));
}
