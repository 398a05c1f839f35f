use std::fs;
use std::path::Path;
use tempfile::TempDir;

use rankfuse_core::config::{resolve_with_base, Settings};
use rankfuse_core::corpus::{load_corpus, load_golden_dataset, load_stopwords};
use rankfuse_core::Error;

#[test]
fn settings_defaults_without_files() {
    let tmp = TempDir::new().unwrap();
    let settings = Settings::load_from(tmp.path(), "test").expect("load defaults");
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.bm25.k1, 1.5);
    assert_eq!(settings.bm25.b, 0.75);
    assert_eq!(settings.fusion.rrf_k, 60.0);
    assert_eq!(settings.chunking.max_sentences, 4);
    assert_eq!(settings.chunking.overlap, 1);
}

#[test]
fn env_specific_file_overrides_base_file() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[fusion]\nalpha = 0.3\noverfetch = 10\n").unwrap();
    fs::write(tmp.path().join("config.test.toml"), "[fusion]\nalpha = 0.8\n").unwrap();

    let settings = Settings::load_from(tmp.path(), "test").expect("load layered");
    assert_eq!(settings.fusion.alpha, 0.8, "config.test.toml wins over config.toml");
    assert_eq!(settings.fusion.overfetch, 10, "untouched keys survive the merge");
    assert_eq!(settings.fusion.rrf_k, 60.0, "defaults fill the gaps");
}

#[test]
fn invalid_values_are_rejected_on_load() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[chunking]\nmax_sentences = 2\noverlap = 2\n").unwrap();
    let err = Settings::load_from(tmp.path(), "test").unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)), "got {err:?}");
}

#[test]
fn validate_rejects_alpha_out_of_range() {
    let mut settings = Settings::default();
    settings.fusion.alpha = 1.5;
    assert!(settings.validate().is_err());
    settings.fusion.alpha = 1.0;
    assert!(settings.validate().is_ok());
}

#[test]
fn paths_resolve_against_base() {
    let settings = Settings::default();
    let resolved = settings.paths.resolve(Path::new("/srv/app"));
    assert_eq!(resolved.cache_dir, Path::new("/srv/app/cache"));
    assert_eq!(resolve_with_base(Path::new("/srv/app"), "/abs/file.json"), Path::new("/abs/file.json"));
}

#[test]
fn load_corpus_reads_movies_key() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("movies.json");
    fs::write(
        &path,
        r#"{"movies": [
            {"id": 1, "title": "Paddington", "description": "A bear in London.", "year": 2014},
            {"id": 2, "title": "The Revenant", "description": "A bear attack."}
        ]}"#,
    )
    .unwrap();

    let corpus = load_corpus(&path).expect("corpus");
    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus.get(2).unwrap().title, "The Revenant");
}

#[test]
fn load_corpus_reports_missing_id() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("movies.json");
    fs::write(&path, r#"{"movies": [{"title": "No id", "description": "x"}]}"#).unwrap();
    assert!(matches!(load_corpus(&path), Err(Error::MissingIdentifier { position: 0 })));

    fs::write(&path, r#"{"movies": [{"id": 1, "title": "A"}, {"id": null, "title": "B"}]}"#).unwrap();
    assert!(matches!(load_corpus(&path), Err(Error::MissingIdentifier { position: 1 })));

    fs::write(&path, r#"{"movies": [{"id": 0, "title": "Zero"}]}"#).unwrap();
    assert!(matches!(load_corpus(&path), Err(Error::MissingIdentifier { position: 0 })));
}

#[test]
fn missing_files_are_not_found() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.json");
    match load_corpus(&missing) {
        Err(Error::NotFound(p)) => assert_eq!(p, missing),
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert!(matches!(load_stopwords(&missing), Err(Error::NotFound(_))));
}

#[test]
fn stopwords_are_trimmed_and_lowercased() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("stopwords.txt");
    fs::write(&path, "The\n  and \n\nof\n").unwrap();
    assert_eq!(load_stopwords(&path).unwrap(), vec!["the", "and", "of"]);
}

#[test]
fn golden_dataset_parses_test_cases() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("golden_dataset.json");
    fs::write(
        &path,
        r#"{"test_cases": [
            {"query": "bear in london", "relevant_docs": ["Paddington", "Paddington 2"]},
            {"query": "nothing relevant"}
        ]}"#,
    )
    .unwrap();
    let dataset = load_golden_dataset(&path).unwrap();
    assert_eq!(dataset.test_cases.len(), 2);
    assert_eq!(dataset.test_cases[0].relevant_docs, vec!["Paddington", "Paddington 2"]);
    assert!(dataset.test_cases[1].relevant_docs.is_empty());
}
