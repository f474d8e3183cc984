// Unit tests for the petname swipe engine

use petname_swipe::core::{
    catalog::{load_bundled_dataset, CatalogIndex},
    filters::{filter_names, set_ids_for, spec_from_facets},
    ledger::SwipeLedger,
};
use petname_swipe::models::{Facets, FilterSpec, Gender, GenderFilter, SwipeDecision};
use petname_swipe::services::store::{decode_exclusions, encode_exclusions};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

const DATASET: &str = "data/bundled_names.json";

fn load_catalog(seed: u64) -> CatalogIndex {
    let data = load_bundled_dataset(DATASET).unwrap();
    CatalogIndex::build_with_rng(&data.name_sets, &mut StdRng::seed_from_u64(seed))
}

#[test]
fn test_bundled_dataset_parses() {
    let data = load_bundled_dataset(DATASET).unwrap();
    assert_eq!(data.version, 1);
    assert_eq!(data.name_sets.len(), 10);
    assert!(data.name_sets.iter().all(|s| s.slug.starts_with("pets_")));
}

#[test]
fn test_catalog_names_are_unique() {
    let catalog = load_catalog(1);

    // 57 raw entries, three names repeated across sets
    assert_eq!(catalog.len(), 54);

    let keys: HashSet<String> = catalog.entries().iter().map(|e| e.key()).collect();
    assert_eq!(keys.len(), catalog.len());
}

#[test]
fn test_first_seen_set_wins() {
    let catalog = load_catalog(2);

    let max = catalog.entry("MAX").unwrap();
    assert_eq!(max.set_id, "pets_nl_strong");

    let storm = catalog.entry("storm").unwrap();
    assert_eq!(storm.set_id, "pets_nl_strong");
}

#[test]
fn test_missing_dataset_gives_empty_catalog() {
    let catalog = CatalogIndex::load("data/does_not_exist.json");
    assert!(catalog.is_empty());
}

#[test]
fn test_catalog_facet_codes() {
    let catalog = load_catalog(3);
    assert_eq!(catalog.languages(), vec!["de", "en", "es", "fr", "nl", "sv"]);
    assert!(catalog.styles().contains(&"petnicknames".to_string()));
    assert_eq!(catalog.set_metadata("pets_en_funny").unwrap().title, "Funny");
}

#[test]
fn test_filter_is_deterministic_for_same_index() {
    let catalog = load_catalog(4);
    let spec = FilterSpec::new().with_gender(GenderFilter::Only(Gender::Female));

    let first = filter_names(&catalog, &spec, 10);
    let second = filter_names(&catalog, &spec, 10);

    assert_eq!(first, second);
    assert!(first.iter().all(|e| e.gender == Gender::Female));
}

#[test]
fn test_filter_respects_every_facet() {
    let catalog = load_catalog(5);
    let facets = Facets {
        languages: vec!["nl".to_string(), "en".to_string()],
        styles: vec!["cute".to_string(), "classic".to_string()],
        starts_with: Some('m'),
        max_length: 4,
        ..Default::default()
    };

    let names: HashSet<String> = filter_names(&catalog, &spec_from_facets(&facets, &HashSet::new()), 100)
        .into_iter()
        .map(|e| e.name)
        .collect();

    // Max was deduplicated into nl_strong
    let expected: HashSet<String> = ["Muis", "Mila", "Milo", "Mira"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(names, expected);
}

#[test]
fn test_excluded_names_never_returned() {
    let catalog = load_catalog(6);
    let excluded: HashSet<String> = ["luna", "rex", "björn"].iter().map(|s| s.to_string()).collect();

    let result = filter_names(&catalog, &spec_from_facets(&Facets::default(), &excluded), 1000);

    assert_eq!(result.len(), catalog.len() - 3);
    assert!(result.iter().all(|e| !excluded.contains(&e.key())));
}

#[test]
fn test_unicode_max_length_counts_characters() {
    let catalog = load_catalog(7);
    let spec = FilterSpec::new().with_sets(["pets_sv_nature"]).with_max_length(4);

    let names: Vec<String> = filter_names(&catalog, &spec, 10).into_iter().map(|e| e.name).collect();
    assert!(names.contains(&"Älva".to_string()));
    assert!(!names.contains(&"Mossa".to_string()));
}

#[test]
fn test_set_ids_for_pairs() {
    let ids = set_ids_for(&["NL".to_string(), "en".to_string()], &["cute".to_string()]);
    assert_eq!(ids, vec!["pets_nl_cute", "pets_en_cute"]);
}

#[test]
fn test_ledger_single_undo() {
    let mut ledger = SwipeLedger::new();
    ledger.record_swipe("Luna", SwipeDecision::Like);
    ledger.record_swipe("Rex", SwipeDecision::Dismiss);

    let undone = ledger.undo().unwrap();
    assert_eq!(undone.name, "Rex");
    assert!(ledger.undo().is_none());

    assert!(ledger.is_excluded("LUNA"));
    assert!(!ledger.is_excluded("rex"));
}

#[test]
fn test_exclusions_survive_encoding() {
    let mut ledger = SwipeLedger::new();
    ledger.record_swipe("Luna", SwipeDecision::Like);
    ledger.record_swipe("Björn", SwipeDecision::Dismiss);

    let encoded = encode_exclusions(&ledger.exclusion_snapshot()).unwrap();
    let restored = SwipeLedger::from_exclusions(decode_exclusions(&encoded).unwrap());

    assert!(restored.is_excluded("luna"));
    assert!(restored.is_excluded("björn"));
    assert!(restored.undoable().is_none());
}
