use crate::core::catalog::CatalogIndex;
use crate::models::{Facets, FilterSpec, NameEntry};
use std::collections::HashSet;

/// Check a single entry against every facet of the spec
#[inline]
pub fn matches_spec(entry: &NameEntry, spec: &FilterSpec) -> bool {
    // Set facet (ids are stored lowercase)
    if !spec.enabled_set_ids.is_empty()
        && !spec.enabled_set_ids.contains(&entry.set_id.to_lowercase())
    {
        return false;
    }

    if !spec.gender.accepts(entry.gender) {
        return false;
    }

    let key = entry.key();

    if let Some(letter) = spec.starts_with {
        if !key.starts_with(letter) {
            return false;
        }
    }

    if spec.max_length > 0 && entry.name.chars().count() > spec.max_length {
        return false;
    }

    !spec.exclude_names.contains(&key)
}

/// Filter the catalog down to at most `limit` entries
///
/// Walks the index once in its cached order and emits passing entries until
/// `limit` is reached. No randomisation happens here: the same index, spec and
/// limit always produce the same output. An empty result means the stack is
/// exhausted.
pub fn filter_names(index: &CatalogIndex, spec: &FilterSpec, limit: usize) -> Vec<NameEntry> {
    let result: Vec<NameEntry> = index
        .entries()
        .iter()
        .filter(|entry| matches_spec(entry, spec))
        .take(limit)
        .cloned()
        .collect();

    tracing::debug!(
        "Filter matched {} of {} names (limit {}, {} excluded)",
        result.len(),
        index.len(),
        limit,
        spec.exclude_names.len()
    );

    result
}

/// Set ids for every language × style pair, e.g. `pets_en_cute`
pub fn set_ids_for(languages: &[String], styles: &[String]) -> Vec<String> {
    languages
        .iter()
        .flat_map(|lang| {
            styles
                .iter()
                .map(move |style| format!("pets_{}_{}", lang.to_lowercase(), style.to_lowercase()))
        })
        .collect()
}

/// Combine a facet selection with exclusion history into a filter spec
pub fn spec_from_facets(facets: &Facets, excluded: &HashSet<String>) -> FilterSpec {
    let mut set_ids = set_ids_for(&facets.languages, &facets.styles);
    set_ids.extend(facets.set_ids.iter().cloned());

    FilterSpec::new()
        .with_sets(set_ids)
        .with_gender(facets.gender)
        .with_starts_with(facets.starts_with)
        .with_max_length(facets.max_length)
        .excluding(excluded)
}
