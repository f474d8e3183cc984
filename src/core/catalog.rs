use crate::models::{BundledNameSet, BundledNamesData, Gender, NameEntry, NameSet};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading the bundled dataset
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse dataset: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read and parse the bundled dataset from disk
pub fn load_bundled_dataset<P: AsRef<Path>>(path: P) -> Result<BundledNamesData, CatalogError> {
    let raw = std::fs::read_to_string(path.as_ref())?;
    let data: BundledNamesData = serde_json::from_str(&raw)?;
    Ok(data)
}

/// In-memory index over the bundled candidate names
///
/// Built once, then shared read-only. Entries are unique by lowercase name and
/// kept in a single shuffled order that every query preserves.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    entries: Vec<NameEntry>,
    by_key: HashMap<String, usize>,
    sets: Vec<NameSet>,
    set_positions: HashMap<String, usize>,
}

impl CatalogIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the index, shuffling with the thread-local RNG
    pub fn build(sets: &[BundledNameSet]) -> Self {
        Self::build_with_rng(sets, &mut rand::thread_rng())
    }

    /// Build the index with a caller-supplied RNG
    ///
    /// Dedup is first-seen-wins in input order, so the surviving entry for a
    /// name does not depend on the RNG.
    pub fn build_with_rng<R: Rng + ?Sized>(sets: &[BundledNameSet], rng: &mut R) -> Self {
        let mut entries = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut metadata = Vec::new();
        let mut set_positions = HashMap::new();
        let mut remapped = 0usize;

        for set in sets {
            if !set_positions.contains_key(&set.slug) {
                set_positions.insert(set.slug.clone(), metadata.len());
                metadata.push(NameSet {
                    id: set.slug.clone(),
                    title: set.title.clone(),
                    language: set.language.clone(),
                    style: set.style.clone(),
                    description: set.description.clone(),
                });
            }

            for raw in &set.names {
                let gender = match raw.gender.parse() {
                    Ok(g) => g,
                    Err(e) => {
                        tracing::warn!("Treating {:?} in set {} as neutral: {}", raw.name, set.slug, e);
                        remapped += 1;
                        Gender::Neutral
                    }
                };

                let key = raw.name.to_lowercase();
                if !seen.insert(key) {
                    continue;
                }

                entries.push(NameEntry {
                    name: raw.name.clone(),
                    gender,
                    set_id: set.slug.clone(),
                    set_title: set.title.clone(),
                    language: set.language.clone(),
                    style: set.style.clone(),
                });
            }
        }

        entries.shuffle(rng);

        let by_key = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.key(), i))
            .collect();

        tracing::info!(
            "Indexed {} unique names from {} sets ({} with unknown gender)",
            entries.len(),
            metadata.len(),
            remapped
        );

        Self {
            entries,
            by_key,
            sets: metadata,
            set_positions,
        }
    }

    /// Load the bundled dataset and build from it
    ///
    /// A missing or malformed dataset yields an empty index rather than an
    /// error: callers see "no candidates".
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        match load_bundled_dataset(path.as_ref()) {
            Ok(data) => {
                tracing::info!(
                    "Loaded bundled dataset v{} with {} sets",
                    data.version,
                    data.name_sets.len()
                );
                Self::build(&data.name_sets)
            }
            Err(e) => {
                tracing::error!(
                    "Failed to load bundled dataset from {}: {}",
                    path.as_ref().display(),
                    e
                );
                Self::empty()
            }
        }
    }

    /// Entries in cached presentation order
    pub fn entries(&self) -> &[NameEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive lookup by name
    pub fn entry(&self, name: &str) -> Option<&NameEntry> {
        self.by_key
            .get(&name.to_lowercase())
            .map(|&i| &self.entries[i])
    }

    pub fn set_metadata(&self, set_id: &str) -> Option<&NameSet> {
        self.set_positions.get(set_id).map(|&i| &self.sets[i])
    }

    /// All sets, in dataset order
    pub fn all_set_metadata(&self) -> &[NameSet] {
        &self.sets
    }

    /// Distinct language codes across all sets
    pub fn languages(&self) -> Vec<String> {
        self.sets
            .iter()
            .map(|s| s.language.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct style codes across all sets
    pub fn styles(&self) -> Vec<String> {
        self.sets
            .iter()
            .map(|s| s.style.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BundledName;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;

    fn name(name: &str, gender: &str) -> BundledName {
        BundledName {
            name: name.to_string(),
            gender: gender.to_string(),
        }
    }

    fn set(slug: &str, names: Vec<BundledName>) -> BundledNameSet {
        BundledNameSet {
            slug: slug.to_string(),
            title: format!("Title {}", slug),
            description: None,
            language: slug.split('_').nth(1).unwrap_or("en").to_string(),
            style: slug.split('_').nth(2).unwrap_or("cute").to_string(),
            names,
        }
    }

    #[test]
    fn test_first_seen_wins() {
        let sets = vec![
            set("pets_en_cute", vec![name("Mila", "female")]),
            set("pets_nl_cute", vec![name("mila", "female")]),
        ];

        let index = CatalogIndex::build_with_rng(&sets, &mut StdRng::seed_from_u64(7));

        assert_eq!(index.len(), 1);
        assert_eq!(index.entries()[0].name, "Mila");
        assert_eq!(index.entries()[0].set_id, "pets_en_cute");
    }

    #[test]
    fn test_metadata_recorded_even_for_fully_duplicate_sets() {
        let sets = vec![
            set("pets_en_cute", vec![name("Luna", "female")]),
            set("pets_nl_cute", vec![name("LUNA", "female")]),
        ];

        let index = CatalogIndex::build(&sets);

        assert_eq!(index.all_set_metadata().len(), 2);
        assert_eq!(index.set_metadata("pets_nl_cute").unwrap().language, "nl");
        assert!(index.set_metadata("pets_fr_cute").is_none());
    }

    #[test]
    fn test_unknown_gender_becomes_neutral() {
        let sets = vec![set(
            "pets_en_cute",
            vec![name("Rex", "male"), name("Blob", "alien")],
        )];

        let index = CatalogIndex::build(&sets);

        assert_eq!(index.len(), 2);
        assert_eq!(index.entry("rex").unwrap().gender, Gender::Male);
        assert_eq!(index.entry("blob").unwrap().gender, Gender::Neutral);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let sets = vec![set("pets_en_cute", vec![name("Biscuit", "neutral")])];
        let index = CatalogIndex::build(&sets);

        assert!(index.entry("BISCUIT").is_some());
        assert!(index.entry("Biscuits").is_none());
    }

    #[test]
    fn test_same_seed_same_order() {
        let names: Vec<BundledName> = (0..50).map(|i| name(&format!("Pet{}", i), "neutral")).collect();
        let sets = vec![set("pets_en_cute", names)];

        let a = CatalogIndex::build_with_rng(&sets, &mut StdRng::seed_from_u64(42));
        let b = CatalogIndex::build_with_rng(&sets, &mut StdRng::seed_from_u64(42));

        assert_eq!(a.entries(), b.entries());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let index = CatalogIndex::load("/definitely/not/here.json");
        assert!(index.is_empty());
    }

    #[test]
    fn test_load_malformed_file_is_empty() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let index = CatalogIndex::load(file.path());
        assert!(index.is_empty());
        assert!(index.all_set_metadata().is_empty());
    }

    #[test]
    fn test_facet_codes_are_distinct_and_sorted() {
        let sets = vec![
            set("pets_nl_cute", vec![]),
            set("pets_en_strong", vec![]),
            set("pets_en_cute", vec![]),
        ];
        let index = CatalogIndex::build(&sets);

        assert_eq!(index.languages(), vec!["en", "nl"]);
        assert_eq!(index.styles(), vec!["cute", "strong"]);
    }
}
