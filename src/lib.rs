//! Petname Swipe - household pet name discovery
//!
//! A swipe deck over a bundled catalog of pet names. Each household member
//! likes or dismisses names; when two members like the same name a match is
//! raised exactly once, even with undo racing the backend confirmation.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{filter_names, CatalogIndex, SwipeLedger, SwipeSession};
pub use models::{Facets, FilterSpec, MatchEvent, NameEntry, SessionIdentity, SwipeDecision};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let index = CatalogIndex::empty();
        assert!(filter_names(&index, &FilterSpec::new(), 10).is_empty());
        assert!(SessionIdentity::new("", "user").is_none());
    }
}
