// Core swipe engine exports
pub mod catalog;
pub mod filters;
pub mod ledger;
pub mod reconciler;
pub mod session;

pub use catalog::{load_bundled_dataset, CatalogError, CatalogIndex};
pub use filters::{filter_names, matches_spec, set_ids_for, spec_from_facets};
pub use ledger::SwipeLedger;
pub use reconciler::{confirm_like, MatchReconciler, MatchVerdict, ReconcilerStats};
pub use session::{SessionStats, SwipeSession};
