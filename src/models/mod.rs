// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BundledName, BundledNameSet, BundledNamesData, FacetParseError, Facets, FilterSpec, Gender,
    GenderFilter, LikedName, LocalSwipeRecord, MatchEvent, MatchRow, NameEntry, NameSet,
    SessionIdentity, SwipeCounts, SwipeDecision, SwipeTicket,
};
pub use requests::{FiltersRequest, StackQuery};
pub use responses::{
    ErrorResponse, HealthResponse, LikesResponse, MatchesResponse, PendingMatchesResponse,
    SetsResponse, StackResponse, StackUpdateResponse, SwipeResponse, UndoResponse,
};
