// Service exports
pub mod remote;
pub mod store;
pub mod supabase;

pub use remote::{RecordOutcome, RemoteError, RemoteSync};
pub use store::{ExclusionStore, MemoryExclusionStore, SqliteExclusionStore, StoreError};
pub use supabase::SupabaseClient;
