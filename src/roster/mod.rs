//! Employee roster domain: records, search queries and storage.

mod model;
mod query;
mod store;

pub use model::{Employee, FilterMetadata, OrgConfig};
pub use query::{parse_org_id, SearchQuery, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use store::{InMemoryRosterStore, RosterSeed, RosterStore};
