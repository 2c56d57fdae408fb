mod content;
mod schema;
mod sources;
mod types;

pub use schema::Database;
pub use types::{ContentRecord, FeedSource, InsertOutcome, NewContent, StoreError};
