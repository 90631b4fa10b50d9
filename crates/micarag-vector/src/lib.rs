//! LanceDB-backed chunk index: cosine search for the query path and
//! idempotent upserts for the indexer.

pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use search::LanceIndex;
pub use writer::LanceWriter;
