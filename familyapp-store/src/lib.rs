//! familyapp-store: the row-store seam and its adapters.

pub mod error;
pub mod file;
pub mod memory;
pub mod query;
pub mod store;
pub mod table;

pub use error::StoreError;
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use query::{Filter, OrderBy, Query};
pub use store::{
    decode, encode, get_as, select_as, ChangeFeed, ChangeKind, RowChange, RowStore, Subscription,
};
pub use table::Table;
