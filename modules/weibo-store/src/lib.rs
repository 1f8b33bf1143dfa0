pub mod error;
pub mod images;
pub mod record;
pub mod store;

pub use error::{Result, StoreError};
pub use images::ImageDir;
pub use record::{PostRecord, RepostColumns, StoredPost};
pub use store::PostStore;
