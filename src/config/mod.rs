pub mod sync;

pub use sync::{FeedSettings, SyncConfig};
