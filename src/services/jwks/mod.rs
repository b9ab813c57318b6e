pub mod cache;
pub mod fetcher;
pub mod key_set;

pub use cache::KeySetCache;
pub use fetcher::{HttpKeySetFetcher, KeySetFetcher, StaticKeySetFetcher};
pub use key_set::{KeySet, KeySetError};
