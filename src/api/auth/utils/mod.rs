pub mod cache;
pub mod secrets;
pub use cache::{CacheManager, StoredCredential};
pub use secrets::ClientSecrets;
