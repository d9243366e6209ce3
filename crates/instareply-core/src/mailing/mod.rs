pub mod kit;

use async_trait::async_trait;

use crate::error::ProviderError;

pub use kit::KitClient;

/// Trait for mailing-list providers that manage subscribers and tags.
#[async_trait]
pub trait MailingList: Send + Sync {
    /// Create (or reactivate) an active subscriber.
    async fn create_subscriber(&self, email: &str) -> Result<(), ProviderError>;

    /// Create a tag, or fetch it when it already exists. Returns the tag id
    /// when the provider reports one.
    async fn create_tag(&self, name: &str) -> Result<Option<String>, ProviderError>;

    /// Attach a tag to the subscriber with `email`.
    async fn tag_subscriber(&self, tag_id: &str, email: &str) -> Result<(), ProviderError>;
}
