use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

/// Shared outbound HTTP client. Every relay call goes through it, so the
/// timeouts below bound each provider round-trip.
static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(5))
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(concat!("instareply/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to create HTTP client")
});

/// Get the shared HTTP client.
pub fn client() -> &'static Client {
    &HTTP_CLIENT
}
