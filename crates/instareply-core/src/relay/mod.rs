//! Boundary handlers that reshape a request and forward it to a third-party
//! provider.

pub mod chat;
pub mod subscribe;

pub use chat::{ChatRelay, ChatRequest, ChatResponse, ProfileSnapshot};
pub use subscribe::{SubscribeRelay, SubscribeRequest, SubscribeResponse};
