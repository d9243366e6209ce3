use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{ProviderError, RelayError};
use crate::mailing::{KitClient, MailingList};

pub const SUCCESS_MESSAGE: &str = "Successfully subscribed!";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Basic `local@domain.tld` shape check.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscribeRequest {
    pub email: Option<String>,
}

impl SubscribeRequest {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub message: String,
}

/// How far the tagging steps got. Informational only; the response is the
/// same either way once the subscriber exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOutcome {
    Tagged,
    TagCreationFailed,
    NoTagId,
    TaggingFailed,
}

/// Adds an email to the waitlist: create subscriber, create-or-get tag,
/// tag subscriber.
pub struct SubscribeRelay {
    list: Option<Arc<dyn MailingList>>,
    tag_name: String,
}

impl SubscribeRelay {
    pub fn new(list: Option<Arc<dyn MailingList>>, tag_name: impl Into<String>) -> Self {
        Self {
            list,
            tag_name: tag_name.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let kit = &config.providers.kit;
        let list = config
            .kit_api_key()
            .map(|key| Arc::new(KitClient::new(key.to_string(), &kit.api_base)) as Arc<dyn MailingList>);
        Self::new(list, kit.tag_name.clone())
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub async fn handle(&self, req: SubscribeRequest) -> Result<SubscribeResponse, RelayError> {
        let email = match req.email {
            Some(e) if !e.is_empty() => e,
            _ => return Err(RelayError::Validation("Email is required".to_string())),
        };
        if !is_valid_email(&email) {
            return Err(RelayError::Validation("Invalid email address".to_string()));
        }

        let Some(list) = &self.list else {
            error!("Missing mailing-list API key");
            return Err(RelayError::Configuration(
                "Service configuration error".to_string(),
            ));
        };

        info!("Creating subscriber: {}", email);
        if let Err(e) = list.create_subscriber(&email).await {
            return Err(match e {
                ProviderError::Api { status, message } => {
                    error!("Mailing-list API error (subscriber {}): {}", status, message);
                    RelayError::Upstream {
                        status,
                        message: "Failed to subscribe. Please try again.".to_string(),
                    }
                }
                other => {
                    error!("Subscription error: {}", other);
                    RelayError::Internal("An unexpected error occurred".to_string())
                }
            });
        }

        let outcome = self.tag(list.as_ref(), &email).await;
        if outcome != TagOutcome::Tagged {
            warn!("Subscriber {} created but tagging failed ({:?})", email, outcome);
        }

        Ok(SubscribeResponse {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
        })
    }

    async fn tag(&self, list: &dyn MailingList, email: &str) -> TagOutcome {
        info!("Creating/getting tag: {}", self.tag_name);
        let tag_id = match list.create_tag(&self.tag_name).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                error!("No tag ID returned for tag {}", self.tag_name);
                return TagOutcome::NoTagId;
            }
            Err(e) => {
                error!("Mailing-list API error (tag): {}", e);
                return TagOutcome::TagCreationFailed;
            }
        };

        info!("Tagging subscriber with tag ID: {}", tag_id);
        match list.tag_subscriber(&tag_id, email).await {
            Ok(()) => TagOutcome::Tagged,
            Err(e) => {
                error!("Mailing-list API error (tag subscriber): {}", e);
                TagOutcome::TaggingFailed
            }
        }
    }
}
