//! Post-commit outbound notifications.
//!
//! Dispatch is strictly best-effort and happens only after the transactional
//! core has committed; a delivery failure never unwinds ledger or match
//! state.

use crate::domain::{Amount, MatchId, MatchStatus, UserId};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Events published to the notification collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum NotifyEvent {
    MatchPaired {
        match_id: MatchId,
        stake_tier: Amount,
        player_ids: Vec<UserId>,
    },
    MatchResolved {
        match_id: MatchId,
        status: MatchStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        winner_id: Option<UserId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    PrizePaid {
        match_id: MatchId,
        winner_id: UserId,
        amount: Amount,
    },
}

/// Error type for notification dispatch.
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
}

/// Outbound notification seam.
///
/// Implementations must be safe to call with duplicate events; receivers are
/// expected to deduplicate on the event content.
#[async_trait]
pub trait Notifier: Send + Sync + fmt::Debug {
    async fn publish(&self, event: &NotifyEvent) -> Result<(), NotifyError>;
}

/// Webhook notifier posting events as JSON.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn publish(&self, event: &NotifyEvent) -> Result<(), NotifyError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(10)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .post(&self.url)
                .json(event)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(NotifyError::Network(e.to_string())))?;

            let status = response.status();
            if status == 429 || status.is_server_error() {
                return Err(backoff::Error::transient(NotifyError::Http {
                    status: status.as_u16(),
                    message: "Retryable error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(NotifyError::Http {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            Ok(())
        })
        .await
    }
}

/// No-op notifier used when no webhook is configured, and in tests.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn publish(&self, event: &NotifyEvent) -> Result<(), NotifyError> {
        debug!(?event, "notification suppressed (no webhook configured)");
        Ok(())
    }
}
