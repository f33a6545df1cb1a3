//! Outbound chat notifications.
//!
//! The chat transport lives outside this crate; the league only talks to
//! it through [`Notifier`]. [`TracingNotifier`] logs deliveries and is what
//! the binary runs with. [`RecordingNotifier`] captures deliveries and can
//! be told to fail for chosen recipients.

use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::ParticipantId;

/// Destination of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    /// A participant's private chat.
    Participant(ParticipantId),
    /// A group chat.
    Group(String),
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Participant(id) => write!(f, "participant:{id}"),
            Self::Group(chat) => write!(f, "group:{chat}"),
        }
    }
}

/// Inline action attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    /// Text shown to the user.
    pub label: String,
    /// Action identifier the chat transport routes back.
    pub action: String,
}

impl Button {
    /// Creates a button.
    #[must_use]
    pub fn new(label: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: action.into(),
        }
    }
}

/// Delivery failure for a single recipient.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NotifyError {
    /// The recipient cannot be reached (blocked the bot, chat deleted).
    #[error("recipient {0} unreachable")]
    Unreachable(String),
    /// The transport failed.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Sends one message to one recipient.
#[async_trait]
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Delivers `message` with optional `buttons`.
    ///
    /// # Errors
    ///
    /// Returns a [`NotifyError`] when delivery fails. Callers log and skip;
    /// one failure never aborts a batch.
    async fn send(
        &self,
        recipient: &Recipient,
        message: &str,
        buttons: &[Button],
    ) -> Result<(), NotifyError>;
}

/// Notifier that writes every delivery to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(
        &self,
        recipient: &Recipient,
        message: &str,
        buttons: &[Button],
    ) -> Result<(), NotifyError> {
        tracing::info!(
            %recipient,
            buttons = buttons.len(),
            message,
            "notification delivered"
        );
        Ok(())
    }
}

/// A message captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Destination.
    pub recipient: Recipient,
    /// Message text.
    pub message: String,
    /// Attached buttons.
    pub buttons: Vec<Button>,
}

/// Notifier that records deliveries in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
    failing: Mutex<HashSet<Recipient>>,
}

impl RecordingNotifier {
    /// Creates a notifier that accepts every delivery.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every delivery to `recipient` fail until [`Self::recover`].
    pub fn fail_for(&self, recipient: Recipient) {
        self.failing
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(recipient);
    }

    /// Lets deliveries to `recipient` succeed again.
    pub fn recover(&self, recipient: &Recipient) {
        self.failing
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(recipient);
    }

    /// Successfully delivered messages, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Successful deliveries to `recipient`.
    #[must_use]
    pub fn sent_to(&self, recipient: &Recipient) -> Vec<SentMessage> {
        self.sent()
            .into_iter()
            .filter(|m| &m.recipient == recipient)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        recipient: &Recipient,
        message: &str,
        buttons: &[Button],
    ) -> Result<(), NotifyError> {
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(recipient);
        if failing {
            return Err(NotifyError::Unreachable(recipient.to_string()));
        }
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(SentMessage {
                recipient: recipient.clone(),
                message: message.to_string(),
                buttons: buttons.to_vec(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_notifier_captures_and_fails_on_demand() {
        let notifier = RecordingNotifier::new();
        let ana = Recipient::Participant(ParticipantId::new(1));
        let group = Recipient::Group("league".to_string());

        notifier.fail_for(ana.clone());
        assert!(notifier.send(&ana, "hi", &[]).await.is_err());
        assert!(notifier.send(&group, "hi", &[]).await.is_ok());
        assert!(notifier.sent_to(&ana).is_empty());
        assert_eq!(notifier.sent_to(&group).len(), 1);

        notifier.recover(&ana);
        assert!(notifier.send(&ana, "again", &[]).await.is_ok());
        assert_eq!(notifier.sent().len(), 2);
    }

    #[test]
    fn recipient_display() {
        assert_eq!(
            Recipient::Participant(ParticipantId::new(5)).to_string(),
            "participant:5"
        );
        assert_eq!(Recipient::Group("f1".to_string()).to_string(), "group:f1");
    }
}
