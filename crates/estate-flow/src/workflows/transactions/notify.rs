use serde::{Deserialize, Serialize};

/// Delivery channels understood by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Sms,
}

/// Message classes used for routing and templating downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Reservation,
    Sale,
    Offer,
    Allocation,
    PaymentPlan,
}

/// Outbound message handed to the dispatcher. Delivery is best-effort and
/// asynchronous from the engine's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub category: NotificationCategory,
    pub channels: Vec<NotificationChannel>,
}

impl NotificationMessage {
    /// Standard email+sms message addressed to a client.
    pub fn to_client(
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        category: NotificationCategory,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            category,
            channels: vec![NotificationChannel::Email, NotificationChannel::Sms],
        }
    }
}

/// Trait describing the outbound dispatcher seam.
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, message: NotificationMessage) -> Result<(), DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Publish without letting a delivery failure affect the surrounding state
/// transition. Failures are logged and swallowed.
pub(crate) fn fire_and_forget<N>(publisher: &N, message: NotificationMessage)
where
    N: NotificationPublisher + ?Sized,
{
    let category = message.category;
    if let Err(err) = publisher.publish(message) {
        tracing::warn!(error = %err, ?category, "notification dispatch failed");
    }
}
