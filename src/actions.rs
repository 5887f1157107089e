//! Follow-up actions: mocked email and callback logs shared across calls.
//!
//! Nothing is delivered anywhere: each action is appended to an in-memory log
//! and acknowledged with a receipt carrying a synthetic id and timestamp.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::directory::CallerRecord;
use crate::templates;

/// Recipient used when a target has no email on file.
pub const FALLBACK_EMAIL: &str = "contact@pharmacy.com";

/// Who a follow-up action is addressed to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpTarget {
    pub pharmacy_name: String,
    pub contact_person: String,
    pub email: Option<String>,
    pub phone: String,
    pub rx_volume: u32,
}

impl From<&CallerRecord> for FollowUpTarget {
    fn from(record: &CallerRecord) -> Self {
        Self {
            pharmacy_name: record.name.clone(),
            contact_person: record.contact_person.clone(),
            email: record.email.clone(),
            phone: record.phone.clone(),
            rx_volume: record.rx_volume,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRequest {
    pub to_email: String,
    pub subject: String,
    pub body: String,
    pub pharmacy_name: String,
    pub contact_person: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackRequest {
    pub phone_number: String,
    pub preferred_time: String,
    pub pharmacy_name: String,
    pub contact_person: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A logged email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentEmail {
    pub id: u64,
    #[serde(flatten)]
    pub request: EmailRequest,
    pub sent_at: DateTime<Utc>,
}

/// A logged callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledCallback {
    pub id: u64,
    #[serde(flatten)]
    pub request: CallbackRequest,
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailReceipt {
    pub email_id: u64,
    pub sent_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackReceipt {
    pub callback_id: u64,
    pub scheduled_at: DateTime<Utc>,
    pub message: String,
}

/// Append-only email and callback logs.
pub struct ActionDispatcher {
    emails: RwLock<Vec<SentEmail>>,
    callbacks: RwLock<Vec<ScheduledCallback>>,
}

impl ActionDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            emails: RwLock::new(Vec::new()),
            callbacks: RwLock::new(Vec::new()),
        })
    }

    /// Log an email. Always succeeds.
    pub async fn record_email(&self, request: EmailRequest) -> EmailReceipt {
        let mut emails = self.emails.write().await;
        let id = emails.len() as u64 + 1;
        let sent_at = Utc::now();

        info!(
            email_id = id,
            to = %request.to_email,
            pharmacy = %request.pharmacy_name,
            "Email sent"
        );

        let message = format!(
            "Email sent successfully to {} at {}",
            request.contact_person, request.pharmacy_name
        );
        emails.push(SentEmail {
            id,
            request,
            sent_at,
        });

        EmailReceipt {
            email_id: id,
            sent_at,
            message,
        }
    }

    /// Log a callback. Always succeeds.
    pub async fn record_callback(&self, request: CallbackRequest) -> CallbackReceipt {
        let mut callbacks = self.callbacks.write().await;
        let id = callbacks.len() as u64 + 1;
        let scheduled_at = Utc::now();

        info!(
            callback_id = id,
            contact = %request.contact_person,
            pharmacy = %request.pharmacy_name,
            time = %request.preferred_time,
            "Callback scheduled"
        );

        let message = format!(
            "Callback scheduled successfully for {} at {}",
            request.contact_person, request.preferred_time
        );
        callbacks.push(ScheduledCallback {
            id,
            request,
            scheduled_at,
        });

        CallbackReceipt {
            callback_id: id,
            scheduled_at,
            message,
        }
    }

    pub async fn send_welcome_email(&self, target: &FollowUpTarget) -> EmailReceipt {
        let (subject, body) = templates::welcome_email(target);
        self.record_email(email_request(target, subject, body)).await
    }

    pub async fn send_high_volume_offer(&self, target: &FollowUpTarget) -> EmailReceipt {
        let (subject, body) = templates::high_volume_offer_email(target);
        self.record_email(email_request(target, subject, body)).await
    }

    pub async fn schedule_consultation(
        &self,
        target: &FollowUpTarget,
        preferred_time: &str,
    ) -> CallbackReceipt {
        let request = CallbackRequest {
            phone_number: target.phone.clone(),
            preferred_time: preferred_time.to_string(),
            pharmacy_name: target.pharmacy_name.clone(),
            contact_person: target.contact_person.clone(),
            notes: Some(format!(
                "Consultation call for {} with Rx volume of {}",
                target.pharmacy_name, target.rx_volume
            )),
        };
        self.record_callback(request).await
    }

    pub async fn email_history(&self) -> Vec<SentEmail> {
        self.emails.read().await.clone()
    }

    pub async fn callback_history(&self) -> Vec<ScheduledCallback> {
        self.callbacks.read().await.clone()
    }

    pub async fn clear_history(&self) {
        self.emails.write().await.clear();
        self.callbacks.write().await.clear();
        info!("Follow-up action history cleared");
    }
}

fn email_request(target: &FollowUpTarget, subject: String, body: String) -> EmailRequest {
    EmailRequest {
        to_email: target
            .email
            .clone()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_EMAIL.to_string()),
        subject,
        body,
        pharmacy_name: target.pharmacy_name.clone(),
        contact_person: target.contact_person.clone(),
    }
}
