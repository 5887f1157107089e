//! Per-call mutable state.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::extraction::find_email_address;
use super::fields::{CollectedInfo, FieldValue, LeadField};
use super::state::ConversationState;
use super::transcript::Transcript;
use crate::actions::{CallbackReceipt, EmailReceipt, FollowUpTarget};
use crate::directory::CallerRecord;
use crate::error::ConversationError;

/// Who the caller turned out to be.
///
/// A call is either a recognized account or a lead being collected, never
/// both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CallProfile {
    #[default]
    Unidentified,
    Existing(CallerRecord),
    Lead(CollectedInfo),
}

/// Everything the engine knows about the call in progress.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub call_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub phone: Option<String>,
    state: ConversationState,
    pub profile: CallProfile,
    /// Index into [`LeadField::ORDER`] of the field the manual tier asks for.
    pub cursor: usize,
    pub extraction_failures: u32,
    /// Cleared for the rest of the call by error recovery.
    pub ai_enabled: bool,
    pub transcript: Transcript,
    pub email_receipts: Vec<EmailReceipt>,
    pub callback_receipts: Vec<CallbackReceipt>,
    /// Address the caller mentioned while we were offering follow-up.
    pub captured_email: Option<String>,
    pub awaiting_email: bool,
}

impl CallContext {
    pub fn new(ai_enabled: bool) -> Self {
        Self {
            call_id: Uuid::new_v4(),
            started_at: Utc::now(),
            phone: None,
            state: ConversationState::Greeting,
            profile: CallProfile::Unidentified,
            cursor: 0,
            extraction_failures: 0,
            ai_enabled,
            transcript: Transcript::new(),
            email_receipts: Vec::new(),
            callback_receipts: Vec::new(),
            captured_email: None,
            awaiting_email: false,
        }
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    /// Move to `to` if the transition table allows it.
    pub fn transition(&mut self, to: ConversationState) -> Result<(), ConversationError> {
        if !self.state.can_transition_to(to) {
            return Err(ConversationError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        info!(call_id = %self.call_id, from = %self.state, to = %to, "State transition");
        self.state = to;
        Ok(())
    }

    pub fn caller(&self) -> Option<&CallerRecord> {
        match &self.profile {
            CallProfile::Existing(record) => Some(record),
            _ => None,
        }
    }

    pub fn collected_info(&self) -> Option<&CollectedInfo> {
        match &self.profile {
            CallProfile::Lead(info) => Some(info),
            _ => None,
        }
    }

    /// Begin collecting lead information from scratch.
    pub fn start_lead(&mut self) {
        self.profile = CallProfile::Lead(CollectedInfo::default());
        self.cursor = 0;
    }

    /// Store a lead field, turning the call into a lead if it was not one.
    pub fn set_lead_field(&mut self, field: LeadField, value: FieldValue) -> bool {
        if let CallProfile::Lead(info) = &mut self.profile {
            return info.set(field, value);
        }
        let mut info = CollectedInfo::default();
        let stored = info.set(field, value);
        self.profile = CallProfile::Lead(info);
        stored
    }

    /// First uncollected lead field, or `None` once collection is complete.
    pub fn next_missing_field(&self) -> Option<LeadField> {
        match &self.profile {
            CallProfile::Lead(info) => info.next_missing(),
            _ => LeadField::ORDER.first().copied(),
        }
    }

    pub fn lead_complete(&self) -> bool {
        self.next_missing_field().is_none()
    }

    /// Point the cursor at the first missing field.
    pub fn sync_cursor(&mut self) {
        self.cursor = self
            .next_missing_field()
            .map_or(LeadField::ORDER.len(), |f| f.index());
        debug!(call_id = %self.call_id, cursor = self.cursor, "Field cursor synced");
    }

    pub fn cursor_field(&self) -> Option<LeadField> {
        LeadField::ORDER.get(self.cursor).copied()
    }

    /// Volume known for the caller, from the directory or the lead.
    pub fn volume(&self) -> u32 {
        match &self.profile {
            CallProfile::Existing(record) => record.rx_volume,
            CallProfile::Lead(info) => info.volume(),
            CallProfile::Unidentified => 0,
        }
    }

    pub fn pharmacy_name(&self) -> String {
        self.collected_info()
            .and_then(|info| info.pharmacy_name.clone())
            .or_else(|| self.caller().map(|r| r.name.clone()))
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "your pharmacy".to_string())
    }

    /// Email on file: collected for a lead, or from the directory record.
    pub fn known_email(&self) -> Option<String> {
        self.collected_info()
            .and_then(|info| info.email.clone())
            .or_else(|| self.caller().and_then(|r| r.email.clone()))
            .filter(|e| !e.trim().is_empty())
    }

    /// Remember an address from `message` when none is on file yet.
    pub fn capture_email(&mut self, message: &str) -> Option<String> {
        if self.known_email().is_some() {
            return None;
        }
        let address = find_email_address(message)?;
        info!(call_id = %self.call_id, email = %address, "Captured email address from caller");
        self.captured_email = Some(address.clone());
        Some(address)
    }

    /// Where to send follow-up email, in order of preference.
    pub fn resolve_email(&self) -> Option<String> {
        self.known_email().or_else(|| self.captured_email.clone())
    }

    /// Recipient details for the dispatcher.
    pub fn follow_up_target(&self) -> FollowUpTarget {
        let mut target = match &self.profile {
            CallProfile::Existing(record) => FollowUpTarget::from(record),
            CallProfile::Lead(info) => FollowUpTarget {
                pharmacy_name: String::new(),
                contact_person: info.contact_person.clone().unwrap_or_default(),
                email: info.email.clone(),
                phone: String::new(),
                rx_volume: info.volume(),
            },
            CallProfile::Unidentified => FollowUpTarget::default(),
        };
        target.pharmacy_name = self.pharmacy_name();
        target.email = self.resolve_email();
        if target.phone.is_empty() {
            target.phone = self.phone.clone().unwrap_or_default();
        }
        target
    }
}
