//! Conversation engine. Drives one call from greeting to close.
//!
//! The engine owns a [`CallContext`] and routes every caller message to the
//! handler for the current [`ConversationState`]. Every path produces a reply
//! string; directory and model failures are absorbed here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::context::{CallContext, CallProfile};
use super::extraction::{AiExtractor, Extraction, FieldExtractor, ManualExtractor};
use super::fields::{CollectedInfo, LeadField};
use super::state::ConversationState;
use super::transcript::Transcript;
use crate::actions::{ActionDispatcher, CallbackReceipt, EmailReceipt};
use crate::config::AgentConfig;
use crate::directory::{CallerDirectory, CallerRecord};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::templates;

const INTEREST_KEYWORDS: &[&str] = &["yes", "interested", "more", "information", "details"];

const CALLBACK_KEYWORDS: &[&str] = &["call", "consultation"];

const TIME_KEYWORDS: &[&str] = &[
    "tomorrow",
    "next week",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "morning",
    "afternoon",
    "evening",
];

const FAREWELL_KEYWORDS: &[&str] = &["no", "nothing", "goodbye", "bye", "thanks"];

/// Serializable snapshot of a call.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub call_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub phone: Option<String>,
    pub state: ConversationState,
    pub caller: Option<CallerRecord>,
    pub collected_info: Option<CollectedInfo>,
    pub transcript_length: usize,
    pub ai_available: bool,
    pub extraction_failures: u32,
    pub current_field: usize,
    pub field_order: Vec<LeadField>,
    pub emails_sent: usize,
    pub callbacks_scheduled: usize,
}

pub struct ConversationEngine {
    config: AgentConfig,
    directory: Arc<dyn CallerDirectory>,
    dispatcher: Arc<ActionDispatcher>,
    llm: Option<Arc<dyn LlmProvider>>,
    ai_extractor: Option<AiExtractor>,
    manual: ManualExtractor,
    ctx: CallContext,
}

impl ConversationEngine {
    /// Create an engine. Pass `llm: None` to run every call in manual mode.
    pub fn new(
        config: AgentConfig,
        directory: Arc<dyn CallerDirectory>,
        dispatcher: Arc<ActionDispatcher>,
        llm: Option<Arc<dyn LlmProvider>>,
    ) -> Self {
        let ai_extractor = llm.as_ref().map(|llm| {
            AiExtractor::new(
                Arc::clone(llm),
                config.extraction_max_tokens,
                config.extraction_temperature,
            )
        });
        let ctx = CallContext::new(llm.is_some());
        Self {
            config,
            directory,
            dispatcher,
            llm,
            ai_extractor,
            manual: ManualExtractor,
            ctx,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn call_id(&self) -> Uuid {
        self.ctx.call_id
    }

    pub fn state(&self) -> ConversationState {
        self.ctx.state()
    }

    pub fn caller(&self) -> Option<&CallerRecord> {
        self.ctx.caller()
    }

    pub fn collected_info(&self) -> Option<&CollectedInfo> {
        self.ctx.collected_info()
    }

    pub fn profile(&self) -> &CallProfile {
        &self.ctx.profile
    }

    pub fn transcript(&self) -> &Transcript {
        &self.ctx.transcript
    }

    pub fn email_receipts(&self) -> &[EmailReceipt] {
        &self.ctx.email_receipts
    }

    pub fn callback_receipts(&self) -> &[CallbackReceipt] {
        &self.ctx.callback_receipts
    }

    pub fn extraction_failures(&self) -> u32 {
        self.ctx.extraction_failures
    }

    pub fn dispatcher(&self) -> &Arc<ActionDispatcher> {
        &self.dispatcher
    }

    /// Whether the model may be used for this call.
    pub fn ai_available(&self) -> bool {
        self.llm.is_some() && self.ctx.ai_enabled
    }

    fn extraction_enabled(&self) -> bool {
        self.ai_available() && self.ctx.extraction_failures < self.config.max_extraction_failures
    }

    // ── Call lifecycle ──────────────────────────────────────────────

    /// Identify the caller and return the opening line.
    pub async fn start_call(&mut self, phone: &str) -> String {
        let state = self.ctx.state();
        if state.is_terminal() {
            self.reset();
        } else if state != ConversationState::Greeting {
            warn!(call_id = %self.ctx.call_id, %state, "Call already in progress, starting over");
            self.reset();
        }

        self.ctx.phone = Some(phone.to_string());
        self.ctx
            .transcript
            .system(format!("Call started from phone number: {phone}"));

        let greeting = match self.directory.lookup(phone).await {
            Ok(Some(record)) => {
                info!(call_id = %self.ctx.call_id, pharmacy = %record.name, rx_volume = record.rx_volume, "Existing customer");
                let greeting = templates::existing_customer_greeting(&record);
                self.ctx.profile = CallProfile::Existing(record);
                self.transition(ConversationState::DiscussingSolutions);
                greeting
            }
            Ok(None) => {
                info!(call_id = %self.ctx.call_id, "New lead");
                self.ctx.start_lead();
                self.transition(ConversationState::CollectingInfo);
                templates::new_lead_greeting(&self.config.bot_name)
            }
            Err(e) => {
                error!(call_id = %self.ctx.call_id, error = %e, "Caller lookup failed");
                self.ctx
                    .transcript
                    .system(format!("Directory lookup failed: {e}"));
                self.transition(ConversationState::Error);
                templates::API_ERROR_MESSAGE.to_string()
            }
        };

        self.ctx.transcript.assistant(greeting.clone());
        greeting
    }

    /// Handle one caller message and return the agent's reply.
    pub async fn process_message(&mut self, message: &str) -> String {
        let state = self.ctx.state();
        debug!(call_id = %self.ctx.call_id, %state, "Processing message");

        let reply = match state {
            ConversationState::CollectingInfo => self.collect_info(message).await,
            ConversationState::DiscussingSolutions => self.discuss_solutions(message).await,
            ConversationState::OfferingFollowUp => self.offer_follow_up(message).await,
            ConversationState::Scheduling => self.schedule(message).await,
            ConversationState::Closing => close(message),
            ConversationState::Error => self.recover(),
            ConversationState::Greeting => {
                if self.ai_available() {
                    self.generate_response(message).await
                } else {
                    templates::GENERAL_HELP.to_string()
                }
            }
        };

        self.ctx.transcript.user(message);
        self.ctx.transcript.assistant(reply.clone());
        reply
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            call_id: self.ctx.call_id,
            started_at: self.ctx.started_at,
            phone: self.ctx.phone.clone(),
            state: self.ctx.state(),
            caller: self.ctx.caller().cloned(),
            collected_info: self.ctx.collected_info().cloned(),
            transcript_length: self.ctx.transcript.len(),
            ai_available: self.ai_available(),
            extraction_failures: self.ctx.extraction_failures,
            current_field: self.ctx.cursor,
            field_order: LeadField::ORDER.to_vec(),
            emails_sent: self.ctx.email_receipts.len(),
            callbacks_scheduled: self.ctx.callback_receipts.len(),
        }
    }

    /// Drop all per-call state. The shared dispatcher log is kept.
    pub fn reset(&mut self) {
        self.ctx = CallContext::new(self.llm.is_some());
        info!(call_id = %self.ctx.call_id, "Conversation reset");
    }

    fn transition(&mut self, to: ConversationState) {
        if let Err(e) = self.ctx.transition(to) {
            warn!(call_id = %self.ctx.call_id, error = %e, "Transition rejected");
        }
    }

    // ── State handlers ──────────────────────────────────────────────

    async fn collect_info(&mut self, message: &str) -> String {
        if let Some(field) = self.ctx.next_missing_field()
            && self.extraction_enabled()
            && let Some(extractor) = &self.ai_extractor
        {
            let outcome = extractor.extract(field, message).await;
            match outcome {
                Extraction::Found(value) => {
                    info!(call_id = %self.ctx.call_id, %field, %value, tier = extractor.name(), "Field extracted");
                    if self.ctx.set_lead_field(field, value) {
                        self.ctx.sync_cursor();
                        return self.collection_reply(field, true);
                    }
                }
                Extraction::Rejected(raw) => {
                    warn!(call_id = %self.ctx.call_id, %field, raw = %raw, "AI extraction returned invalid data");
                }
                Extraction::NotFound => {
                    debug!(call_id = %self.ctx.call_id, %field, "AI extraction found nothing");
                }
                Extraction::Unavailable(reason) => {
                    warn!(call_id = %self.ctx.call_id, %field, reason = %reason, "AI extraction unavailable");
                }
            }

            self.ctx.extraction_failures += 1;
            if self.ctx.extraction_failures >= self.config.max_extraction_failures {
                warn!(
                    call_id = %self.ctx.call_id,
                    failures = self.ctx.extraction_failures,
                    "AI extraction failed too often, switching to manual mode"
                );
            }
        }

        self.collect_manually(message).await
    }

    async fn collect_manually(&mut self, message: &str) -> String {
        let Some(field) = self.ctx.cursor_field() else {
            return self.collection_reply(LeadField::Email, false);
        };

        let extracted = match self.manual.extract(field, message).await.value() {
            Some(value) => {
                debug!(call_id = %self.ctx.call_id, %field, %value, tier = self.manual.name(), "Field extracted");
                self.ctx.set_lead_field(field, value)
            }
            None => false,
        };

        if extracted {
            self.ctx.sync_cursor();
        } else {
            debug!(call_id = %self.ctx.call_id, %field, "Nothing extracted, repeating question");
        }
        self.collection_reply(field, extracted)
    }

    /// Reply after an extraction attempt on `field`. Moves on to solutions
    /// once every field is filled.
    fn collection_reply(&mut self, field: LeadField, extracted: bool) -> String {
        if self.ctx.lead_complete() {
            info!(call_id = %self.ctx.call_id, "All lead information collected");
            self.transition(ConversationState::DiscussingSolutions);
            return templates::solution_benefits(self.ctx.volume()).to_string();
        }

        let next = if extracted {
            self.ctx.cursor_field().unwrap_or(field)
        } else {
            field
        };
        templates::collection_question(next).to_string()
    }

    async fn discuss_solutions(&mut self, message: &str) -> String {
        if contains_any(message, INTEREST_KEYWORDS) {
            self.transition(ConversationState::OfferingFollowUp);
            return templates::follow_up_options().to_string();
        }

        if self.ai_available() {
            self.generate_response(message).await
        } else {
            templates::SOLUTIONS_NUDGE.to_string()
        }
    }

    async fn offer_follow_up(&mut self, message: &str) -> String {
        let captured = self.ctx.capture_email(message).is_some();
        let wants_email = contains_any(message, &["email"]) || (self.ctx.awaiting_email && captured);

        if wants_email {
            let Some(email) = self.ctx.resolve_email() else {
                self.ctx.awaiting_email = true;
                return templates::ASK_FOR_EMAIL.to_string();
            };

            let mut target = self.ctx.follow_up_target();
            target.email = Some(email);
            let receipt = self.dispatcher.send_welcome_email(&target).await;
            info!(call_id = %self.ctx.call_id, email_id = receipt.email_id, "Welcome email recorded");
            self.ctx.email_receipts.push(receipt);
            self.ctx.awaiting_email = false;

            self.transition(ConversationState::Closing);
            return templates::successful_closing(
                "sent you detailed information via email",
                "receive the email within the next few minutes",
                &target.pharmacy_name,
            );
        }

        if contains_any(message, CALLBACK_KEYWORDS) {
            self.transition(ConversationState::Scheduling);
            return templates::CALLBACK_OFFER.to_string();
        }

        templates::FOLLOW_UP_REPEAT.to_string()
    }

    async fn schedule(&mut self, message: &str) -> String {
        let preferred_time = preferred_time(message, &self.config.default_callback_time);
        let target = self.ctx.follow_up_target();

        let receipt = self
            .dispatcher
            .schedule_consultation(&target, &preferred_time)
            .await;
        info!(call_id = %self.ctx.call_id, callback_id = receipt.callback_id, time = %preferred_time, "Consultation recorded");
        self.ctx.callback_receipts.push(receipt);

        self.transition(ConversationState::Closing);
        templates::successful_closing(
            "scheduled a consultation call for you",
            "receive a confirmation email with the details",
            &target.pharmacy_name,
        )
    }

    /// Single-shot recovery from a failed lookup: continue as a lead in
    /// manual mode.
    fn recover(&mut self) -> String {
        warn!(call_id = %self.ctx.call_id, "Recovering from error, AI disabled for this call");
        self.ctx.ai_enabled = false;
        self.ctx.start_lead();
        self.transition(ConversationState::CollectingInfo);
        templates::RECOVERY_MESSAGE.to_string()
    }

    /// Free-form reply from the model. Never fails; falls back to an apology.
    async fn generate_response(&self, message: &str) -> String {
        let Some(llm) = self.llm.as_ref().filter(|_| self.ai_available()) else {
            return templates::GENERAL_HELP.to_string();
        };

        let mut messages = Vec::with_capacity(self.config.history_window + 2);
        messages.push(ChatMessage::system(templates::SYSTEM_PROMPT));
        messages.extend_from_slice(self.ctx.transcript.recent(self.config.history_window));
        messages.push(ChatMessage::user(message));

        let request = CompletionRequest::new(messages)
            .with_max_tokens(self.config.response_max_tokens)
            .with_temperature(self.config.response_temperature);

        match llm.complete(request).await {
            Ok(response) if !response.content.trim().is_empty() => response.content,
            Ok(_) => {
                warn!(call_id = %self.ctx.call_id, "Model returned an empty reply");
                templates::GENERATION_APOLOGY.to_string()
            }
            Err(e) => {
                warn!(call_id = %self.ctx.call_id, error = %e, "Response generation failed");
                templates::GENERATION_APOLOGY.to_string()
            }
        }
    }
}

fn close(message: &str) -> String {
    if contains_any(message, FAREWELL_KEYWORDS) {
        templates::GENERAL_CLOSING.to_string()
    } else {
        templates::ANYTHING_ELSE.to_string()
    }
}

/// Callback time from the first time keyword in `message`.
fn preferred_time(message: &str, default: &str) -> String {
    let lower = message.to_lowercase();
    TIME_KEYWORDS
        .iter()
        .find(|k| lower.contains(*k))
        .map(|k| format!("{k} at 2 PM"))
        .unwrap_or_else(|| default.to_string())
}

/// Case-insensitive substring match against any keyword.
fn contains_any(message: &str, keywords: &[&str]) -> bool {
    let lower = message.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}
