//! Call handling: state machine, lead slot-filling and the engine tying them
//! together.

pub mod context;
pub mod engine;
pub mod extraction;
pub mod fields;
pub mod state;
pub mod transcript;

pub use context::{CallContext, CallProfile};
pub use engine::{ConversationEngine, ConversationSummary};
pub use extraction::{AiExtractor, Extraction, FieldExtractor, ManualExtractor};
pub use fields::{CollectedInfo, FieldValue, LeadField};
pub use state::ConversationState;
pub use transcript::Transcript;
