//! Call state machine.

use serde::{Deserialize, Serialize};

/// Where a call currently is.
///
/// Transitions only move forward, apart from `Error → CollectingInfo`
/// recovery. Returning to `Greeting` happens only through an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    Greeting,
    CollectingInfo,
    DiscussingSolutions,
    OfferingFollowUp,
    Scheduling,
    Closing,
    Error,
}

impl ConversationState {
    pub const ALL: [ConversationState; 7] = [
        Self::Greeting,
        Self::CollectingInfo,
        Self::DiscussingSolutions,
        Self::OfferingFollowUp,
        Self::Scheduling,
        Self::Closing,
        Self::Error,
    ];

    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: ConversationState) -> bool {
        use ConversationState::*;
        matches!(
            (self, target),
            (Greeting, DiscussingSolutions)
                | (Greeting, CollectingInfo)
                | (Greeting, Error)
                | (CollectingInfo, DiscussingSolutions)
                | (DiscussingSolutions, OfferingFollowUp)
                | (OfferingFollowUp, Closing)
                | (OfferingFollowUp, Scheduling)
                | (Scheduling, Closing)
                | (Error, CollectingInfo)
        )
    }

    /// States with no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::CollectingInfo => "collecting_info",
            Self::DiscussingSolutions => "discussing_solutions",
            Self::OfferingFollowUp => "offering_follow_up",
            Self::Scheduling => "scheduling",
            Self::Closing => "closing",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
