//! Append-only record of a call.

use serde::Serialize;

use crate::llm::ChatMessage;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn system(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::system(content));
    }

    pub fn user(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::user(content));
    }

    pub fn assistant(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::assistant(content));
    }

    /// The last `n` messages, oldest first.
    pub fn recent(&self, n: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn recent_window() {
        let mut transcript = Transcript::new();
        for i in 0..12 {
            transcript.user(format!("m{i}"));
        }
        let window = transcript.recent(10);
        assert_eq!(window.len(), 10);
        assert_eq!(window[0].content, "m2");
        assert_eq!(window[9].content, "m11");
        assert_eq!(transcript.recent(50).len(), 12);
        assert!(Transcript::new().recent(10).is_empty());
    }

    #[test]
    fn keeps_roles_in_order() {
        let mut transcript = Transcript::new();
        transcript.system("start");
        transcript.assistant("hello");
        transcript.user("hi");
        let roles: Vec<_> = transcript.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::Assistant, Role::User]);
        assert_eq!(transcript.len(), 3);
    }
}
