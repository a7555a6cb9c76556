//! Per-publication conversation history with the agent.
//!
//! A [`Ledger`] holds the role-tagged turns the agent sees on every call for
//! one publication. Assistant verification exchanges are never stored, and
//! raw agent output never enters the ledger: only the verified text is
//! appended, as an `assistant` turn.

use serde::{Deserialize, Serialize};

/// Message role in the OpenAI chat format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::System => "system",
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

/// One role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered agent conversation for exactly one publication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    turns: Vec<Turn>,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger opened with the given system turn.
    pub fn with_system(content: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::system(content)],
        }
    }

    /// Append a system turn.
    pub(crate) fn push_system(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::system(content));
    }

    /// Append the prompt about to be sent to the agent.
    pub(crate) fn push_prompt(&mut self, prompt: impl Into<String>) {
        self.turns.push(Turn::user(prompt));
    }

    /// Append an assistant-verified response.
    pub(crate) fn push_verified(&mut self, verified: impl Into<String>) {
        self.turns.push(Turn::assistant(verified));
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Number of turns with the given role.
    pub fn count(&self, role: TurnRole) -> usize {
        self.turns.iter().filter(|t| t.role == role).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_serializes_openai_shape() -> serde_json::Result<()> {
        let json = serde_json::to_value(Turn::user("hi"))?;
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
        Ok(())
    }

    #[test]
    fn test_ledger_counts_by_role() {
        let mut ledger = Ledger::with_system("sys");
        ledger.push_prompt("prompt 1");
        ledger.push_verified("verified 1");
        ledger.push_prompt("prompt 2");

        assert_eq!(ledger.len(), 4);
        assert_eq!(ledger.count(TurnRole::System), 1);
        assert_eq!(ledger.count(TurnRole::User), 2);
        assert_eq!(ledger.count(TurnRole::Assistant), 1);
        assert_eq!(ledger.turns()[2].content, "verified 1");
    }

    #[test]
    fn test_ledger_is_transparent_array() -> serde_json::Result<()> {
        let ledger = Ledger::with_system("sys");
        let json = serde_json::to_string(&ledger)?;
        assert_eq!(json, r#"[{"role":"system","content":"sys"}]"#);
        Ok(())
    }
}
