//! Conversation transcript: the ordered, append-only record of turns sent to the oracle.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One {role, content} entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Append-only sequence of turns. There is no removal API; it only grows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transcript seeded with a single system instruction.
    pub fn seeded(system: impl Into<String>) -> Self {
        let mut t = Self::new();
        t.push(Turn::system(system));
        t
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn push_system(&mut self, content: impl Into<String>) {
        self.push(Turn::system(content));
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Turn::user(content));
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

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// The trailing `max_turns` turns (all of them when `max_turns` is 0 or exceeds the length).
    pub fn window(&self, max_turns: usize) -> &[Turn] {
        if max_turns == 0 || max_turns >= self.turns.len() {
            &self.turns
        } else {
            &self.turns[self.turns.len() - max_turns..]
        }
    }

    /// Compact JSON rendering, embedded in directives that quote the conversation so far.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(&self.turns).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_keeps_trailing_turns() {
        let mut t = Transcript::seeded("directive");
        t.push_user("a");
        t.push_user("b");
        assert_eq!(t.window(0).len(), 3);
        assert_eq!(t.window(10).len(), 3);
        let w = t.window(2);
        assert_eq!(w[0].content, "a");
        assert_eq!(w[1].content, "b");
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(Turn::system("x")).unwrap();
        assert_eq!(json["role"], "system");
    }
}
