//! Immutable message record produced by a slow call.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One completed slow call: which id it was, how long the service took,
/// and the payload the service produced. Created once, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    pub id: u32,
    pub delay_ms: u64,
    pub payload: String,
}

impl Message {
    pub fn new(id: u32, delay_ms: u64, payload: impl Into<String>) -> Self {
        Self {
            id,
            delay_ms,
            payload: payload.into(),
        }
    }

    /// Presentation key: ascending delay, slowest last. The id tie-break
    /// keeps the sorted sequence identical no matter which strategy (and
    /// therefore which completion order) produced the set.
    pub fn sort_key(&self) -> (u64, u32) {
        (self.delay_ms, self.id)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => write!(f, "{}", json),
            Err(_) => write!(f, "{{\"id\":{},\"delay_ms\":{}}}", self.id, self.delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        let a = Message::new(1, 30, "message 1 delayed 30ms");
        let b = Message::new(1, 30, "message 1 delayed 30ms");
        let c = Message::new(2, 30, "message 2 delayed 30ms");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_sort_key_breaks_ties_by_id() {
        let a = Message::new(7, 30, "x");
        let b = Message::new(2, 30, "y");

        assert!(b.sort_key() < a.sort_key());
    }

    #[test]
    fn test_display_is_json() {
        let m = Message::new(3, 120, "message 3 delayed 120ms");
        let text = m.to_string();

        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["id"], 3);
        assert_eq!(parsed["delay_ms"], 120);
        assert_eq!(parsed["payload"], "message 3 delayed 120ms");
    }
}
