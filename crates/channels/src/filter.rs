use {
    parley_common::Message,
    serde::{Deserialize, Serialize},
};

/// A single predicate over a message's endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFilter {
    /// Sender must equal this address exactly.
    MatchFrom(String),
    /// Recipient must equal this address exactly.
    MatchTo(String),
}

impl MessageFilter {
    pub fn accepts(&self, msg: &Message) -> bool {
        match self {
            Self::MatchFrom(from) => msg.from == *from,
            Self::MatchTo(to) => msg.to == *to,
        }
    }
}

/// Conjunction of [`MessageFilter`]s. An empty set accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageFilters(pub Vec<MessageFilter>);

impl MessageFilters {
    /// Filters that accept every message.
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn match_from(mut self, from: impl Into<String>) -> Self {
        self.0.push(MessageFilter::MatchFrom(from.into()));
        self
    }

    #[must_use]
    pub fn match_to(mut self, to: impl Into<String>) -> Self {
        self.0.push(MessageFilter::MatchTo(to.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Returns true if `msg` passes every filter in `filters`.
pub fn filter_message(filters: &MessageFilters, msg: &Message) -> bool {
    filters.0.iter().all(|f| f.accepts(msg))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn msg(from: &str, to: &str) -> Message {
        Message::new(from, to, "hello")
    }

    #[test]
    fn empty_filters_accept_everything() {
        let filters = MessageFilters::all();
        assert!(filter_message(&filters, &msg("+15550001", "+15550002")));
        assert!(filter_message(&filters, &msg("", "")));
    }

    #[test]
    fn match_from_rejects_other_senders() {
        let filters = MessageFilters::all().match_from("A");
        assert!(filter_message(&filters, &msg("A", "B")));
        assert!(!filter_message(&filters, &msg("a", "B")));
        assert!(!filter_message(&filters, &msg("C", "A")));
    }

    #[test]
    fn filters_are_conjunctive() {
        let filters = MessageFilters::all().match_from("A").match_to("B");
        assert!(filter_message(&filters, &msg("A", "B")));
        assert!(!filter_message(&filters, &msg("A", "C")));
        assert!(!filter_message(&filters, &msg("C", "B")));
    }

    #[test]
    fn deserializes_from_tagged_list() {
        let filters: MessageFilters =
            serde_json::from_str(r#"[{"match_from":"A"},{"match_to":"B"}]"#).unwrap();
        assert_eq!(filters, MessageFilters::all().match_from("A").match_to("B"));
    }
}
