//! Channel Route - per-channel trigger evaluation.
//!
//! Resolution order is fixed:
//!
//! 1. Start from the channel's default handler.
//! 2. Apply string triggers in declared order. Every trigger that is a
//!    substring of the message overwrites the current result.
//! 3. Extract the first run of digits as a token id and apply range triggers
//!    in declared order, again overwriting on every match.
//!
//! The last trigger to match wins. There is no "most specific" rule, so
//! config authors order mutually exclusive triggers themselves.

use serde::{Deserialize, Serialize};

use tokenroute_traits::HandlerId;

/// Inclusive token id range `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u64; 2]", into = "[u64; 2]")]
pub struct TokenRange {
    pub low: u64,
    pub high: u64,
}

impl TokenRange {
    pub fn new(low: u64, high: u64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, token_id: u64) -> bool {
        self.low <= token_id && token_id <= self.high
    }
}

impl From<[u64; 2]> for TokenRange {
    fn from([low, high]: [u64; 2]) -> Self {
        Self { low, high }
    }
}

impl From<TokenRange> for [u64; 2] {
    fn from(range: TokenRange) -> Self {
        [range.low, range.high]
    }
}

/// Substring triggers that select one handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringTrigger {
    pub handler: HandlerId,
    /// Lowercased trigger strings
    pub patterns: Vec<String>,
}

impl StringTrigger {
    pub fn new<I, S>(handler: HandlerId, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            handler,
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .collect(),
        }
    }

    fn matches(&self, lowercased_text: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| lowercased_text.contains(pattern.as_str()))
    }
}

/// Token id range that selects one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeTrigger<'a> {
    pub handler: &'a HandlerId,
    pub range: TokenRange,
}

/// Handler configuration of a routing channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandler {
    pub default: HandlerId,
    pub string_triggers: Vec<StringTrigger>,
    /// Ordered groups of `(handler, range)` pairs
    pub token_id_triggers: Vec<Vec<(HandlerId, TokenRange)>>,
}

impl ChannelHandler {
    pub fn new(default: HandlerId) -> Self {
        Self {
            default,
            string_triggers: Vec::new(),
            token_id_triggers: Vec::new(),
        }
    }

    /// Append a string trigger group
    pub fn with_string_trigger<I, S>(mut self, handler: HandlerId, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.string_triggers
            .push(StringTrigger::new(handler, patterns));
        self
    }

    /// Append a token range group
    pub fn with_token_ranges(mut self, group: Vec<(HandlerId, TokenRange)>) -> Self {
        self.token_id_triggers.push(group);
        self
    }

    /// Every handler id this configuration can resolve to, in evaluation order.
    pub fn referenced_handlers(&self) -> impl Iterator<Item = &HandlerId> {
        std::iter::once(&self.default)
            .chain(self.string_triggers.iter().map(|t| &t.handler))
            .chain(
                self.token_id_triggers
                    .iter()
                    .flat_map(|group| group.iter().map(|(handler, _)| handler)),
            )
    }

    fn range_triggers(&self) -> impl Iterator<Item = RangeTrigger<'_>> {
        self.token_id_triggers.iter().flat_map(|group| {
            group
                .iter()
                .map(|(handler, range)| RangeTrigger { handler, range: *range })
        })
    }
}

/// One channel's routing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRoute {
    pub id: String,
    pub name: String,
    /// `None` for channels that never route messages
    pub handler: Option<ChannelHandler>,
}

impl ChannelRoute {
    /// A channel that does not route messages
    pub fn passive(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            handler: None,
        }
    }

    /// A channel that routes messages through `handler`
    pub fn routed(id: impl Into<String>, name: impl Into<String>, handler: ChannelHandler) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            handler: Some(handler),
        }
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Resolve the handler for already lowercased message text.
    pub fn resolve_handler(&self, lowercased_text: &str) -> Option<&HandlerId> {
        let handler = self.handler.as_ref()?;
        let mut selected = &handler.default;

        for trigger in &handler.string_triggers {
            if trigger.matches(lowercased_text) {
                selected = &trigger.handler;
            }
        }

        if let Some(token_id) = extract_token_id(lowercased_text) {
            for trigger in handler.range_triggers() {
                if trigger.range.contains(token_id) {
                    selected = trigger.handler;
                }
            }
        }

        Some(selected)
    }
}

/// First contiguous run of ASCII digits, if it fits a `u64`.
pub fn extract_token_id(text: &str) -> Option<u64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}
