//! Narrow filters
//!
//! A [`Filter`] is an immutable list of search terms describing which
//! messages a message list shows, e.g. `channel:3 topic:lunch` or
//! `in:home`. Filters never change after a list is built; a new narrow
//! means a new list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::message::{Message, Recipient, flags};

/// One `operator:operand` term of a narrow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrowTerm {
    pub operator: String,
    pub operand: String,
    #[serde(default)]
    pub negated: bool,
}

impl NarrowTerm {
    pub fn new(operator: impl Into<String>, operand: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
            operand: operand.into(),
            negated: false,
        }
    }

    pub fn negated(operator: impl Into<String>, operand: impl Into<String>) -> Self {
        Self {
            negated: true,
            ..Self::new(operator, operand)
        }
    }

    /// Term type used for classifying narrows: `channel`, `is-dm`, `not-search`, ...
    fn term_type(&self) -> String {
        let base = match self.operator.as_str() {
            "is" | "in" | "has" => format!("{}-{}", self.operator, self.operand),
            op => op.to_string(),
        };
        if self.negated {
            format!("not-{}", base)
        } else {
            base
        }
    }
}

/// Canonical operator name for legacy aliases
fn canonical_operator(operator: &str) -> String {
    let lowered = operator.to_lowercase();
    match lowered.as_str() {
        "stream" => "channel".to_string(),
        "subject" => "topic".to_string(),
        "pm-with" => "dm".to_string(),
        _ => lowered,
    }
}

/// Canonical operand for operators whose operands are case-insensitive keywords
fn canonical_operand(operator: &str, operand: &str) -> String {
    match operator {
        "is" | "in" | "has" => {
            let lowered = operand.trim().to_lowercase();
            if lowered == "private" {
                "dm".to_string()
            } else {
                lowered
            }
        }
        "dm" => operand.trim().to_lowercase(),
        _ => operand.trim().to_string(),
    }
}

/// Term type combinations that show an entire single conversation
const CONVERSATION_VIEWS: &[&[&str]] = &[
    &["channel", "topic"],
    &["channel", "near", "topic"],
    &["channel", "topic", "with"],
    &["dm"],
    &["dm", "near"],
    &["dm", "with"],
];

/// Term type combinations in which messages may be marked read passively
const MARK_READ_VIEWS: &[&[&str]] = &[
    &[],
    &["in-home"],
    &["in-all"],
    &["channel"],
    &["is-dm"],
    &["channel", "topic"],
    &["channel", "near", "topic"],
    &["channel", "topic", "with"],
    &["dm"],
    &["dm", "near"],
    &["dm", "with"],
];

/// Term types whose results the client can compute from cached data
const COMMON_TERM_TYPES: &[&str] = &[
    "in-home",
    "in-all",
    "channel",
    "topic",
    "dm",
    "is-dm",
    "is-starred",
    "is-mentioned",
    "sender",
    "with",
];

/// Immutable predicate + ordering descriptor for a message list
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Filter {
    terms: Vec<NarrowTerm>,
}

impl Filter {
    /// Build a filter, normalizing operator aliases and keyword operands
    pub fn new(terms: Vec<NarrowTerm>) -> Self {
        let terms = terms
            .into_iter()
            .map(|term| {
                let operator = canonical_operator(&term.operator);
                let operand = canonical_operand(&operator, &term.operand);
                NarrowTerm {
                    operator,
                    operand,
                    negated: term.negated,
                }
            })
            .collect();
        Self { terms }
    }

    /// Every message, without home-view muting
    pub fn all_messages() -> Self {
        Self::default()
    }

    /// The combined feed (`in:home`)
    pub fn combined_feed() -> Self {
        Self::new(vec![NarrowTerm::new("in", "home")])
    }

    pub fn channel(stream_id: i64) -> Self {
        Self::new(vec![NarrowTerm::new("channel", stream_id.to_string())])
    }

    pub fn topic(stream_id: i64, topic: impl Into<String>) -> Self {
        Self::new(vec![
            NarrowTerm::new("channel", stream_id.to_string()),
            NarrowTerm::new("topic", topic),
        ])
    }

    /// Direct message conversation, given comma separated emails
    pub fn dm(emails: impl Into<String>) -> Self {
        Self::new(vec![NarrowTerm::new("dm", emails)])
    }

    pub fn search(query: impl Into<String>) -> Self {
        Self::new(vec![NarrowTerm::new("search", query)])
    }

    pub fn terms(&self) -> &[NarrowTerm] {
        &self.terms
    }

    /// Operands of the non-negated terms with the given operator
    pub fn operands(&self, operator: &str) -> Vec<&str> {
        let operator = canonical_operator(operator);
        self.terms
            .iter()
            .filter(|t| !t.negated && t.operator == operator)
            .map(|t| t.operand.as_str())
            .collect()
    }

    pub fn has_operator(&self, operator: &str) -> bool {
        let operator = canonical_operator(operator);
        self.terms.iter().any(|t| !t.negated && t.operator == operator)
    }

    pub fn has_operand(&self, operator: &str, operand: &str) -> bool {
        let operator = canonical_operator(operator);
        let operand = canonical_operand(&operator, operand);
        self.terms
            .iter()
            .any(|t| !t.negated && t.operator == operator && t.operand == operand)
    }

    fn sorted_term_types(&self) -> Vec<String> {
        let types: BTreeSet<String> = self.terms.iter().map(NarrowTerm::term_type).collect();
        types.into_iter().collect()
    }

    fn term_types_match(&self, allowed: &[&[&str]]) -> bool {
        let types = self.sorted_term_types();
        allowed.iter().any(|combo| {
            combo.len() == types.len() && combo.iter().zip(&types).all(|(a, b)| a == b)
        })
    }

    /// Whether this is the combined feed
    pub fn is_in_home(&self) -> bool {
        self.terms.len() == 1 && self.has_operand("in", "home")
    }

    /// Whether this narrow shows exactly one conversation (a topic or a DM)
    pub fn is_conversation_view(&self) -> bool {
        self.term_types_match(CONVERSATION_VIEWS)
    }

    pub fn is_keyword_search(&self) -> bool {
        self.has_operator("search")
    }

    /// Whether the narrow is structurally eligible for passive mark-as-read
    ///
    /// Search-like narrows never mark messages read on scroll.
    pub fn can_mark_messages_read(&self) -> bool {
        !self.is_keyword_search() && self.term_types_match(MARK_READ_VIEWS)
    }

    /// Whether adjacent messages to the same recipient may share a header
    pub fn supports_collapsing_recipients(&self) -> bool {
        !self.is_keyword_search()
    }

    /// Narrows the client treats as everyday navigation targets
    pub fn is_common_narrow(&self) -> bool {
        self.terms
            .iter()
            .all(|t| COMMON_TERM_TYPES.contains(&t.term_type().as_str()))
    }

    /// Whether [`Filter::predicate`] fully decides membership
    pub fn can_apply_locally(&self) -> bool {
        !self
            .terms
            .iter()
            .any(|t| matches!(t.operator.as_str(), "search" | "has"))
    }

    /// Whether a message belongs to this narrow
    ///
    /// Terms that can't be decided from the message itself admit it; the
    /// server has already applied them to whatever it sent.
    pub fn predicate(&self, message: &Message) -> bool {
        self.terms.iter().all(|term| match term_matches(term, message) {
            Some(matched) => matched != term.negated,
            None => true,
        })
    }
}

fn email_set(list: &str) -> BTreeSet<String> {
    list.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// `None` means the term can't be evaluated locally
fn term_matches(term: &NarrowTerm, message: &Message) -> Option<bool> {
    match term.operator.as_str() {
        "channel" => {
            let stream_id: i64 = term.operand.parse().ok()?;
            Some(message.stream_id() == Some(stream_id))
        }
        "topic" => Some(
            message
                .topic()
                .is_some_and(|t| t.eq_ignore_ascii_case(&term.operand)),
        ),
        "dm" => match &message.recipient {
            Recipient::Private { reply_to, .. } => {
                Some(email_set(reply_to) == email_set(&term.operand))
            }
            Recipient::Stream { .. } => Some(false),
        },
        "sender" => {
            let sender_id: i64 = term.operand.parse().ok()?;
            Some(message.sender_id == sender_id)
        }
        "is" => match term.operand.as_str() {
            "dm" => Some(message.is_private()),
            "starred" => Some(message.has_flag(flags::STARRED)),
            "mentioned" => Some(message.has_flag(flags::MENTIONED)),
            "unread" => Some(message.is_unread()),
            "resolved" => Some(message.topic().is_some_and(|t| t.starts_with("✔ "))),
            _ => None,
        },
        "in" => match term.operand.as_str() {
            "home" | "all" => Some(true),
            _ => None,
        },
        _ => None,
    }
}
