//! PromptCard domain type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::coerce;

/// Ids of the core cards every deck carries; these cannot be edited or removed
pub const LOCKED_IDS: [&str; 5] = [
    "persona",
    "world_info_before_char",
    "character_card",
    "world_info_after_char",
    "chat_history",
];

/// Soft cap on card content, enforced when content is edited
pub const CONTENT_MAX_LENGTH: usize = 4000;

/// Speaker a card's text is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Upper-case label used in composed block headers
    pub fn label(&self) -> &'static str {
        match self {
            Self::System => "SYSTEM",
            Self::User => "USER",
            Self::Assistant => "ASSISTANT",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "Role::from_str: called");
        match s.to_lowercase().as_str() {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err(format!("Unknown role: {}. Use: system, user, or assistant", s)),
        }
    }
}

/// Where a card is injected when the deck is used for chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Part of the fixed prompt sequence
    #[default]
    Sequence,
    /// Inserted into chat history at `history_depth`
    History,
    /// Attached to the conversation summary
    Summary,
}

impl Placement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequence => "sequence",
            Self::History => "history",
            Self::Summary => "summary",
        }
    }
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Placement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "Placement::from_str: called");
        match s.to_lowercase().as_str() {
            "sequence" => Ok(Self::Sequence),
            "history" => Ok(Self::History),
            "summary" => Ok(Self::Summary),
            _ => Err(format!("Unknown placement: {}. Use: sequence, history, or summary", s)),
        }
    }
}

fn default_trigger_probability() -> f64 {
    1.0
}

/// An informational timestamp
///
/// RFC 3339 strings are parsed; anything else is kept as the raw JSON value so
/// a hand-edited document exports exactly as it was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Parsed(DateTime<Utc>),
    Raw(Value),
}

impl Timestamp {
    pub fn now() -> Self {
        Self::Parsed(Utc::now())
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Parsed(at) => Some(*at),
            Self::Raw(_) => None,
        }
    }
}

/// A named fragment of template text with role, placement and ordering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptCard {
    /// Unique within the document, `[a-zA-Z0-9_]*`
    #[serde(default, deserialize_with = "coerce::text")]
    pub id: String,

    /// Library the card was exported from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_id: Option<String>,

    /// Display label
    #[serde(default, deserialize_with = "coerce::text")]
    pub name: String,

    /// Raw template text
    #[serde(default, deserialize_with = "coerce::text")]
    pub content: String,

    #[serde(default, deserialize_with = "coerce::any_case")]
    pub role: Role,

    #[serde(default, deserialize_with = "coerce::any_case")]
    pub placement: Placement,

    /// Only meaningful for history placement
    #[serde(default, deserialize_with = "coerce::history_depth")]
    pub history_depth: Option<u16>,

    /// Composition order, 0..=9999
    #[serde(default, deserialize_with = "coerce::order_index")]
    pub order_index: u16,

    /// Disabled cards are skipped by the composer
    #[serde(default, deserialize_with = "coerce::flag")]
    pub enabled: bool,

    /// Marks a protected core card
    #[serde(default, deserialize_with = "coerce::flag")]
    pub is_system: bool,

    #[serde(default)]
    pub trigger_keywords: Vec<String>,

    #[serde(default = "default_trigger_probability", deserialize_with = "coerce::probability")]
    pub trigger_probability: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,

    /// Fields this tool does not know about, kept for export
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PromptCard {
    /// Create an enabled, empty system card stamped with the current time
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        debug!(%id, "PromptCard::new: called");
        let now = Timestamp::now();
        Self {
            id,
            library_id: None,
            name: String::new(),
            content: String::new(),
            role: Role::System,
            placement: Placement::Sequence,
            history_depth: None,
            order_index: 0,
            enabled: true,
            is_system: false,
            trigger_keywords: Vec::new(),
            trigger_probability: default_trigger_probability(),
            created_at: Some(now.clone()),
            updated_at: Some(now),
            extra: Map::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_order(mut self, order_index: u16) -> Self {
        self.order_index = order_index.min(coerce::MAX_ORDER_INDEX);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether this is one of the protected core cards
    pub fn is_locked(&self) -> bool {
        LOCKED_IDS.contains(&self.id.as_str())
    }

    /// Content length in characters
    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Stamp `updated_at` with the current time
    pub fn touch(&mut self) {
        self.updated_at = Some(Timestamp::now());
    }
}
