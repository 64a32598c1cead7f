//! PromptDocument: the JSON file the editor imports and exports
//!
//! ```text
//! {
//!   "metadata":     { "name": ..., "description": ..., "temperature": ... },
//!   "prompt_cards": [ { "id": ..., "content": ..., "role": ..., ... }, ... ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::card::PromptCard;
use super::metadata::Metadata;
use crate::compose::{self, Composition};
use crate::error::DocumentError;
use crate::template::{Resolver, VariableTable};

/// File name used when the template has no name
pub const DEFAULT_EXPORT_NAME: &str = "prompt_template";

/// A prompt template: ordered cards plus metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptDocument {
    pub prompt_cards: Vec<PromptCard>,

    pub metadata: Metadata,

    /// Top-level keys this tool does not know about
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PromptDocument {
    /// Parse a document, requiring both `prompt_cards` and `metadata`
    pub fn from_json(input: &str) -> Result<Self, DocumentError> {
        debug!(input_len = input.len(), "PromptDocument::from_json: called");
        let value: Value = serde_json::from_str(input)?;

        for field in ["prompt_cards", "metadata"] {
            if value.get(field).is_none_or(Value::is_null) {
                debug!(%field, "PromptDocument::from_json: missing field");
                return Err(DocumentError::MissingField { field });
            }
        }

        let doc: Self = serde_json::from_value(value)?;
        debug!(cards = doc.prompt_cards.len(), "PromptDocument::from_json: parsed");
        Ok(doc)
    }

    /// Load a document from disk
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        debug!(?path, "PromptDocument::load: called");
        let content = std::fs::read_to_string(path)?;
        let doc = Self::from_json(&content)?;
        info!("Loaded {} cards from {}", doc.prompt_cards.len(), path.display());
        Ok(doc)
    }

    /// Pretty JSON with two-space indentation
    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the document to disk as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        debug!(?path, cards = self.prompt_cards.len(), "PromptDocument::save: called");
        std::fs::write(path, self.to_json_pretty()?)?;
        info!("Saved {} cards to {}", self.prompt_cards.len(), path.display());
        Ok(())
    }

    /// File name for export, derived from the template name
    pub fn export_file_name(&self) -> String {
        let name = self
            .metadata
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_EXPORT_NAME);
        let sanitized: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' || ('\u{4e00}'..='\u{9fff}').contains(&c) {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}.json", sanitized)
    }

    /// Export into `dir` under [`Self::export_file_name`], returning the path
    pub fn export_to(&self, dir: &Path) -> Result<std::path::PathBuf, DocumentError> {
        let path = dir.join(self.export_file_name());
        debug!(?path, "PromptDocument::export_to: called");
        self.save(&path)?;
        Ok(path)
    }

    pub fn card(&self, id: &str) -> Option<&PromptCard> {
        self.prompt_cards.iter().find(|c| c.id == id)
    }

    pub(crate) fn position(&self, id: &str) -> Result<usize, DocumentError> {
        self.prompt_cards
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| DocumentError::CardNotFound { id: id.to_string() })
    }

    /// Cards sorted by `order_index`, ties in document order
    pub fn cards_in_display_order(&self) -> Vec<&PromptCard> {
        let mut cards: Vec<&PromptCard> = self.prompt_cards.iter().collect();
        cards.sort_by_key(|c| c.order_index);
        cards
    }

    /// Compose this document's cards into one prompt
    pub fn compose<R: Resolver + ?Sized>(&self, resolver: &mut R, vars: &mut VariableTable) -> Composition {
        compose::compose_blocks(&self.prompt_cards, resolver, vars)
    }
}
