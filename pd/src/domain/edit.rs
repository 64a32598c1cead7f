//! Card editing operations on a PromptDocument
//!
//! Every operation that changes a card stamps its `updated_at`. Locked core
//! cards only accept a new `order_index`.

use chrono::Utc;
use tracing::{debug, info};

use super::card::{CONTENT_MAX_LENGTH, Placement, PromptCard, Role, Timestamp};
use super::coerce;
use super::document::PromptDocument;
use super::metadata::MetadataPatch;
use crate::error::DocumentError;

/// Partial update for a card; `None` leaves a field alone
#[derive(Debug, Clone, Default)]
pub struct CardPatch {
    /// New id, normalized before use
    pub id: Option<String>,
    pub name: Option<String>,
    pub content: Option<String>,
    pub role: Option<Role>,
    pub placement: Option<Placement>,
    /// Ignored unless the card ends up with history placement
    pub history_depth: Option<i64>,
    pub order_index: Option<i64>,
    pub enabled: Option<bool>,
}

impl CardPatch {
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.name.is_none()
            && self.content.is_none()
            && self.role.is_none()
            && self.placement.is_none()
            && self.history_depth.is_none()
            && self.order_index.is_none()
            && self.enabled.is_none()
    }

    /// Whether the patch touches anything besides the order index
    fn edits_locked_fields(&self) -> bool {
        self.id.is_some()
            || self.name.is_some()
            || self.content.is_some()
            || self.role.is_some()
            || self.placement.is_some()
            || self.history_depth.is_some()
            || self.enabled.is_some()
    }
}

impl PromptDocument {
    /// Order index for a new card: one past the current maximum, capped at 9999
    pub fn next_order_index(&self) -> u16 {
        match self.prompt_cards.iter().map(|c| c.order_index).max() {
            Some(max) => max.saturating_add(1).min(coerce::MAX_ORDER_INDEX),
            None => 0,
        }
    }

    /// Return `base` if unused, otherwise `base_2`, `base_3`, ...
    pub fn unique_id(&self, base: &str) -> String {
        if self.card(base).is_none() {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", base, n);
            if self.card(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Append a blank card and return its id
    pub fn add_card(&mut self) -> String {
        debug!("PromptDocument::add_card: called");
        let id = self.unique_id(&format!("new_card_{}", Utc::now().timestamp_millis()));
        let library_id = self
            .prompt_cards
            .first()
            .map(|c| c.library_id.clone().unwrap_or_default())
            .unwrap_or_default();

        let mut card = PromptCard::new(id.clone())
            .with_name("New card")
            .with_order(self.next_order_index());
        card.library_id = Some(library_id);

        self.prompt_cards.push(card);
        info!("Added card {}", id);
        id
    }

    /// Copy a card, inserting the copy right after the original
    pub fn duplicate_card(&mut self, id: &str) -> Result<String, DocumentError> {
        debug!(%id, "PromptDocument::duplicate_card: called");
        let idx = self.position(id)?;
        let src = &self.prompt_cards[idx];
        if src.is_locked() {
            return Err(DocumentError::LockedCard {
                id: id.to_string(),
                action: "duplicated",
            });
        }

        let now = Timestamp::now();
        let mut dup = src.clone();
        dup.id = self.unique_id(&format!("{}_copy", src.id));
        dup.name = format!("{} (copy)", src.name);
        dup.is_system = false;
        dup.created_at = Some(now.clone());
        dup.updated_at = Some(now);
        dup.order_index = src.order_index.saturating_add(1).min(coerce::MAX_ORDER_INDEX);

        let new_id = dup.id.clone();
        self.prompt_cards.insert(idx + 1, dup);
        info!("Duplicated card {} as {}", id, new_id);
        Ok(new_id)
    }

    /// Remove a card, returning it
    pub fn delete_card(&mut self, id: &str) -> Result<PromptCard, DocumentError> {
        debug!(%id, "PromptDocument::delete_card: called");
        let idx = self.position(id)?;
        if self.prompt_cards[idx].is_locked() {
            return Err(DocumentError::LockedCard {
                id: id.to_string(),
                action: "deleted",
            });
        }
        let card = self.prompt_cards.remove(idx);
        info!("Deleted card {}", id);
        Ok(card)
    }

    /// Flip a card's enabled flag, returning the new state
    pub fn toggle_card(&mut self, id: &str) -> Result<bool, DocumentError> {
        debug!(%id, "PromptDocument::toggle_card: called");
        let idx = self.position(id)?;
        let card = &mut self.prompt_cards[idx];
        if card.is_locked() {
            return Err(DocumentError::LockedCard {
                id: id.to_string(),
                action: "toggled",
            });
        }
        card.enabled = !card.enabled;
        card.touch();
        Ok(card.enabled)
    }

    /// Apply a patch to a card, coercing values into range
    ///
    /// Nothing is changed if any part of the patch is rejected. Returns the
    /// card's id after the patch.
    pub fn apply_patch(&mut self, id: &str, patch: CardPatch) -> Result<String, DocumentError> {
        debug!(%id, ?patch, "PromptDocument::apply_patch: called");
        let idx = self.position(id)?;

        if self.prompt_cards[idx].is_locked() && patch.edits_locked_fields() {
            return Err(DocumentError::LockedCard {
                id: id.to_string(),
                action: "edited",
            });
        }

        if let Some(content) = &patch.content {
            let len = content.chars().count();
            if len > CONTENT_MAX_LENGTH {
                return Err(DocumentError::ContentTooLong {
                    len,
                    max: CONTENT_MAX_LENGTH,
                });
            }
        }

        let new_id = patch.id.as_deref().map(coerce::normalize_id);
        if let Some(new_id) = &new_id
            && new_id != id
            && self.card(new_id).is_some()
        {
            return Err(DocumentError::DuplicateId { id: new_id.clone() });
        }

        let card = &mut self.prompt_cards[idx];
        if let Some(new_id) = new_id {
            card.id = new_id;
        }
        if let Some(name) = patch.name {
            card.name = name;
        }
        if let Some(content) = patch.content {
            card.content = content;
        }
        if let Some(role) = patch.role {
            card.role = role;
        }
        if let Some(placement) = patch.placement {
            card.placement = placement;
            if placement != Placement::History {
                card.history_depth = None;
            }
        }
        if let Some(depth) = patch.history_depth {
            if card.placement == Placement::History {
                card.history_depth = Some(coerce::clamp_history_depth(depth));
            } else {
                debug!("PromptDocument::apply_patch: ignoring history_depth on non-history card");
            }
        }
        if let Some(order_index) = patch.order_index {
            card.order_index = coerce::clamp_order_index(order_index);
        }
        if let Some(enabled) = patch.enabled {
            card.enabled = enabled;
        }
        card.touch();

        info!("Updated card {}", card.id);
        Ok(card.id.clone())
    }

    pub fn set_metadata(&mut self, patch: MetadataPatch) {
        debug!(?patch, "PromptDocument::set_metadata: called");
        self.metadata.apply(patch);
    }
}
