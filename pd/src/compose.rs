//! Composer
//!
//! Flattens a deck into a single transcript-style prompt:
//!
//! 1. keep enabled cards
//! 2. stable sort by `order_index`
//! 3. resolve each card's content and trim it
//! 4. drop cards that resolve to nothing
//! 5. merge consecutive cards of the same role under one numbered header
//!
//! ```text
//! [1] SYSTEM:
//! first system card
//!
//! second system card
//!
//! [2] USER:
//! user card
//! ```
//!
//! Cards are only read, never modified.

use serde::Serialize;
use tracing::debug;

use crate::domain::{PromptCard, Role};
use crate::template::{Resolver, VariableTable};

/// Separator between emitted blocks
const BLOCK_SEPARATOR: &str = "\n\n";

/// A run of consecutive composed cards sharing a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleBlock {
    /// 1-based header number
    pub number: usize,
    pub role: Role,
    /// Cards merged into this block, in output order
    pub card_ids: Vec<String>,
}

/// Result of composing a deck
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Composition {
    pub text: String,
    pub blocks: Vec<RoleBlock>,
}

impl Composition {
    /// Length of the composed text in characters
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Compose `cards` into one prompt string
pub fn compose<R: Resolver + ?Sized>(cards: &[PromptCard], resolver: &mut R, vars: &mut VariableTable) -> String {
    compose_blocks(cards, resolver, vars).text
}

/// Compose `cards`, also reporting which cards landed in which role block
pub fn compose_blocks<R: Resolver + ?Sized>(
    cards: &[PromptCard],
    resolver: &mut R,
    vars: &mut VariableTable,
) -> Composition {
    debug!(cards = cards.len(), "compose_blocks: called");

    let mut enabled: Vec<&PromptCard> = cards.iter().filter(|c| c.enabled).collect();
    enabled.sort_by_key(|c| c.order_index);
    debug!(enabled = enabled.len(), "compose_blocks: filtered and sorted");

    let mut parts: Vec<String> = Vec::new();
    let mut blocks: Vec<RoleBlock> = Vec::new();
    let mut last_role: Option<Role> = None;

    for card in enabled {
        let resolved = resolver.resolve(&card.content, vars);
        let resolved = resolved.trim();
        if resolved.is_empty() {
            debug!(id = %card.id, "compose_blocks: card resolved to nothing, skipping");
            continue;
        }

        match blocks.last_mut() {
            Some(block) if last_role == Some(card.role) => {
                block.card_ids.push(card.id.clone());
                parts.push(resolved.to_string());
            }
            _ => {
                let number = blocks.len() + 1;
                debug!(id = %card.id, number, role = %card.role, "compose_blocks: starting block");
                parts.push(format!("[{}] {}:\n{}", number, card.role.label(), resolved));
                blocks.push(RoleBlock {
                    number,
                    role: card.role,
                    card_ids: vec![card.id.clone()],
                });
                last_role = Some(card.role);
            }
        }
    }

    let text = parts.join(BLOCK_SEPARATOR);
    debug!(blocks = blocks.len(), text_len = text.len(), "compose_blocks: done");
    Composition { text, blocks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateResolver;

    fn card(id: &str, role: Role, order: u16, content: &str) -> PromptCard {
        PromptCard::new(id).with_role(role).with_order(order).with_content(content)
    }

    fn run(cards: &[PromptCard]) -> String {
        let mut vars = VariableTable::new();
        compose(cards, &mut TemplateResolver::seeded(11), &mut vars)
    }

    /// Resolver that records the order it was called in and echoes input
    struct Recording(Vec<String>);

    impl Resolver for Recording {
        fn resolve(&mut self, text: &str, _vars: &mut VariableTable) -> String {
            self.0.push(text.to_string());
            text.to_string()
        }
    }

    #[test]
    fn test_same_role_cards_merge() {
        let cards = vec![
            card("a", Role::System, 0, "A"),
            card("b", Role::System, 1, "B"),
            card("c", Role::User, 2, "C"),
        ];
        assert_eq!(run(&cards), "[1] SYSTEM:\nA\n\nB\n\n[2] USER:\nC");
    }

    #[test]
    fn test_role_change_back_starts_new_block() {
        let cards = vec![
            card("a", Role::System, 0, "A"),
            card("b", Role::User, 1, "B"),
            card("c", Role::System, 2, "C"),
            card("d", Role::Assistant, 3, "D"),
        ];
        assert_eq!(
            run(&cards),
            "[1] SYSTEM:\nA\n\n[2] USER:\nB\n\n[3] SYSTEM:\nC\n\n[4] ASSISTANT:\nD"
        );
    }

    #[test]
    fn test_sorts_by_order_index_stably() {
        let cards = vec![
            card("late", Role::User, 9, "late"),
            card("tie1", Role::System, 2, "first tie"),
            card("tie2", Role::System, 2, "second tie"),
            card("early", Role::System, 1, "early"),
        ];
        assert_eq!(
            run(&cards),
            "[1] SYSTEM:\nearly\n\nfirst tie\n\nsecond tie\n\n[2] USER:\nlate"
        );
    }

    #[test]
    fn test_disabled_card_is_absent() {
        let cards = vec![
            card("a", Role::System, 0, "A"),
            card("u", Role::User, 1, "hidden").with_enabled(false),
            card("b", Role::System, 2, "B"),
        ];
        assert_eq!(run(&cards), "[1] SYSTEM:\nA\n\nB");
    }

    #[test]
    fn test_blank_cards_dropped_without_numbering() {
        let cards = vec![
            card("a", Role::User, 0, "   \n  "),
            card("b", Role::System, 1, "{{setvar::x::1}}"),
            card("c", Role::User, 2, "  C  "),
        ];
        assert_eq!(run(&cards), "[1] USER:\nC");
    }

    #[test]
    fn test_empty_deck() {
        assert_eq!(run(&[]), "");
        let cards = vec![card("a", Role::System, 0, "x").with_enabled(false)];
        assert_eq!(run(&cards), "");
    }

    #[test]
    fn test_variables_flow_across_cards() {
        let cards = vec![
            card("def", Role::System, 0, "{{setvar::hero::Rin}}"),
            card("use", Role::User, 1, "I am {{getvar::hero}}."),
        ];
        let mut vars = VariableTable::new();
        let out = compose(&cards, &mut TemplateResolver::seeded(0), &mut vars);
        assert_eq!(out, "[1] USER:\nI am Rin.");
        assert_eq!(vars.get("hero"), Some("Rin"));
    }

    #[test]
    fn test_variables_persist_across_runs() {
        let mut vars = VariableTable::new();
        let mut resolver = TemplateResolver::seeded(0);

        let first = vec![card("def", Role::System, 0, "{{setvar::mood::grim}}")];
        compose(&first, &mut resolver, &mut vars);

        let second = vec![card("use", Role::System, 0, "Mood: {{getvar::mood}}")];
        assert_eq!(compose(&second, &mut resolver, &mut vars), "[1] SYSTEM:\nMood: grim");
    }

    #[test]
    fn test_resolver_called_in_sort_order_for_enabled_only() {
        let cards = vec![
            card("b", Role::System, 5, "second"),
            card("x", Role::System, 0, "skipped").with_enabled(false),
            card("a", Role::System, 1, "first"),
        ];
        let mut recording = Recording(Vec::new());
        let mut vars = VariableTable::new();
        compose(&cards, &mut recording, &mut vars);
        assert_eq!(recording.0, vec!["first", "second"]);
    }

    #[test]
    fn test_cards_not_mutated() {
        let cards = vec![
            card("b", Role::System, 5, "B"),
            card("a", Role::User, 1, "A").with_enabled(false),
        ];
        let before = cards.clone();
        run(&cards);
        assert_eq!(cards, before);
    }

    #[test]
    fn test_blocks_report_members() {
        let cards = vec![
            card("a", Role::System, 0, "A"),
            card("b", Role::System, 1, "B"),
            card("c", Role::User, 2, "C"),
        ];
        let mut vars = VariableTable::new();
        let composition = compose_blocks(&cards, &mut TemplateResolver::seeded(0), &mut vars);
        assert_eq!(composition.blocks.len(), 2);
        assert_eq!(composition.blocks[0].card_ids, vec!["a", "b"]);
        assert_eq!(composition.blocks[1].number, 2);
        assert_eq!(composition.blocks[1].role, Role::User);
        assert_eq!(composition.char_count(), composition.text.chars().count());
    }

    #[test]
    fn test_resolved_blank_lines_collapse() {
        let cards = vec![card("a", Role::System, 0, "one\n\n\n\ntwo")];
        assert_eq!(run(&cards), "[1] SYSTEM:\none\n\ntwo");
    }
}
