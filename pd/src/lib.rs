//! PromptDeck - prompt card decks and prompt composition
//!
//! A deck is a JSON document holding an ordered set of prompt cards: text
//! fragments tagged with a role (system, user, assistant), a placement and an
//! order index. PromptDeck edits decks and composes their enabled cards into a
//! single prompt, resolving an embedded template mini-language along the way.
//!
//! # Modules
//!
//! - [`template`] - directive resolver and the session variable table
//! - [`compose`] - filtering, ordering and role-merging of cards
//! - [`domain`] - document, card and metadata types plus editing operations
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface
//!
//! # Example
//!
//! ```
//! use promptdeck::compose::compose;
//! use promptdeck::domain::{PromptCard, Role};
//! use promptdeck::template::{TemplateResolver, VariableTable};
//!
//! let cards = vec![
//!     PromptCard::new("intro").with_content("{{setvar::name::Rin}}You are {{getvar::name}}."),
//!     PromptCard::new("ask").with_role(Role::User).with_order(1).with_content("Hello!"),
//! ];
//! let mut vars = VariableTable::new();
//! let prompt = compose(&cards, &mut TemplateResolver::seeded(1), &mut vars);
//! assert_eq!(prompt, "[1] SYSTEM:\nYou are Rin.\n\n[2] USER:\nHello!");
//! ```

pub mod cli;
pub mod compose;
pub mod config;
pub mod domain;
mod error;
pub mod template;

pub use compose::{Composition, RoleBlock};
pub use config::Config;
pub use domain::{CardPatch, Metadata, MetadataPatch, Placement, PromptCard, PromptDocument, Role, Timestamp};
pub use error::DocumentError;
pub use template::{Resolver, ResolverOptions, TemplateResolver, VariableTable};
