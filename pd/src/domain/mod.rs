//! Domain types for PromptDeck
//!
//! A prompt document is a metadata block plus an ordered list of prompt cards.
//! Everything here is plain data with serde support; unknown JSON fields are
//! carried through so export never loses data.

pub mod coerce;
mod card;
mod document;
mod edit;
mod metadata;

pub use card::{CONTENT_MAX_LENGTH, LOCKED_IDS, Placement, PromptCard, Role, Timestamp};
pub use document::{DEFAULT_EXPORT_NAME, PromptDocument};
pub use edit::CardPatch;
pub use metadata::{Metadata, MetadataPatch};
