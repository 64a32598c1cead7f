//! CLI argument parsing for pd

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::domain::{CardPatch, MetadataPatch, Placement, Role};

/// PromptDeck - edit prompt card decks and compose them into one prompt
#[derive(Parser, Debug)]
#[command(name = "pd")]
#[command(author, version, about = "Prompt card deck editor and composer", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compose the enabled cards of a deck into one prompt
    Compose {
        /// Deck JSON file
        #[arg(required = true)]
        doc: PathBuf,

        /// Seed for random choices and dice rolls
        #[arg(short, long)]
        seed: Option<u64>,

        /// Variable table file (overrides config)
        #[arg(long)]
        vars: Option<PathBuf>,

        /// Clear the variable table before composing
        #[arg(long)]
        reset_vars: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Resolve directives in a single piece of text
    Resolve {
        /// Template text
        #[arg(required = true)]
        text: String,

        /// Seed for random choices and dice rolls
        #[arg(short, long)]
        seed: Option<u64>,

        /// Variable table file (overrides config)
        #[arg(long)]
        vars: Option<PathBuf>,
    },

    /// List cards in order
    List {
        /// Deck JSON file
        #[arg(required = true)]
        doc: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show one card
    Show {
        /// Deck JSON file
        #[arg(required = true)]
        doc: PathBuf,

        /// Card id
        #[arg(required = true)]
        id: String,
    },

    /// Append a new blank card
    Add {
        /// Deck JSON file
        #[arg(required = true)]
        doc: PathBuf,
    },

    /// Copy a card, placing the copy right after it
    Duplicate {
        /// Deck JSON file
        #[arg(required = true)]
        doc: PathBuf,

        /// Card id
        #[arg(required = true)]
        id: String,
    },

    /// Delete a card
    Delete {
        /// Deck JSON file
        #[arg(required = true)]
        doc: PathBuf,

        /// Card id
        #[arg(required = true)]
        id: String,
    },

    /// Enable or disable a card
    Toggle {
        /// Deck JSON file
        #[arg(required = true)]
        doc: PathBuf,

        /// Card id
        #[arg(required = true)]
        id: String,
    },

    /// Edit card fields
    Set {
        /// Deck JSON file
        #[arg(required = true)]
        doc: PathBuf,

        /// Card id
        #[arg(required = true)]
        id: String,

        #[command(flatten)]
        fields: CardFields,
    },

    /// Edit template metadata
    Meta {
        /// Deck JSON file
        #[arg(required = true)]
        doc: PathBuf,

        /// Template name
        #[arg(long)]
        name: Option<String>,

        /// Template description
        #[arg(long)]
        description: Option<String>,

        /// Sampling temperature (0.00 - 2.00)
        #[arg(long)]
        temperature: Option<f64>,
    },

    /// Write the deck under a file name derived from its template name
    Export {
        /// Deck JSON file
        #[arg(required = true)]
        doc: PathBuf,

        /// Output directory (default: current directory)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Show or clear the persisted variable table
    Vars {
        /// Variable table file (overrides config)
        #[arg(long)]
        vars: Option<PathBuf>,

        /// Remove all variables
        #[arg(long)]
        clear: bool,
    },
}

/// Card fields editable from the command line
#[derive(clap::Args, Debug, Default)]
pub struct CardFields {
    /// New id (whitespace becomes '_', other symbols are dropped)
    #[arg(long = "id")]
    pub new_id: Option<String>,

    /// Display name
    #[arg(long)]
    pub name: Option<String>,

    /// Content text
    #[arg(long, conflicts_with = "content_file")]
    pub content: Option<String>,

    /// Read content from a file
    #[arg(long)]
    pub content_file: Option<PathBuf>,

    /// Role (system, user, assistant)
    #[arg(long)]
    pub role: Option<Role>,

    /// Placement (sequence, history, summary)
    #[arg(long)]
    pub placement: Option<Placement>,

    /// History depth (0 - 999, history placement only)
    #[arg(long, allow_negative_numbers = true)]
    pub history_depth: Option<i64>,

    /// Order index (0 - 9999)
    #[arg(long, allow_negative_numbers = true)]
    pub order: Option<i64>,

    /// Enabled flag
    #[arg(long)]
    pub enabled: Option<bool>,
}

impl CardFields {
    /// Build a patch, with content already read from `--content-file` if given
    pub fn into_patch(self, content: Option<String>) -> CardPatch {
        debug!(?self, "CardFields::into_patch: called");
        CardPatch {
            id: self.new_id,
            name: self.name,
            content: content.or(self.content),
            role: self.role,
            placement: self.placement,
            history_depth: self.history_depth,
            order_index: self.order,
            enabled: self.enabled,
        }
    }
}

/// Build a metadata patch from `meta` arguments
pub fn metadata_patch(name: Option<String>, description: Option<String>, temperature: Option<f64>) -> MetadataPatch {
    MetadataPatch {
        name,
        description,
        temperature,
    }
}

/// Output format for compose/list commands
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => {
                debug!("OutputFormat::from_str: matched Text");
                Ok(Self::Text)
            }
            "json" => {
                debug!("OutputFormat::from_str: matched Json");
                Ok(Self::Json)
            }
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text or json", s))
            }
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Path to the log file
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("promptdeck")
        .join("logs")
        .join("promptdeck.log")
}
