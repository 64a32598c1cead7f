//! PromptDeck - prompt card deck editor
//!
//! CLI entry point for editing decks and composing prompts.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use promptdeck::cli::{CardFields, Cli, Command, OutputFormat, get_log_path, metadata_patch};
use promptdeck::config::Config;
use promptdeck::domain::{CONTENT_MAX_LENGTH, PromptDocument};
use promptdeck::template::{Resolver, TemplateResolver, VariableTable};
use promptdeck::{DocumentError, compose};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!("pd starting");

    debug!(command = ?cli.command, "main: dispatching command");
    let result = match cli.command {
        Command::Compose {
            doc,
            seed,
            vars,
            reset_vars,
            format,
        } => cmd_compose(&config, &doc, seed, vars, reset_vars, format),
        Command::Resolve { text, seed, vars } => cmd_resolve(&config, &text, seed, vars),
        Command::List { doc, format } => cmd_list(&doc, format),
        Command::Show { doc, id } => cmd_show(&doc, &id),
        Command::Add { doc } => cmd_add(&doc),
        Command::Duplicate { doc, id } => cmd_duplicate(&doc, &id),
        Command::Delete { doc, id } => cmd_delete(&doc, &id),
        Command::Toggle { doc, id } => cmd_toggle(&doc, &id),
        Command::Set { doc, id, fields } => cmd_set(&doc, &id, fields),
        Command::Meta {
            doc,
            name,
            description,
            temperature,
        } => cmd_meta(&doc, name, description, temperature),
        Command::Export { doc, dir } => cmd_export(&doc, &dir),
        Command::Vars { vars, clear } => cmd_vars(&config, vars, clear),
    };

    if let Err(e) = &result
        && let Some(doc_err) = e.downcast_ref::<DocumentError>()
        && doc_err.is_edit_rejection()
    {
        eprintln!("{} {}", "✗".red(), doc_err);
        std::process::exit(2);
    }
    result
}

fn load_doc(path: &Path) -> Result<PromptDocument> {
    PromptDocument::load(path).context(format!("Failed to load {}", path.display()))
}

fn save_doc(doc: &PromptDocument, path: &Path) -> Result<()> {
    doc.save(path).context(format!("Failed to save {}", path.display()))
}

fn vars_path(config: &Config, override_path: Option<PathBuf>) -> PathBuf {
    override_path.unwrap_or_else(|| config.vars_file.clone())
}

/// Load the session variable table, honoring `persist-vars`
fn load_vars(config: &Config, path: &Path, reset: bool) -> Result<VariableTable> {
    if reset || !config.persist_vars {
        debug!(reset, persist = config.persist_vars, "load_vars: starting with empty table");
        return Ok(VariableTable::new());
    }
    VariableTable::load(path)
}

fn store_vars(config: &Config, path: &Path, vars: &VariableTable) -> Result<()> {
    if config.persist_vars {
        vars.save(path)?;
    }
    Ok(())
}

fn resolver_for(config: &Config, seed: Option<u64>) -> Box<dyn Resolver> {
    let options = config.resolver_options();
    match seed {
        Some(seed) => Box::new(TemplateResolver::seeded(seed).with_options(options)),
        None => Box::new(TemplateResolver::new().with_options(options)),
    }
}

fn cmd_compose(
    config: &Config,
    doc_path: &Path,
    seed: Option<u64>,
    vars_override: Option<PathBuf>,
    reset_vars: bool,
    format: OutputFormat,
) -> Result<()> {
    debug!(?doc_path, ?seed, reset_vars, %format, "cmd_compose: called");
    let doc = load_doc(doc_path)?;
    let path = vars_path(config, vars_override);
    let mut vars = load_vars(config, &path, reset_vars)?;

    let mut resolver = resolver_for(config, seed);
    let composition = compose::compose_blocks(&doc.prompt_cards, resolver.as_mut(), &mut vars);
    store_vars(config, &path, &vars)?;

    match format {
        OutputFormat::Text => {
            println!("{}", composition.text);
            eprintln!(
                "{}",
                format!("{} / {} chars", composition.char_count(), CONTENT_MAX_LENGTH).dimmed()
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&composition)?);
        }
    }
    info!(
        "Composed {} blocks ({} chars)",
        composition.blocks.len(),
        composition.char_count()
    );
    Ok(())
}

fn cmd_resolve(config: &Config, text: &str, seed: Option<u64>, vars_override: Option<PathBuf>) -> Result<()> {
    debug!(text_len = text.len(), ?seed, "cmd_resolve: called");
    let path = vars_path(config, vars_override);
    let mut vars = load_vars(config, &path, false)?;
    let out = resolver_for(config, seed).resolve(text, &mut vars);
    store_vars(config, &path, &vars)?;
    println!("{}", out);
    Ok(())
}

fn cmd_list(doc_path: &Path, format: OutputFormat) -> Result<()> {
    debug!(?doc_path, %format, "cmd_list: called");
    let doc = load_doc(doc_path)?;
    let cards = doc.cards_in_display_order();

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&cards)?);
        return Ok(());
    }

    if cards.is_empty() {
        println!("No cards found");
        return Ok(());
    }
    for card in cards {
        let state = if card.enabled { "on ".green() } else { "off".red() };
        let lock = if card.is_locked() { " [locked]".yellow().to_string() } else { String::new() };
        println!(
            "#{:<4} {} {:<9} {} {}{}",
            card.order_index,
            state,
            card.role.as_str(),
            card.id.cyan(),
            card.name,
            lock
        );
    }
    Ok(())
}

fn cmd_show(doc_path: &Path, id: &str) -> Result<()> {
    debug!(?doc_path, %id, "cmd_show: called");
    let doc = load_doc(doc_path)?;
    let card = doc
        .card(id)
        .ok_or_else(|| DocumentError::CardNotFound { id: id.to_string() })?;

    println!("{} {}", card.id.cyan(), card.name);
    println!("  Role:      {}", card.role);
    println!("  Placement: {}", card.placement);
    if let Some(depth) = card.history_depth {
        println!("  Depth:     {}", depth);
    }
    println!("  Order:     {}", card.order_index);
    println!("  Enabled:   {}", card.enabled);
    if card.is_locked() {
        println!("  Locked:    true");
    }
    println!("  Content:   {} / {} chars", card.content_len(), CONTENT_MAX_LENGTH);
    println!();
    println!("{}", card.content);
    Ok(())
}

fn cmd_add(doc_path: &Path) -> Result<()> {
    let mut doc = load_doc(doc_path)?;
    let id = doc.add_card();
    save_doc(&doc, doc_path)?;
    println!("{} Added card: {}", "✓".green(), id.cyan());
    Ok(())
}

fn cmd_duplicate(doc_path: &Path, id: &str) -> Result<()> {
    let mut doc = load_doc(doc_path)?;
    let new_id = doc.duplicate_card(id)?;
    save_doc(&doc, doc_path)?;
    println!("{} Duplicated {} as {}", "✓".green(), id, new_id.cyan());
    Ok(())
}

fn cmd_delete(doc_path: &Path, id: &str) -> Result<()> {
    let mut doc = load_doc(doc_path)?;
    let card = doc.delete_card(id)?;
    save_doc(&doc, doc_path)?;
    println!("{} Deleted card: {} ({})", "✓".green(), card.id, card.name);
    Ok(())
}

fn cmd_toggle(doc_path: &Path, id: &str) -> Result<()> {
    let mut doc = load_doc(doc_path)?;
    let enabled = doc.toggle_card(id)?;
    save_doc(&doc, doc_path)?;
    let state = if enabled { "enabled".green() } else { "disabled".red() };
    println!("{} {} is now {}", "✓".green(), id.cyan(), state);
    Ok(())
}

fn cmd_set(doc_path: &Path, id: &str, fields: CardFields) -> Result<()> {
    debug!(?doc_path, %id, "cmd_set: called");
    let content = match &fields.content_file {
        Some(path) => Some(fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?),
        None => None,
    };
    let patch = fields.into_patch(content);
    if patch.is_empty() {
        println!("Nothing to change");
        return Ok(());
    }

    let mut doc = load_doc(doc_path)?;
    let new_id = doc.apply_patch(id, patch)?;
    save_doc(&doc, doc_path)?;
    println!("{} Updated card: {}", "✓".green(), new_id.cyan());
    Ok(())
}

fn cmd_meta(doc_path: &Path, name: Option<String>, description: Option<String>, temperature: Option<f64>) -> Result<()> {
    let mut doc = load_doc(doc_path)?;
    let patch = metadata_patch(name, description, temperature);

    if !patch.is_empty() {
        doc.set_metadata(patch);
        save_doc(&doc, doc_path)?;
    }

    let meta = &doc.metadata;
    println!("Name:        {}", meta.name.as_deref().unwrap_or(""));
    println!("Description: {}", meta.description.as_deref().unwrap_or(""));
    println!("Temperature: {:.2}", meta.effective_temperature());
    Ok(())
}

fn cmd_export(doc_path: &Path, dir: &Path) -> Result<()> {
    debug!(?doc_path, ?dir, "cmd_export: called");
    let doc = load_doc(doc_path)?;
    fs::create_dir_all(dir).context(format!("Failed to create {}", dir.display()))?;
    let path = doc.export_to(dir)?;
    println!("{} Exported to: {}", "✓".green(), path.display());
    Ok(())
}

fn cmd_vars(config: &Config, vars_override: Option<PathBuf>, clear: bool) -> Result<()> {
    let path = vars_path(config, vars_override);
    let mut vars = VariableTable::load(&path)?;

    if clear {
        vars.clear();
        vars.save(&path)?;
        println!("{} Cleared variables", "✓".green());
        return Ok(());
    }

    if vars.is_empty() {
        println!("No variables set");
    } else {
        for (name, value) in vars.iter() {
            println!("{} = {}", name.yellow(), value);
        }
    }
    Ok(())
}
