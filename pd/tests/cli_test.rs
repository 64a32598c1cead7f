//! Integration tests for the pd binary
//!
//! Each test runs in its own temp directory with XDG paths redirected there,
//! so logs, config lookups and the variable table never touch the real home.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::{TempDir, tempdir};

use promptdeck::PromptDocument;

const DECK: &str = r#"{
  "metadata": { "name": "Cli Deck", "temperature": 1.0 },
  "prompt_cards": [
    { "id": "persona", "name": "Persona", "content": "You are a guide.", "role": "system",
      "placement": "sequence", "history_depth": null, "order_index": 0, "enabled": true, "is_system": true },
    { "id": "rules", "name": "Rules", "content": "{{setvar::tone::dry}}Keep it short.", "role": "system",
      "placement": "sequence", "history_depth": null, "order_index": 1, "enabled": true, "is_system": false },
    { "id": "ask", "name": "Ask", "content": "Tone: {{getvar::tone}}", "role": "user",
      "placement": "sequence", "history_depth": null, "order_index": 2, "enabled": true, "is_system": false }
  ]
}"#;

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = tempdir().expect("Failed to create temp dir");
        fs::write(dir.path().join("deck.json"), DECK).expect("Failed to write deck");
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn deck(&self) -> PathBuf {
        self.path().join("deck.json")
    }

    fn vars(&self) -> PathBuf {
        self.path().join("vars.json")
    }

    fn pd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pd"));
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env("XDG_DATA_HOME", self.path().join("data"))
            .env("XDG_CONFIG_HOME", self.path().join("config"))
            .env("NO_COLOR", "1");
        cmd
    }

    fn load(&self) -> PromptDocument {
        PromptDocument::load(&self.deck()).expect("deck should load")
    }
}

#[test]
fn test_compose_prints_transcript() {
    let sb = Sandbox::new();
    sb.pd()
        .args(["compose", "deck.json", "--seed", "1", "--vars"])
        .arg(sb.vars())
        .assert()
        .success()
        .stdout("[1] SYSTEM:\nYou are a guide.\n\nKeep it short.\n\n[2] USER:\nTone: dry\n")
        .stderr(predicate::str::contains("/ 4000 chars"));

    let vars = fs::read_to_string(sb.vars()).expect("vars persisted");
    assert!(vars.contains("\"tone\": \"dry\""));
}

#[test]
fn test_compose_json_output() {
    let sb = Sandbox::new();
    let output = sb
        .pd()
        .args(["compose", "deck.json", "--format", "json", "--vars"])
        .arg(sb.vars())
        .output()
        .expect("run pd");
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(value["blocks"][0]["role"], "system");
    assert_eq!(value["blocks"][0]["card_ids"], serde_json::json!(["persona", "rules"]));
    assert_eq!(value["blocks"][1]["number"], 2);
}

#[test]
fn test_variables_persist_between_runs() {
    let sb = Sandbox::new();
    sb.pd()
        .args(["resolve", "{{setvar::hero::Ada}}", "--vars"])
        .arg(sb.vars())
        .assert()
        .success();

    sb.pd()
        .args(["resolve", "Hi {{getvar::hero}}", "--vars"])
        .arg(sb.vars())
        .assert()
        .success()
        .stdout("Hi Ada\n");

    sb.pd()
        .args(["vars", "--vars"])
        .arg(sb.vars())
        .assert()
        .success()
        .stdout(predicate::str::contains("hero = Ada"));

    sb.pd().args(["vars", "--clear", "--vars"]).arg(sb.vars()).assert().success();

    sb.pd()
        .args(["resolve", "Hi {{getvar::hero}}", "--vars"])
        .arg(sb.vars())
        .assert()
        .success()
        .stdout("Hi {{getvar::hero}}\n");
}

#[test]
fn test_reset_vars_starts_empty() {
    let sb = Sandbox::new();
    fs::write(sb.vars(), r#"{"stale": "yes"}"#).unwrap();

    sb.pd()
        .args(["compose", "deck.json", "--reset-vars", "--vars"])
        .arg(sb.vars())
        .assert()
        .success();

    let vars = fs::read_to_string(sb.vars()).unwrap();
    assert!(!vars.contains("stale"));
    assert!(vars.contains("tone"));
}

#[test]
fn test_list_shows_cards_in_order() {
    let sb = Sandbox::new();
    sb.pd()
        .args(["list", "deck.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("persona").and(predicate::str::contains("[locked]")));
}

#[test]
fn test_add_duplicate_delete() {
    let sb = Sandbox::new();

    sb.pd().args(["add", "deck.json"]).assert().success();
    let doc = sb.load();
    assert_eq!(doc.prompt_cards.len(), 4);
    assert_eq!(doc.prompt_cards[3].order_index, 3);

    sb.pd()
        .args(["duplicate", "deck.json", "rules"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rules_copy"));
    let doc = sb.load();
    assert_eq!(doc.prompt_cards[2].id, "rules_copy");
    assert_eq!(doc.prompt_cards[2].name, "Rules (copy)");

    sb.pd().args(["delete", "deck.json", "rules_copy"]).assert().success();
    assert!(sb.load().card("rules_copy").is_none());
}

#[test]
fn test_locked_card_rejected() {
    let sb = Sandbox::new();
    sb.pd()
        .args(["delete", "deck.json", "persona"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("locked"));
    assert!(sb.load().card("persona").is_some());
}

#[test]
fn test_set_fields() {
    let sb = Sandbox::new();
    sb.pd()
        .args([
            "set",
            "deck.json",
            "ask",
            "--content",
            "New question",
            "--role",
            "assistant",
            "--order",
            "20000",
            "--placement",
            "history",
            "--history-depth",
            "4",
        ])
        .assert()
        .success();

    let doc = sb.load();
    let card = doc.card("ask").unwrap();
    assert_eq!(card.content, "New question");
    assert_eq!(card.role, promptdeck::Role::Assistant);
    assert_eq!(card.order_index, 9999);
    assert_eq!(card.history_depth, Some(4));
}

#[test]
fn test_set_content_too_long() {
    let sb = Sandbox::new();
    let long = sb.path().join("long.txt");
    fs::write(&long, "x".repeat(4001)).unwrap();

    sb.pd()
        .args(["set", "deck.json", "ask", "--content-file"])
        .arg(&long)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("4001"));
}

#[test]
fn test_toggle_excludes_card_from_compose() {
    let sb = Sandbox::new();
    sb.pd()
        .args(["toggle", "deck.json", "ask"])
        .assert()
        .success()
        .stdout(predicate::str::contains("disabled"));

    sb.pd()
        .args(["compose", "deck.json", "--vars"])
        .arg(sb.vars())
        .assert()
        .success()
        .stdout("[1] SYSTEM:\nYou are a guide.\n\nKeep it short.\n");
}

#[test]
fn test_meta_and_export() {
    let sb = Sandbox::new();
    sb.pd()
        .args(["meta", "deck.json", "--name", "My Deck!", "--temperature", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Temperature: 2.00"));

    sb.pd()
        .args(["export", "deck.json", "--dir", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("My_Deck_.json"));

    let exported = PromptDocument::load(&sb.path().join("out").join("My_Deck_.json")).unwrap();
    assert_eq!(exported, sb.load());
}

#[test]
fn test_missing_metadata_fails() {
    let sb = Sandbox::new();
    fs::write(sb.path().join("bad.json"), r#"{"prompt_cards": []}"#).unwrap();
    sb.pd()
        .args(["list", "bad.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("metadata"));
}
