//! Template Resolver
//!
//! Rewrites one card's content by running a fixed sequence of passes:
//!
//! 1. record `{{setvar::NAME::VALUE}}` definitions into the variable table
//! 2. substitute `{{getvar::NAME}}`
//! 3. pick from `{{random::a::b::c}}`
//! 4. pick from `{{random:a,b,c}}`
//! 5. roll `{{roll:XdY}}`
//! 6. strip the `setvar` markers
//! 7. unescape `{{` / `}}` to single braces
//! 8. collapse runs of three or more newlines to one blank line
//!
//! Each pass is a plain function over `&str` returning a new `String`. Matching
//! is single-pass and non-recursive: text produced by one substitution is never
//! re-scanned by the same pass.
//!
//! A directive that is recognized but cannot be resolved (unknown variable,
//! empty option list, zero-sided dice) is kept verbatim, double braces included.
//! The kept byte ranges travel beside the text through the remaining passes, and
//! brace unescaping skips them. Only syntax no pass recognizes is exposed through
//! the unescaping.

use std::ops::Range;
use std::sync::LazyLock;

use rand::rngs::{StdRng, ThreadRng};
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use regex::{Captures, Regex};
use tracing::debug;

use super::vars::VariableTable;

/// Default upper bound on the dice count of a single `{{roll:XdY}}`
pub const DEFAULT_MAX_DICE: u32 = 1000;

static SETVAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{setvar::([^:}]+)::((?s:.*?))\}\}").expect("valid regex"));
static GETVAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{getvar::([^}]+)\}\}").expect("valid regex"));
static RANDOM_LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{random::([^}]+)\}\}").expect("valid regex"));
static RANDOM_CSV_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{random:([^}]+)\}\}").expect("valid regex"));
static ROLL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{roll:([0-9]+)d([0-9]+)\}\}").expect("valid regex"));
static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Resolves directives in a single piece of text
///
/// The Composer only depends on this trait, so callers can swap in a
/// deterministic or instrumented resolver.
pub trait Resolver {
    /// Resolve `text`, reading and writing variables in `vars`
    fn resolve(&mut self, text: &str, vars: &mut VariableTable) -> String;
}

/// Tunables for [`TemplateResolver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Rolls with more dice than this are left unresolved
    pub max_dice: u32,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            max_dice: DEFAULT_MAX_DICE,
        }
    }
}

/// The standard directive pipeline, driven by a random source `R`
#[derive(Debug, Clone)]
pub struct TemplateResolver<R = ThreadRng> {
    rng: R,
    options: ResolverOptions,
}

impl TemplateResolver<ThreadRng> {
    /// Resolver backed by the thread-local RNG
    pub fn new() -> Self {
        debug!("TemplateResolver::new: called");
        Self::with_rng(rand::rng())
    }
}

impl Default for TemplateResolver<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateResolver<StdRng> {
    /// Deterministic resolver: the same seed yields the same choices and rolls
    pub fn seeded(seed: u64) -> Self {
        debug!(seed, "TemplateResolver::seeded: called");
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> TemplateResolver<R> {
    /// Resolver drawing from a caller-supplied RNG, with default options
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            options: ResolverOptions::default(),
        }
    }

    /// Replace the options, keeping the RNG
    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        debug!(?options, "TemplateResolver::with_options: called");
        self.options = options;
        self
    }

    /// Options currently in effect
    pub fn options(&self) -> ResolverOptions {
        self.options
    }
}

impl<R: Rng> Resolver for TemplateResolver<R> {
    fn resolve(&mut self, text: &str, vars: &mut VariableTable) -> String {
        debug!(text_len = text.len(), "TemplateResolver::resolve: called");
        if text.is_empty() {
            return String::new();
        }

        record_setvars(text, vars);
        let draft = Draft::new(text);
        let draft = getvar_pass(draft, vars);
        let draft = random_pass(draft, &RANDOM_LIST_RE, "::", &mut self.rng);
        let draft = random_pass(draft, &RANDOM_CSV_RE, ",", &mut self.rng);
        let draft = roll_pass(draft, &mut self.rng, self.options.max_dice);
        let draft = draft.replace(&SETVAR_RE, |_| Some(String::new()));
        collapse_blank_lines(&draft.unescape())
    }
}

/// Text between passes plus the byte ranges of directives kept verbatim
#[derive(Debug)]
struct Draft {
    text: String,
    kept: Vec<Range<usize>>,
}

impl Draft {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            kept: Vec::new(),
        }
    }

    /// Replace each match of `re`; `f` returning `None` keeps the match verbatim
    ///
    /// Previously kept ranges are shifted to their new offsets, and dropped when
    /// a replacement overlaps them.
    fn replace<F>(self, re: &Regex, mut f: F) -> Self
    where
        F: FnMut(&Captures) -> Option<String>,
    {
        let mut text = String::with_capacity(self.text.len());
        let mut kept = Vec::new();
        // (replaced range in the old text, length of its replacement)
        let mut edits: Vec<(Range<usize>, usize)> = Vec::new();
        let mut last = 0;

        for caps in re.captures_iter(&self.text) {
            let Some(m) = caps.get(0) else { continue };
            text.push_str(&self.text[last..m.start()]);
            match f(&caps) {
                Some(replacement) => {
                    edits.push((m.range(), replacement.len()));
                    text.push_str(&replacement);
                }
                None => {
                    kept.push(text.len()..text.len() + m.len());
                    text.push_str(m.as_str());
                }
            }
            last = m.end();
        }
        text.push_str(&self.text[last..]);

        for span in self.kept {
            if edits.iter().any(|(r, _)| r.start < span.end && span.start < r.end) {
                continue;
            }
            let len = span.end - span.start;
            let start = shift(span.start, &edits);
            kept.push(start..start + len);
        }
        Self { text, kept }
    }

    /// Unescape braces everywhere except the kept ranges
    fn unescape(self) -> String {
        let mut kept = self.kept;
        kept.sort_by_key(|r| r.start);

        let mut out = String::with_capacity(self.text.len());
        let mut last = 0;
        for span in kept {
            if span.end <= last {
                continue;
            }
            let start = span.start.max(last);
            out.push_str(&unescape_braces(&self.text[last..start]));
            out.push_str(&self.text[start..span.end]);
            last = span.end;
        }
        out.push_str(&unescape_braces(&self.text[last..]));
        out
    }
}

/// New offset of `pos`, given the edits made before it
fn shift(pos: usize, edits: &[(Range<usize>, usize)]) -> usize {
    edits
        .iter()
        .take_while(|(r, _)| r.end <= pos)
        .fold(pos, |p, (r, len)| p - (r.end - r.start) + len)
}

fn getvar_pass(draft: Draft, vars: &VariableTable) -> Draft {
    draft.replace(&GETVAR_RE, |caps| {
        let name = caps[1].trim();
        let value = vars.get(name).map(str::to_string);
        if value.is_none() {
            debug!(%name, "substitute_getvars: unknown variable");
        }
        value
    })
}

fn random_pass<R: Rng>(draft: Draft, re: &Regex, separator: &str, rng: &mut R) -> Draft {
    draft.replace(re, |caps| {
        let options: Vec<&str> = caps[1]
            .split(separator)
            .map(str::trim)
            .filter(|opt| !opt.is_empty())
            .collect();
        options.choose(&mut *rng).map(|choice| choice.to_string())
    })
}

fn roll_pass<R: Rng>(draft: Draft, rng: &mut R, max_dice: u32) -> Draft {
    draft.replace(&ROLL_RE, |caps| {
        let count = caps[1].parse::<u32>().ok();
        let sides = caps[2].parse::<u32>().ok();
        match (count, sides) {
            (Some(count), Some(sides)) if count > 0 && sides > 0 && count <= max_dice => {
                let total: u64 = (0..count).map(|_| u64::from(rng.random_range(1..=sides))).sum();
                Some(total.to_string())
            }
            _ => {
                debug!(directive = %&caps[0], "roll_dice: leaving roll unresolved");
                None
            }
        }
    })
}

/// Pass 1: record every `setvar` in order of appearance
pub fn record_setvars(text: &str, vars: &mut VariableTable) {
    for caps in SETVAR_RE.captures_iter(text) {
        let name = caps[1].trim();
        let value = caps.get(2).map_or("", |m| m.as_str());
        debug!(%name, "record_setvars: setting variable");
        vars.set(name, value);
    }
}

/// Pass 2: replace `getvar` with the stored value, keeping unknown names verbatim
pub fn substitute_getvars(text: &str, vars: &VariableTable) -> String {
    getvar_pass(Draft::new(text), vars).text
}

/// Pass 3: `{{random::a::b}}`
pub fn pick_random_list<R: Rng>(text: &str, rng: &mut R) -> String {
    random_pass(Draft::new(text), &RANDOM_LIST_RE, "::", rng).text
}

/// Pass 4: `{{random:a,b}}`
pub fn pick_random_csv<R: Rng>(text: &str, rng: &mut R) -> String {
    random_pass(Draft::new(text), &RANDOM_CSV_RE, ",", rng).text
}

/// Pass 5: `{{roll:XdY}}` becomes the sum of X rolls of a Y-sided die
pub fn roll_dice<R: Rng>(text: &str, rng: &mut R, max_dice: u32) -> String {
    roll_pass(Draft::new(text), rng, max_dice).text
}

/// Pass 6: drop `setvar` markers, they have no visible output
pub fn strip_setvars(text: &str) -> String {
    SETVAR_RE.replace_all(text, "").into_owned()
}

/// Pass 7: `{{` to `{` and `}}` to `}`
pub fn unescape_braces(text: &str) -> String {
    text.replace("{{", "{").replace("}}", "}")
}

/// Pass 8: at most one blank line between paragraphs
pub fn collapse_blank_lines(text: &str) -> String {
    BLANK_RUN_RE.replace_all(text, "\n\n").into_owned()
}
