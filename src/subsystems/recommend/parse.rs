//! Best-effort extraction of recommendation entries from generator text.
//!
//! The generator is asked for a layout but never guaranteed to follow it, so
//! every strategy returns whatever it could read plus a count of the
//! non-blank lines it could not place. Callers decide what a partial or
//! empty result means.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::ParseStrategy;

/// One recommended title with whatever details came with it.
/// All values are trimmed; empty values are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecommendationEntry {
    pub title: String,
    pub year: Option<String>,
    pub genre: Option<String>,
    pub rating: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    /// Entries in the order they appear in the text.
    pub entries: Vec<RecommendationEntry>,
    /// Non-blank lines not consumed by any entry.
    pub unparsed: usize,
}

pub fn parse(strategy: ParseStrategy, text: &str) -> ParseOutcome {
    match strategy {
        ParseStrategy::FirstLine => parse_first_line(text),
        ParseStrategy::Numbered => parse_numbered(text),
        ParseStrategy::Blocks => parse_blocks(text),
        ParseStrategy::Template => parse_template(text),
    }
}

// ── Strategies ────────────────────────────────────────────────────────────────

/// Title from the first non-blank line; everything after it is the reason.
fn parse_first_line(text: &str) -> ParseOutcome {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let Some(first) = lines.next() else {
        return ParseOutcome::default();
    };
    let rest: Vec<&str> = lines.collect();

    match title_from(first) {
        Some(title) => ParseOutcome {
            entries: vec![RecommendationEntry {
                title,
                reason: (!rest.is_empty()).then(|| rest.join("\n")),
                ..Default::default()
            }],
            unparsed: 0,
        },
        None => ParseOutcome { entries: Vec::new(), unparsed: 1 + rest.len() },
    }
}

/// `1. Title (1999) - reason` lines. Year and reason are optional.
fn parse_numbered(text: &str) -> ParseOutcome {
    static NUMBERED: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^\s*\d+[.)]\s+(.+)$").expect("numbered-line regex"));
    static TRAILING_YEAR: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(.*?)\s*\((\d{4})\)\s*$").expect("trailing-year regex"));

    let mut outcome = ParseOutcome::default();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let Some(body) = NUMBERED.captures(line).and_then(|c| c.get(1)) else {
            outcome.unparsed += 1;
            continue;
        };

        let (head, reason) = split_reason(body.as_str());
        let head = head.trim().trim_matches(|c: char| c == '*' || c == '_');
        let (title, year) = match TRAILING_YEAR.captures(head) {
            Some(c) => (c.get(1).map_or("", |m| m.as_str()), c.get(2).map(|m| m.as_str().to_string())),
            None => (head, None),
        };

        match clean(title) {
            Some(title) => outcome.entries.push(RecommendationEntry {
                title,
                year,
                reason: reason.and_then(clean),
                ..Default::default()
            }),
            None => outcome.unparsed += 1,
        }
    }
    outcome
}

/// Blank-line separated blocks read positionally:
/// title, year, genre, rating, reason. Single-line blocks are not entries.
fn parse_blocks(text: &str) -> ParseOutcome {
    const FIELDS: usize = 5;

    let mut outcome = ParseOutcome::default();
    for block in blocks(text) {
        if block.len() < 2 {
            outcome.unparsed += block.len();
            continue;
        }
        let Some(title) = title_from(block[0]) else {
            outcome.unparsed += block.len();
            continue;
        };
        let field = |i: usize| block.get(i).and_then(|l| value_from(l));
        outcome.entries.push(RecommendationEntry {
            title,
            year: field(1),
            genre: field(2),
            rating: field(3),
            reason: field(4),
        });
        outcome.unparsed += block.len().saturating_sub(FIELDS);
    }
    outcome
}

/// The literal five-label template the list prompt asks for:
///
/// ```text
/// Title: ...
/// Year: ...
/// Genre: ...
/// Rating: ...
/// Why: ...
/// ```
///
/// Labels may carry markdown bold and any line a list marker.
fn parse_template(text: &str) -> ParseOutcome {
    static TEMPLATE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(concat!(
            r"(?im)^[ \t]*(?:(?:\d+[.)]|[-•])[ \t]*)?\**title\**[ \t]*:(?P<title>[^\r\n]*)\r?\n",
            r"[ \t]*(?:(?:\d+[.)]|[-•])[ \t]*)?\**year\**[ \t]*:(?P<year>[^\r\n]*)\r?\n",
            r"[ \t]*(?:(?:\d+[.)]|[-•])[ \t]*)?\**genres?\**[ \t]*:(?P<genre>[^\r\n]*)\r?\n",
            r"[ \t]*(?:(?:\d+[.)]|[-•])[ \t]*)?\**rating\**[ \t]*:(?P<rating>[^\r\n]*)\r?\n",
            r"[ \t]*(?:(?:\d+[.)]|[-•])[ \t]*)?\**(?:why|reason)\**[ \t]*:(?P<reason>[^\r\n]*)",
        ))
        .expect("template regex")
    });

    let mut entries = Vec::new();
    for caps in TEMPLATE.captures_iter(text) {
        let field = |name: &str| caps.name(name).and_then(|m| clean(m.as_str()));
        let Some(title) = field("title") else { continue };
        entries.push(RecommendationEntry {
            title,
            year: field("year"),
            genre: field("genre"),
            rating: field("rating"),
            reason: field("reason"),
        });
    }

    // Every matched line carries a label, so matched regions are all non-blank.
    let non_blank = text.lines().filter(|l| !l.trim().is_empty()).count();
    ParseOutcome { unparsed: non_blank.saturating_sub(entries.len() * 5), entries }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Labels that introduce a title rather than being part of one.
const TITLE_LABELS: &[&str] = &[
    "title",
    "movie",
    "movie title",
    "movie name",
    "film",
    "name",
    "recommendation",
    "recommended movie",
];

fn blocks(text: &str) -> Vec<Vec<&str>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Strip a leading `1.`, `1)`, `-` or `•` list marker.
fn strip_marker(line: &str) -> &str {
    static MARKER: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^\s*(?:\d+[.)]|[-•])\s+").expect("list-marker regex"));
    match MARKER.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    }
}

/// Split `Label: value` when the part before the colon looks like a label.
fn split_label(line: &str) -> Option<(&str, &str)> {
    let (label, rest) = line.split_once(':')?;
    let label = label.trim().trim_matches(|c: char| c == '*' || c == '_').trim();
    let looks_like_label = !label.is_empty()
        && label.len() <= 24
        && label.chars().all(|c| c.is_alphabetic() || c == ' ');
    looks_like_label.then_some((label, rest))
}

/// Title from a line, dropping list markers and a known title label only,
/// so `Mission: Impossible` survives intact.
fn title_from(line: &str) -> Option<String> {
    let line = strip_marker(line);
    let value = match split_label(line) {
        Some((label, rest)) if TITLE_LABELS.contains(&label.to_lowercase().as_str()) => rest,
        _ => line,
    };
    clean(value)
}

/// Field value from a line, dropping list markers and any label.
fn value_from(line: &str) -> Option<String> {
    let line = strip_marker(line);
    let value = split_label(line).map_or(line, |(_, rest)| rest);
    clean(value)
}

/// Split `head - reason` on the first spaced dash of any width.
fn split_reason(body: &str) -> (&str, Option<&str>) {
    [" - ", " – ", " — "]
        .iter()
        .filter_map(|sep| body.find(sep).map(|i| (i, sep.len())))
        .min_by_key(|(i, _)| *i)
        .map_or((body, None), |(i, len)| (&body[..i], Some(&body[i + len..])))
}

/// Trim whitespace, markdown emphasis and quotes; `None` when nothing is left.
fn clean(value: &str) -> Option<String> {
    let cleaned =
        value.trim_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '_' | '`' | '"' | '“' | '”'));
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}
