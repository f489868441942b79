//! Parsing of the model's tagged free-text reply into a [`Report`].
//!
//! The model is asked to wrap each section in a pair of tags. Every
//! extractor here is total: a missing tag, an unknown rating or a stray
//! header line only yields empty or default values, never an error.

use crate::models::{
    Evaluation, Level, RatedItem, RatingLabel, Report, RiskRating, Status, StrengthRating,
};
use crate::utils::upcase;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Opening and closing markers of one tagged section.
pub type Tag = (&'static str, &'static str);

pub const AUDIT_TYPE_TAG: Tag = ("<AUDIT_TYPE>", "</AUDIT_TYPE>");
pub const EVALUATION_TAG: Tag = ("<EVALUATION>", "</EVALUATION>");
pub const STRENGTHS_TAG: Tag = ("<STRENGTHS>", "</STRENGTHS>");
pub const WEAKNESSES_TAG: Tag = ("<WEAKNESSES>", "</WEAKNESSES>");
pub const RECOMMENDATIONS_TAG: Tag = ("<RECOMMENDATIONS>", "</RECOMMENDATIONS>");
pub const SUMMARY_TAG: Tag = ("<SUMMARY>", "</SUMMARY>");

const BULLETS: [&str; 3] = ["- ", "• ", "* "];

/// Section titles the model sometimes repeats inside a rated section.
const RATED_HEADER_ECHOES: [&str; 4] = ["points forts", "failles", "strengths", "weaknesses"];

/// Section titles the model sometimes repeats inside a plain list.
const LIST_HEADER_ECHOES: [&str; 6] = [
    "points forts",
    "failles",
    "strengths",
    "weaknesses",
    "recommendations",
    "recommandations",
];

static RE_SCORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?:[.,]\d+)?\s*(?:/|sur|out of)\s*10\b")
        .expect("invalid regex: score")
});
static RE_NUMBERED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}[.)]\s+").expect("invalid regex: numbered marker"));
static RE_SPECIFIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:specific audit|audit spécifique)[: \t]*([\w \t]+)")
        .expect("invalid regex: specific audit")
});

/// Compiled forms of one rating label, covering all of its aliases.
#[derive(Debug, Clone)]
struct LabelPatterns {
    /// `Label: text`, also `**Label**:` and `**Label:**`. The label must not
    /// follow a letter or digit, so `Follow:` is not `Low:`.
    inline: Regex,
    /// `(Label)` or `[Label]`.
    bracket: Regex,
}

impl LabelPatterns {
    fn new(aliases: &[&str]) -> Self {
        let alternation = aliases
            .iter()
            .map(|a| regex::escape(a))
            .collect::<Vec<_>>()
            .join("|");
        Self {
            inline: Regex::new(&format!(r"(?i)(?:^|[\W_])(?:{alternation})[*_]*\s*:[*_]*"))
                .expect("invalid regex: inline rating"),
            bracket: Regex::new(&format!(r"(?i)[(\[]\s*(?:{alternation})\s*[)\]]"))
                .expect("invalid regex: bracket rating"),
        }
    }
}

/// Patterns for every strength and risk label, keyed by alias set.
static RATING_PATTERNS: Lazy<HashMap<&'static [&'static str], LabelPatterns>> = Lazy::new(|| {
    StrengthRating::ALL
        .iter()
        .map(|r| r.aliases())
        .chain(RiskRating::ALL.iter().map(|r| r.aliases()))
        .map(|aliases| (aliases, LabelPatterns::new(aliases)))
        .collect()
});

/// Word-bounded level patterns, in scan order.
static LEVEL_PATTERNS: Lazy<Vec<(Level, Regex)>> = Lazy::new(|| {
    Level::SCALE
        .into_iter()
        .map(|level| {
            let alternation = level
                .aliases()
                .iter()
                .map(|a| regex::escape(a))
                .collect::<Vec<_>>()
                .join("|");
            let re = Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))
                .expect("invalid regex: level");
            (level, re)
        })
        .collect()
});

fn patterns_for(aliases: &'static [&'static str]) -> Cow<'static, LabelPatterns> {
    match RATING_PATTERNS.get(aliases) {
        Some(patterns) => Cow::Borrowed(patterns),
        None => Cow::Owned(LabelPatterns::new(aliases)),
    }
}

/// Text strictly between the first `open` marker and the next `close` marker, trimmed.
///
/// Returns an empty string when either marker is missing or `close` only
/// appears before `open`.
pub fn extract_between(text: &str, open: &str, close: &str) -> String {
    let Some(start) = text.find(open).map(|i| i + open.len()) else {
        return String::new();
    };
    match text[start..].find(close) {
        Some(len) => text[start..start + len].trim().to_string(),
        None => String::new(),
    }
}

fn extract_tag(text: &str, (open, close): Tag) -> String {
    extract_between(text, open, close)
}

fn strip_bullet(line: &str) -> Option<&str> {
    BULLETS
        .iter()
        .find_map(|b| line.strip_prefix(b))
        .map(str::trim)
        .filter(|rest| !rest.is_empty())
}

fn tidy_item(text: &str) -> String {
    let text = text.trim();
    let text = strip_bullet(text).unwrap_or(text);
    text.trim_start_matches(['*', '_', ' '])
        .trim_end_matches([' ', '\t', '-', '–', ':', ','])
        .trim()
        .to_string()
}

/// Find the first rating (in caller order) named on `line`.
///
/// For each label, the inline form `Label: text` is tried before the
/// bracketed form `text (Label)` / `text [Label]`; the first label that
/// matches in either form wins.
fn match_rating<R: RatingLabel>(line: &str, ratings: &[R]) -> Option<(R, String)> {
    for &rating in ratings {
        let patterns = patterns_for(rating.aliases());

        if let Some(m) = patterns.inline.find(line) {
            return Some((rating, tidy_item(&line[m.end()..])));
        }
        if patterns.bracket.is_match(line) {
            return Some((rating, tidy_item(&patterns.bracket.replace(line, ""))));
        }
    }
    None
}

/// Split a section into items, attaching the first matching rating label.
///
/// Blank lines and lines echoing a section header are dropped; the rest
/// keep their input order.
pub fn extract_rated_items<R: RatingLabel>(text: &str, ratings: &[R]) -> Vec<RatedItem<R>> {
    let mut items = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let item = match match_rating(line, ratings) {
            Some((rating, text)) => RatedItem {
                text,
                rating: Some(rating),
            },
            None => RatedItem {
                text: strip_bullet(line).unwrap_or(line).to_string(),
                rating: None,
            },
        };

        let lowered = item.text.to_lowercase();
        if item.text.is_empty() || RATED_HEADER_ECHOES.iter().any(|h| lowered.contains(h)) {
            continue;
        }
        items.push(item);
    }

    items
}

/// Split a section into plain list entries, removing bullet or numbering markers.
pub fn extract_list_items(text: &str) -> Vec<String> {
    let mut items = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(rest) = strip_bullet(line) {
            items.push(rest.to_string());
            continue;
        }
        if let Some(m) = RE_NUMBERED.find(line) {
            let rest = line[m.end()..].trim();
            if !rest.is_empty() {
                items.push(rest.to_string());
                continue;
            }
        }
        let lowered = line.to_lowercase();
        if !LIST_HEADER_ECHOES.iter().any(|h| lowered.contains(h)) {
            items.push(line.to_string());
        }
    }

    items
}

/// Score out of ten (clamped, 0 when absent) and the first level word found.
pub fn parse_evaluation(eval_text: &str) -> Evaluation {
    let score = RE_SCORE
        .captures(eval_text)
        .and_then(|caps| caps[1].parse::<u8>().ok())
        .map(|s| s.min(10))
        .unwrap_or(0);

    let level = LEVEL_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(eval_text))
        .map(|(level, _)| *level)
        .unwrap_or(Level::Unspecified);

    Evaluation { score, level }
}

/// Guess the audit type from untagged prose when the model omitted the tag.
fn fallback_audit_type(analysis: &str) -> String {
    let lowered = analysis.to_lowercase();

    if ["comprehensive audit", "comprehensive security audit", "audit complet"]
        .iter()
        .any(|p| lowered.contains(p))
    {
        return "Comprehensive security audit".to_string();
    }

    if let Some(caps) = RE_SPECIFIC.captures(&lowered) {
        let domain = caps[1].trim();
        if !domain.is_empty() {
            return format!("Specific audit: {}", upcase(domain));
        }
    }
    if lowered.contains("specific audit") || lowered.contains("audit spécifique") {
        return "Specific audit".to_string();
    }

    "General security audit".to_string()
}

/// Assemble a success [`Report`] from the model's raw reply.
#[instrument(level = "debug", skip_all, fields(bytes = analysis.len()))]
pub fn parse_analysis(analysis: &str) -> Report {
    let mut audit_type = extract_tag(analysis, AUDIT_TYPE_TAG);
    if audit_type.is_empty() {
        audit_type = fallback_audit_type(analysis);
        debug!(%audit_type, "AUDIT_TYPE tag missing; used fallback");
    }

    let evaluation = parse_evaluation(&extract_tag(analysis, EVALUATION_TAG));
    let strengths =
        extract_rated_items(&extract_tag(analysis, STRENGTHS_TAG), &StrengthRating::ALL);
    let weaknesses = extract_rated_items(&extract_tag(analysis, WEAKNESSES_TAG), &RiskRating::ALL);
    let recommendations = extract_list_items(&extract_tag(analysis, RECOMMENDATIONS_TAG));
    let summary = extract_tag(analysis, SUMMARY_TAG);

    debug!(
        score = evaluation.score,
        level = ?evaluation.level,
        strengths = strengths.len(),
        weaknesses = weaknesses.len(),
        recommendations = recommendations.len(),
        "Parsed model reply"
    );

    Report {
        status: Status::Success,
        error: None,
        audit_type,
        evaluation,
        strengths,
        weaknesses,
        recommendations,
        summary,
    }
}
