//! Data models for audit analysis and scraped news articles.
//!
//! This module defines the core data structures used throughout the application:
//! - [`ResponseMap`]: Ordered question/answer pairs submitted for analysis
//! - [`AuditType`]: Classification of the questionnaire by security domain
//! - [`Report`]: Structured result assembled from the model's tagged reply
//! - [`RatedItem`]: A strength or weakness with its optional rating label
//! - [`ElectionArticle`]: A scraped political article that matched the keyword filter
//!
//! Rating and level enums accept both English and French spellings when
//! parsing model output, but always serialize with their English names.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Ordered mapping from question text to answer text.
///
/// Insertion order is the order in which the caller supplied the pairs, so
/// the prompt lists questions exactly as they were asked. Non-string answers
/// (booleans, numbers) are rendered with their JSON representation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct ResponseMap {
    entries: Vec<(String, String)>,
}

impl ResponseMap {
    /// Iterate over `(question, answer)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(q, a)| (q.as_str(), a.as_str()))
    }

    /// Iterate over the question texts only.
    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(q, _)| q.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Map<String, Value>> for ResponseMap {
    fn from(map: Map<String, Value>) -> Self {
        let entries = map
            .into_iter()
            .map(|(question, answer)| {
                let answer = match answer {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (question, answer)
            })
            .collect();
        Self { entries }
    }
}

impl<Q, A> FromIterator<(Q, A)> for ResponseMap
where
    Q: Into<String>,
    A: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (Q, A)>>(iter: I) -> Self {
        let mut entries: Vec<(String, String)> = Vec::new();
        for (q, a) in iter {
            let q = q.into();
            // Keys stay unique: a repeated question replaces the earlier answer in place.
            match entries.iter_mut().find(|(existing, _)| *existing == q) {
                Some(slot) => slot.1 = a.into(),
                None => entries.push((q, a.into())),
            }
        }
        Self { entries }
    }
}

/// Request body accepted by `analyze`: either `{"responses": {...}}` or a bare map.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AuditRequest {
    Wrapped { responses: ResponseMap },
    Bare(ResponseMap),
}

impl AuditRequest {
    pub fn into_responses(self) -> ResponseMap {
        match self {
            AuditRequest::Wrapped { responses } => responses,
            AuditRequest::Bare(responses) => responses,
        }
    }
}

/// Classification of a questionnaire derived from its question texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditType {
    /// Three or more security domains are covered.
    Comprehensive,
    /// One domain dominates; carries that domain's display name.
    Specific(String),
    /// No domain keyword matched at all.
    General,
}

impl fmt::Display for AuditType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditType::Comprehensive => write!(f, "Comprehensive security audit"),
            AuditType::Specific(domain) => write!(f, "Specific audit: {domain}"),
            AuditType::General => write!(f, "General security audit"),
        }
    }
}

/// A fixed rating vocabulary that can be recognised in free text.
pub trait RatingLabel: Copy + 'static {
    /// Lower-case spellings that identify this label in model output.
    fn aliases(&self) -> &'static [&'static str];
}

/// Importance attached to a security strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrengthRating {
    Strong,
    Medium,
    Weak,
}

impl StrengthRating {
    pub const ALL: [StrengthRating; 3] = [
        StrengthRating::Strong,
        StrengthRating::Medium,
        StrengthRating::Weak,
    ];
}

impl RatingLabel for StrengthRating {
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            StrengthRating::Strong => &["strong", "fort"],
            StrengthRating::Medium => &["medium", "moyen"],
            StrengthRating::Weak => &["weak", "faible"],
        }
    }
}

/// Risk level attached to a vulnerability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskRating {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskRating {
    pub const ALL: [RiskRating; 4] = [
        RiskRating::Critical,
        RiskRating::High,
        RiskRating::Medium,
        RiskRating::Low,
    ];
}

impl RatingLabel for RiskRating {
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            RiskRating::Critical => &["critical", "critique"],
            RiskRating::High => &["high", "élevé", "eleve"],
            RiskRating::Medium => &["medium", "moyen"],
            RiskRating::Low => &["low", "faible"],
        }
    }
}

/// Overall security level of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Critical,
    Low,
    Medium,
    Good,
    Excellent,
    /// The evaluation section named no known level.
    Unspecified,
    /// No evaluation could be produced because the model call failed.
    Unknown,
}

impl Level {
    /// Levels in the order they are scanned for; the first hit wins.
    pub const SCALE: [Level; 5] = [
        Level::Critical,
        Level::Low,
        Level::Medium,
        Level::Good,
        Level::Excellent,
    ];

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Level::Critical => &["critical", "critique"],
            Level::Low => &["low", "faible"],
            Level::Medium => &["medium", "moyen"],
            Level::Good => &["good", "bon"],
            Level::Excellent => &["excellent"],
            Level::Unspecified | Level::Unknown => &[],
        }
    }
}

/// Score out of ten plus the qualitative level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: u8,
    pub level: Level,
}

/// One strength or weakness line from the model's reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatedItem<R> {
    pub text: String,
    pub rating: Option<R>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Structured audit report returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub audit_type: String,
    pub evaluation: Evaluation,
    pub strengths: Vec<RatedItem<StrengthRating>>,
    pub weaknesses: Vec<RatedItem<RiskRating>>,
    pub recommendations: Vec<String>,
    pub summary: String,
}

impl Report {
    /// Well-formed report for a failed model call.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            error: Some(message.into()),
            audit_type: String::new(),
            evaluation: Evaluation {
                score: 0,
                level: Level::Unknown,
            },
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            recommendations: Vec::new(),
            summary: "Error while communicating with the model API".to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// A political article that mentioned at least one election keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionArticle {
    pub title: String,
    /// First line of the article body.
    pub description: String,
    pub content: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_map_preserves_order() {
        let json = r#"{"zeta question": "a", "alpha question": "b", "mid": "c"}"#;
        let map: ResponseMap = serde_json::from_str(json).unwrap();
        let questions: Vec<&str> = map.questions().collect();
        assert_eq!(questions, vec!["zeta question", "alpha question", "mid"]);
    }

    #[test]
    fn test_response_map_stringifies_non_string_answers() {
        let json = r#"{"Is MFA enabled?": true, "How many admins?": 3, "Notes": null}"#;
        let map: ResponseMap = serde_json::from_str(json).unwrap();
        let answers: Vec<&str> = map.iter().map(|(_, a)| a).collect();
        assert_eq!(answers, vec!["true", "3", ""]);
    }

    #[test]
    fn test_response_map_from_iter_keeps_keys_unique() {
        let map: ResponseMap = vec![("q1", "a"), ("q2", "b"), ("q1", "c")]
            .into_iter()
            .collect();
        assert_eq!(map.len(), 2);
        assert_eq!(map.iter().next(), Some(("q1", "c")));
    }

    #[test]
    fn test_audit_request_wrapped_and_bare() {
        let wrapped: AuditRequest =
            serde_json::from_str(r#"{"responses": {"Do you use a VPN?": "Yes"}}"#).unwrap();
        assert_eq!(wrapped.into_responses().len(), 1);

        let bare: AuditRequest =
            serde_json::from_str(r#"{"Do you use a VPN?": "Yes", "Backups?": "Weekly"}"#).unwrap();
        assert_eq!(bare.into_responses().len(), 2);
    }

    #[test]
    fn test_audit_type_display() {
        assert_eq!(AuditType::Comprehensive.to_string(), "Comprehensive security audit");
        assert_eq!(
            AuditType::Specific("Network security".to_string()).to_string(),
            "Specific audit: Network security"
        );
        assert_eq!(AuditType::General.to_string(), "General security audit");
    }

    #[test]
    fn test_failure_report_shape() {
        let report = Report::failure("connection refused");
        assert_eq!(report.status, Status::Error);
        assert_eq!(report.evaluation.score, 0);
        assert_eq!(report.evaluation.level, Level::Unknown);
        assert!(report.strengths.is_empty());
        assert!(report.weaknesses.is_empty());
        assert!(report.recommendations.is_empty());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "connection refused");
        assert_eq!(json["evaluation"]["level"], "Unknown");
    }

    #[test]
    fn test_rated_item_serializes_missing_rating_as_null() {
        let item: RatedItem<RiskRating> = RatedItem {
            text: "No patch policy".to_string(),
            rating: None,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert!(json["rating"].is_null());

        let rated = RatedItem {
            text: "Open RDP port".to_string(),
            rating: Some(RiskRating::Critical),
        };
        let json = serde_json::to_value(&rated).unwrap();
        assert_eq!(json["rating"], "Critical");
    }

    #[test]
    fn test_success_report_omits_error_field() {
        let report = Report {
            status: Status::Success,
            error: None,
            audit_type: "General security audit".to_string(),
            evaluation: Evaluation {
                score: 5,
                level: Level::Medium,
            },
            strengths: vec![],
            weaknesses: vec![],
            recommendations: vec![],
            summary: String::new(),
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("\"error\""));
        assert!(json.contains("\"status\":\"success\""));
    }

    #[test]
    fn test_election_article_roundtrip_fields() {
        let article = ElectionArticle {
            title: "Législatives anticipées".to_string(),
            description: "Le scrutin aura lieu en novembre.".to_string(),
            content: "Le scrutin aura lieu en novembre.\nSuite.".to_string(),
            url: "https://lesoleil.sn/article".to_string(),
        };
        let json = serde_json::to_string(&article).unwrap();
        let back: ElectionArticle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, article);
    }
}
