//! Audit-type classification from question texts.

use crate::models::{AuditType, ResponseMap};
use tracing::debug;

/// Security domains and the trigger words that indicate them.
///
/// Keywords are lower-case and matched as substrings of the lower-cased
/// question, so French and English questionnaires are both recognised.
pub const DOMAIN_KEYWORDS: [(&str, &[&str]); 8] = [
    (
        "Password policy",
        &["mot de passe", "password", "authentification", "authentication", "connexion"],
    ),
    (
        "Network security",
        &["réseau", "network", "firewall", "pare-feu", "vpn", "wifi", "routeur"],
    ),
    (
        "Access management",
        &["accès", "access", "droits", "permission", "privilege", "utilisateur", "user"],
    ),
    (
        "Data protection",
        &["donnée", "data", "chiffrement", "encryption", "backup", "sauvegarde"],
    ),
    (
        "Physical security",
        &["physique", "physical", "bâtiment", "building", "local", "vol", "theft"],
    ),
    (
        "Training and awareness",
        &["formation", "training", "sensibilisation", "awareness", "employé"],
    ),
    (
        "Incident management",
        &["incident", "crise", "réponse", "response", "attaque", "breach"],
    ),
    (
        "Regulatory compliance",
        &["rgpd", "gdpr", "conformité", "compliance", "régulation", "legal"],
    ),
];

/// Number of domains that must be hit for an audit to count as comprehensive.
const COMPREHENSIVE_THRESHOLD: usize = 3;

/// Keyword hits per domain, ranked by count descending.
///
/// Each keyword found in a question adds one to its domain; a question may
/// feed several domains. Ties keep table order.
pub fn domain_counts(responses: &ResponseMap) -> Vec<(&'static str, usize)> {
    let mut counts: Vec<(&'static str, usize)> =
        DOMAIN_KEYWORDS.iter().map(|(name, _)| (*name, 0)).collect();

    for question in responses.questions() {
        let question = question.to_lowercase();
        for (slot, (_, keywords)) in counts.iter_mut().zip(DOMAIN_KEYWORDS.iter()) {
            slot.1 += keywords.iter().filter(|k| question.contains(*k)).count();
        }
    }

    // `sort_by` is stable, which gives the table-order tie-break.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Classify a questionnaire as comprehensive, domain-specific or general.
pub fn detect_audit_type(responses: &ResponseMap) -> AuditType {
    let ranked = domain_counts(responses);
    debug!(?ranked, "Ranked audit domains");

    let covered = ranked.iter().filter(|(_, count)| *count > 0).count();
    if ranked.len() > COMPREHENSIVE_THRESHOLD && covered >= COMPREHENSIVE_THRESHOLD {
        return AuditType::Comprehensive;
    }

    match ranked.first() {
        Some((name, count)) if *count > 0 => AuditType::Specific((*name).to_string()),
        _ => AuditType::General,
    }
}
