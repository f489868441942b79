//! Prompt templates sent to the model.

use super::detect::detect_audit_type;
use crate::models::ResponseMap;
use std::fmt::Write;

/// Instructions that pin the model to the tagged reply format the parser reads.
pub const SYSTEM_PROMPT: &str = "\
You are a cybersecurity expert specialised in analysing security audits.
Your task is to analyse the answers given to a security audit and produce a detailed evaluation.

Adapt your analysis to the kind of audit provided (comprehensive audit or an audit specific to one domain).
Identify the specific domain of the audit automatically when the questions focus on one subject
(e.g. network security, password policy, data management).

Always structure your reply with the following tags:
<AUDIT_TYPE>Identified audit type</AUDIT_TYPE>
<EVALUATION>Score out of 10 and level (Critical, Low, Medium, Good, Excellent)</EVALUATION>
<STRENGTHS>List of strengths with their importance (Strong, Medium, Weak)</STRENGTHS>
<WEAKNESSES>List of identified vulnerabilities with their risk level (Critical, High, Medium, Low)</WEAKNESSES>
<RECOMMENDATIONS>Detailed recommendations for each identified weakness</RECOMMENDATIONS>
<SUMMARY>Concise summary of the overall security posture and the priority next steps</SUMMARY>
";

const INSTRUCTIONS: &str = "
Analyse these answers and provide:
1. The audit type you identified
2. An overall evaluation of the security level (score out of 10 and level: Critical, Low, Medium, Good, Excellent)
3. The strengths of the current security (list them with their importance: Strong, Medium, Weak)
4. The identified vulnerabilities (list them with their risk level: Critical, High, Medium, Low)
5. Detailed recommendations to fix each vulnerability
6. A general summary of the current situation and the priority next steps

Format your reply with the sections clearly delimited by the specified tags.
";

/// Build the user prompt: detected audit type, every Q/A pair, then the instructions.
pub fn build_prompt(responses: &ResponseMap) -> String {
    let audit_type = detect_audit_type(responses);

    let mut prompt = format!("Detected audit type: {audit_type}\n\n");
    prompt.push_str("Here are the answers to a digital security audit:\n\n");
    for (question, answer) in responses.iter() {
        // Writing to a String cannot fail.
        let _ = write!(prompt, "Question: {question}\nAnswer: {answer}\n\n");
    }
    prompt.push_str(INSTRUCTIONS);
    prompt
}
