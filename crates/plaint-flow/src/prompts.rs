//! Prompt templates for the complaint nodes.

use plaint_core::types::{Resource, TaskMetadata};

pub fn extraction_prompt(transcript: &str, categories: &[String]) -> String {
    format!(
        r#"You extract structured fields from a citizen complaint conversation.

Conversation:
{transcript}

Only use information that is clearly present in the conversation. Never invent
details. Use null for any field the citizen has not made clear.

complaint_topic: the issue being raised, e.g. "Construction noise" or
"Transport delays". Prefer one of these categories where it fits: {categories}.

complaint_location: a specific Singapore neighbourhood, district or planning
area such as "Toa Payoh", "Jurong West" or "Bishan". Map MRT stations to
their neighbourhood ("Dhoby Ghaut MRT" is "City Hall").

complaint_summary: one to three sentences covering the issue and what the
citizen wants done.

complaint_quality: an integer from 1 to 5 rating how actionable the complaint
is for the government (specificity, detail, community impact, constructive
tone). 1 is vague or purely personal, 3 is somewhat productive, 5 is very
detailed and impactful.

Reply with JSON only, in exactly this shape:
{{"complaint_topic": "... or null", "complaint_location": "... or null", "complaint_summary": "... or null", "complaint_quality": 1}}"#,
        transcript = transcript,
        categories = categories.join(", "),
    )
}

pub fn clarify_prompt(transcript: &str, missing: &[&str], quality: i64) -> String {
    let missing = if missing.is_empty() {
        "none".to_string()
    } else {
        missing.join(", ")
    };
    format!(
        r#"You help citizens file complaints with the government. Briefly acknowledge
the complaint below and, only if something critical is still missing, ask ONE
short, specific clarifying question.

Conversation so far:
{transcript}

Still missing: {missing}
Current quality score (1-5): {quality}

If topic, location and summary are all known, thank the citizen and tell them
their complaint will be processed. Keep it short; moving the complaint forward
matters more than perfect detail."#
    )
}

pub fn closing_prompt(
    transcript: &str,
    metadata: &TaskMetadata,
    complaint_id: &str,
    resources: &[Resource],
) -> String {
    let contacts = if resources.is_empty() {
        "none".to_string()
    } else {
        resources
            .iter()
            .map(|r| format!("- {}: {} ({})", r.name, r.contact, r.description))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        r#"You are closing a citizen complaint conversation.

Conversation:
{transcript}

Topic: {topic}
Location: {location}
Quality: {quality}

Write a short, professional reply that:
1. Confirms the complaint was logged with reference ID {complaint_id}.
2. Summarises what the citizen reported.
3. Explains that reports like this bring community issues to light.
4. Lists these government contacts in case they want to follow up directly:
{contacts}

Thank them for raising it."#,
        topic = metadata.complaint_topic,
        location = metadata.complaint_location,
        quality = metadata.complaint_quality,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_prompt_lists_categories() {
        let prompt = extraction_prompt(
            "user: MRT delayed",
            &["transport".to_string(), "housing".to_string()],
        );
        assert!(prompt.contains("user: MRT delayed"));
        assert!(prompt.contains("transport, housing"));
        assert!(prompt.contains(r#""complaint_quality": 1}"#));
    }

    #[test]
    fn test_closing_prompt_cites_id_and_contacts() {
        let resources = vec![Resource {
            name: "LTA".into(),
            contact: "1800-225-5582".into(),
            website: "https://www.lta.gov.sg".into(),
            description: "Land Transport Authority".into(),
        }];
        let prompt = closing_prompt("", &TaskMetadata::default(), "abc-123", &resources);
        assert!(prompt.contains("reference ID abc-123"));
        assert!(prompt.contains("- LTA: 1800-225-5582 (Land Transport Authority)"));
    }
}
