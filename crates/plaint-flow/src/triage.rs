//! Deterministic complaint triage: category, urgency and sentiment.

use plaint_core::types::Urgency;

/// Topic keywords per category, checked in order.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("transport", &["transport", "mrt", "bus", "traffic"]),
    ("housing", &["housing", "hdb", "flat", "home"]),
    ("healthcare", &["health", "hospital", "clinic", "medical"]),
    ("environment", &["environment", "noise", "pollution", "air"]),
    ("education", &["education", "school", "student"]),
    ("employment", &["work", "job", "employment"]),
    ("security", &["security", "safety", "crime"]),
];

/// Map a free-text topic onto a standard category, `general` if nothing matches.
///
/// Matching is by substring, so "Airport shuttle" lands in environment.
pub fn map_category(topic: &str) -> &'static str {
    let topic = topic.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| topic.contains(w)))
        .map(|(category, _)| *category)
        .unwrap_or("general")
}

pub fn map_urgency(quality: i64) -> Urgency {
    if quality >= 4 {
        Urgency::High
    } else if quality >= 3 {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

/// Quality 1..=5 mapped linearly onto -1.0..=1.0.
pub fn sentiment_score(quality: i64) -> f64 {
    (quality - 3) as f64 / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_order_and_fallback() {
        assert_eq!(map_category("MRT delays at Dhoby Ghaut"), "transport");
        assert_eq!(map_category("HDB lift broken"), "housing");
        assert_eq!(map_category("Clinic queue too long"), "healthcare");
        assert_eq!(map_category("Construction noise"), "environment");
        assert_eq!(map_category("School traffic"), "transport");
        assert_eq!(map_category("Job scams"), "employment");
        assert_eq!(map_category("Crime near void deck"), "security");
        assert_eq!(map_category("Stray cats"), "general");
        assert_eq!(map_category(""), "general");
    }

    #[test]
    fn test_urgency_bands() {
        assert_eq!(map_urgency(5), Urgency::High);
        assert_eq!(map_urgency(4), Urgency::High);
        assert_eq!(map_urgency(3), Urgency::Medium);
        assert_eq!(map_urgency(2), Urgency::Low);
        assert_eq!(map_urgency(0), Urgency::Low);
    }

    #[test]
    fn test_sentiment_range() {
        assert_eq!(sentiment_score(1), -1.0);
        assert_eq!(sentiment_score(3), 0.0);
        assert_eq!(sentiment_score(5), 1.0);
        assert_eq!(sentiment_score(4), 0.5);
    }
}
