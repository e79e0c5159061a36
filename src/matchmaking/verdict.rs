//! Classifiers turning an agent's free-text reply into a closed verdict.
//!
//! The oracle's output is untrusted: anything a classifier cannot read with
//! confidence maps to the failing verdict.

use regex::Regex;

/// Classifies an opaque oracle reply into a closed set of outcomes.
pub trait ResponseClassifier: Send + Sync {
    type Verdict;

    fn classify(&self, text: &str) -> Self::Verdict;
}

/// Result of the verification phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationVerdict {
    Verified,
    /// The agent reported the user as untrustworthy; `detail` is its reply.
    Untrustworthy { detail: String },
    /// Neither confirmed nor denied.
    Inconclusive,
}

/// Result of the matching phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentorChoice {
    Chosen { mentor_id: i64 },
    Missing,
}

/// Result of the summary flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryVerdict {
    Saved,
    NotSaved,
}

/// Looks for the `UNTRUSTWORTHY` / `VERIFIED` markers.
///
/// `UNTRUSTWORTHY` wins when both appear.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkerVerificationClassifier;

impl ResponseClassifier for MarkerVerificationClassifier {
    type Verdict = VerificationVerdict;

    fn classify(&self, text: &str) -> VerificationVerdict {
        if text.contains("UNTRUSTWORTHY") {
            VerificationVerdict::Untrustworthy {
                detail: text.to_string(),
            }
        } else if text.contains("VERIFIED") {
            VerificationVerdict::Verified
        } else {
            VerificationVerdict::Inconclusive
        }
    }
}

/// Extracts `{"best_mentor_id": <integer>}` from the reply.
///
/// The first brace-delimited span on a line (greedy) must parse as a JSON
/// object whose `best_mentor_id` is an integer.
#[derive(Debug, Clone)]
pub struct JsonMentorChoiceClassifier {
    object: Regex,
}

impl JsonMentorChoiceClassifier {
    pub const KEY: &'static str = "best_mentor_id";

    pub fn new() -> Self {
        Self {
            object: Regex::new(r"\{.*\}").expect("static pattern"),
        }
    }
}

impl Default for JsonMentorChoiceClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseClassifier for JsonMentorChoiceClassifier {
    type Verdict = MentorChoice;

    fn classify(&self, text: &str) -> MentorChoice {
        if !text.contains(Self::KEY) {
            return MentorChoice::Missing;
        }
        let Some(span) = self.object.find(text) else {
            return MentorChoice::Missing;
        };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(span.as_str()) else {
            return MentorChoice::Missing;
        };
        match value.get(Self::KEY).and_then(|v| v.as_i64()) {
            Some(mentor_id) => MentorChoice::Chosen { mentor_id },
            None => MentorChoice::Missing,
        }
    }
}

/// Treats a reply mentioning `SUCCESS` or `saved` as confirmation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SummaryConfirmationClassifier;

impl ResponseClassifier for SummaryConfirmationClassifier {
    type Verdict = SummaryVerdict;

    fn classify(&self, text: &str) -> SummaryVerdict {
        if text.contains("SUCCESS") || text.contains("saved") {
            SummaryVerdict::Saved
        } else {
            SummaryVerdict::NotSaved
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_markers() {
        let c = MarkerVerificationClassifier;
        assert_eq!(
            c.classify("The user is VERIFIED."),
            VerificationVerdict::Verified
        );
        assert_eq!(
            c.classify("UNTRUSTWORTHY: score 10 is below 30"),
            VerificationVerdict::Untrustworthy {
                detail: "UNTRUSTWORTHY: score 10 is below 30".into()
            }
        );
        assert!(matches!(
            c.classify("Not VERIFIED, actually UNTRUSTWORTHY"),
            VerificationVerdict::Untrustworthy { .. }
        ));
        assert_eq!(
            c.classify("I could not find that user."),
            VerificationVerdict::Inconclusive
        );
        // Marker matching is case-sensitive.
        assert_eq!(
            c.classify("the user is verified"),
            VerificationVerdict::Inconclusive
        );
        assert_eq!(c.classify(""), VerificationVerdict::Inconclusive);
    }

    #[test]
    fn mentor_choice_reads_embedded_json() {
        let c = JsonMentorChoiceClassifier::new();
        assert_eq!(
            c.classify(r#"{"best_mentor_id": 42}"#),
            MentorChoice::Chosen { mentor_id: 42 }
        );
        assert_eq!(
            c.classify(r#"Sure! Here you go: {"best_mentor_id": 7} Good luck."#),
            MentorChoice::Chosen { mentor_id: 7 }
        );
    }

    #[test]
    fn near_miss_json_is_missing() {
        let c = JsonMentorChoiceClassifier::new();
        for text in [
            "The best mentor is alice (id 3).",
            r#"best_mentor_id: 3"#,
            r#"{'best_mentor_id': 3}"#,
            r#"{"best_mentor_id": 3"#,
            r#"{"best_mentor_id": "3"}"#,
            r#"{"best_mentor_id": 3.5}"#,
            r#"{"best_mentor_id": null}"#,
            r#"{"mentor": 3} and best_mentor_id"#,
            r#"{"best_mentor_id": 3} or {"best_mentor_id": 4}"#,
            "{\n\"best_mentor_id\": 3\n}",
            "",
        ] {
            assert_eq!(c.classify(text), MentorChoice::Missing, "{text}");
        }
    }

    #[test]
    fn summary_confirmation() {
        let c = SummaryConfirmationClassifier;
        assert_eq!(c.classify("Status: SUCCESS"), SummaryVerdict::Saved);
        assert_eq!(c.classify("The summary was saved."), SummaryVerdict::Saved);
        assert_eq!(c.classify("I wrote a summary."), SummaryVerdict::NotSaved);
        assert_eq!(c.classify(""), SummaryVerdict::NotSaved);
    }
}
