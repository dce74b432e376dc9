//! Rule-based symptom classifier.
//!
//! Scores each condition by how many of its trigger keywords occur in the
//! lowercased message. Matching is plain substring containment, so a keyword
//! also matches inside a longer word.

/// Label returned when no condition reaches [`MIN_SCORE`].
pub const UNDETERMINED_LABEL: &str = "Undetermined";

/// Advice returned with [`UNDETERMINED_LABEL`].
pub const UNDETERMINED_ADVICE: &str = "I couldn't match your symptoms to a common condition. \
Please consult a doctor for a proper evaluation.";

/// Keyword hits needed before a condition is reported.
pub const MIN_SCORE: usize = 2;

/// A condition the classifier can recognise.
#[derive(Debug)]
pub struct Condition {
    pub label: &'static str,
    pub keywords: &'static [&'static str],
    pub advice: &'static str,
}

/// Condition table. Order matters: on equal scores the earlier entry wins.
pub const CONDITIONS: &[Condition] = &[
    Condition {
        label: "flu",
        keywords: &["fever", "chills", "body ache", "fatigue", "headache"],
        advice: "Possible flu. Rest, drink plenty of fluids and consider a fever reducer. \
See a doctor if your fever is high or lasts more than 3 days.",
    },
    Condition {
        label: "cold",
        keywords: &["runny nose", "sneezing", "sore throat", "cough", "congestion"],
        advice: "Possible common cold. Rest, stay hydrated and try warm drinks or saline \
spray. See a doctor if symptoms last more than 10 days.",
    },
    Condition {
        label: "allergy",
        keywords: &["itchy eyes", "watery eyes", "sneezing", "rash", "hives"],
        advice: "Possible allergy. Avoid known triggers and consider an antihistamine. \
Seek urgent care if you have trouble breathing or swelling of the face.",
    },
    Condition {
        label: "stomach bug",
        keywords: &["nausea", "vomiting", "diarrhea", "stomach ache", "cramps"],
        advice: "Possible stomach bug. Sip water or oral rehydration solution and eat bland \
food. See a doctor if you cannot keep fluids down or notice blood.",
    },
];

/// Result of classifying a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub label: &'static str,
    pub advice: &'static str,
}

/// Number of `condition` keywords present in already-lowercased `text`.
fn score(condition: &Condition, text: &str) -> usize {
    condition
        .keywords
        .iter()
        .filter(|keyword| text.contains(*keyword))
        .count()
}

/// Classify free text against [`CONDITIONS`].
pub fn classify(text: &str) -> Classification {
    let text = text.to_lowercase();

    let mut best: Option<&Condition> = None;
    let mut best_score = 0;
    for condition in CONDITIONS {
        let s = score(condition, &text);
        if s > best_score {
            best = Some(condition);
            best_score = s;
        }
    }

    match best {
        Some(condition) if best_score >= MIN_SCORE => Classification {
            label: condition.label,
            advice: condition.advice,
        },
        _ => Classification {
            label: UNDETERMINED_LABEL,
            advice: UNDETERMINED_ADVICE,
        },
    }
}
