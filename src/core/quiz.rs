//! Grading answers to generated questions.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{Explanation, GeneratedQuestion, QuestionType, UserAnswer};

/// Feedback shown after answering
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub is_correct: bool,
    pub correct_answer: String,

    /// Why the picked option is wrong, for each wrong pick that has a reason
    pub why_wrong: Vec<(String, String)>,

    pub explanation: Explanation,
    pub common_mistakes: Vec<String>,
}

/// Grade `selected` against the question and build the answer record.
///
/// Keys compare case-insensitively. Multiple-choice answers compare as sets
/// of option letters, so "ca", "A,C" and "a c" are all the same answer.
pub fn grade(
    question_id: Uuid,
    question: &GeneratedQuestion,
    selected: &str,
    time_spent: Duration,
) -> (UserAnswer, Feedback) {
    let is_correct = match question.kind {
        QuestionType::Multiple => option_keys(selected) == option_keys(&question.correct_answer),
        _ => normalize(selected) == normalize(&question.correct_answer),
    };

    let why_wrong = option_keys(selected)
        .into_iter()
        .filter_map(|key| {
            let option = question.option(&key)?;
            if option.is_correct {
                return None;
            }
            option.why_wrong.clone().map(|reason| (key, reason))
        })
        .collect();

    let answer = UserAnswer {
        question_id,
        selected_option: selected.trim().to_string(),
        is_correct,
        time_spent_ms: time_spent.as_millis().min(u64::MAX as u128) as u64,
        answered_at: Utc::now(),
    };

    let feedback = Feedback {
        is_correct,
        correct_answer: question.correct_answer.clone(),
        why_wrong,
        explanation: question.explanation.clone(),
        common_mistakes: question.common_mistakes.clone(),
    };

    (answer, feedback)
}

fn normalize(answer: &str) -> String {
    answer.trim().to_uppercase()
}

fn option_keys(answer: &str) -> BTreeSet<String> {
    answer
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QuestionOption;

    fn option(key: &str, is_correct: bool, why_wrong: Option<&str>) -> QuestionOption {
        QuestionOption {
            key: key.to_string(),
            content: format!("option {}", key),
            is_correct,
            why_wrong: why_wrong.map(str::to_string),
        }
    }

    fn single_choice() -> GeneratedQuestion {
        GeneratedQuestion {
            kind: QuestionType::Single,
            question: "李某的行为应当如何定性？".to_string(),
            options: vec![
                option("A", false, Some("忽略了转化情节")),
                option("B", true, None),
                option("C", false, None),
            ],
            correct_answer: "B".to_string(),
            explanation: Explanation::Text("构成抢劫罪".to_string()),
            common_mistakes: vec!["只认定盗窃罪".to_string()],
            related_articles: Vec::new(),
        }
    }

    #[test]
    fn test_correct_single_choice() {
        let id = Uuid::new_v4();
        let (answer, feedback) = grade(id, &single_choice(), " b ", Duration::from_millis(4200));

        assert!(answer.is_correct);
        assert!(feedback.is_correct);
        assert_eq!(answer.question_id, id);
        assert_eq!(answer.selected_option, "b");
        assert_eq!(answer.time_spent_ms, 4200);
        assert!(feedback.why_wrong.is_empty());
    }

    #[test]
    fn test_wrong_choice_reports_reason() {
        let (answer, feedback) = grade(Uuid::new_v4(), &single_choice(), "A", Duration::ZERO);

        assert!(!answer.is_correct);
        assert_eq!(feedback.correct_answer, "B");
        assert_eq!(
            feedback.why_wrong,
            vec![("A".to_string(), "忽略了转化情节".to_string())]
        );
        assert_eq!(feedback.common_mistakes, vec!["只认定盗窃罪".to_string()]);
    }

    #[test]
    fn test_multiple_choice_compares_sets() {
        let mut question = single_choice();
        question.kind = QuestionType::Multiple;
        question.correct_answer = "AC".to_string();

        for selected in ["ca", "A,C", "a c"] {
            let (answer, _) = grade(Uuid::new_v4(), &question, selected, Duration::ZERO);
            assert!(answer.is_correct, "{} should be correct", selected);
        }

        let (answer, _) = grade(Uuid::new_v4(), &question, "A", Duration::ZERO);
        assert!(!answer.is_correct);
    }
}
