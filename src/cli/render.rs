//! Plain-text rendering of analyses and quiz feedback.

use std::fmt::Write;

use uuid::Uuid;

use crate::core::Feedback;
use crate::domain::{AnalysisRecord, Explanation, GeneratedQuestion, ShapeIssue, StudyAdvice};

const RULE_WIDTH: usize = 60;

/// First eight characters of an id, as shown in listings
pub fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Truncate to `max` characters, appending "..." when cut
pub fn preview(text: &str, max: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= max {
        return single_line;
    }
    let cut: String = single_line.chars().take(max).collect();
    format!("{}...", cut)
}

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", "═".repeat(RULE_WIDTH));
    let _ = writeln!(out, "  {}", title);
    let _ = writeln!(out, "{}", "═".repeat(RULE_WIDTH));
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "─".repeat(RULE_WIDTH));
}

/// Render a full analysis. The correct answer is only shown when
/// `reveal_answer` is set.
pub fn analysis(record: &AnalysisRecord, issues: &[ShapeIssue], reveal_answer: bool) -> String {
    let mut out = String::new();
    heading(&mut out, &format!("案例分析: {}", record.case_type));

    let difficulty = &record.difficulty;
    let _ = writeln!(
        out,
        "难度: {} ({}/10)  {}",
        difficulty.level, difficulty.score, difficulty.reasoning
    );

    if !record.legal_basis.is_empty() {
        section(&mut out, "法律依据");
        for citation in &record.legal_basis {
            let _ = writeln!(
                out,
                "• {}  [相关度 {}, 考频 {}]",
                citation.article, citation.relevance, citation.frequency
            );
            if !citation.content.is_empty() {
                let _ = writeln!(out, "  {}", citation.content);
            }
            if !citation.interpretation.is_empty() {
                let _ = writeln!(out, "  解读: {}", citation.interpretation);
            }
        }
    }

    if !record.key_points.is_empty() {
        section(&mut out, "考点");
        for point in &record.key_points {
            let _ = writeln!(out, "• {} ({}, 权重 {})", point.name, point.category, point.weight);
        }
    }

    section(&mut out, "模拟题");
    out.push_str(&question(&record.generated_question));
    if reveal_answer {
        out.push_str(&answer_key(&record.generated_question));
    }

    let advice = study_advice(&record.study_advice);
    if !advice.is_empty() {
        section(&mut out, "学习建议");
        out.push_str(&advice);
    }

    if !issues.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Note: {} field(s) did not match the expected shape:", issues.len());
        for issue in issues {
            let _ = writeln!(out, "  - {}", issue);
        }
    }

    out
}

/// Render the question and its options, without the answer
pub fn question(q: &GeneratedQuestion) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}", String::from(q.kind.clone()), q.question);
    for option in &q.options {
        let _ = writeln!(out, "  {}. {}", option.key, option.content);
    }
    out
}

fn answer_key(q: &GeneratedQuestion) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "正确答案: {}", q.correct_answer);
    out.push_str(&explanation(&q.explanation));
    if !q.related_articles.is_empty() {
        let _ = writeln!(out, "相关法条: {}", q.related_articles.join("、"));
    }
    out
}

fn explanation(explanation: &Explanation) -> String {
    let mut out = String::new();
    match explanation {
        Explanation::Text(text) if text.is_empty() => {}
        Explanation::Text(text) => {
            let _ = writeln!(out, "解析: {}", text);
        }
        Explanation::Structured(s) => {
            let _ = writeln!(out, "解析: {}", s.summary);
            for basis in &s.legal_basis {
                let _ = writeln!(out, "  依据: {}", basis);
            }
            for (i, step) in s.reasoning.iter().enumerate() {
                let _ = writeln!(out, "  {}. {}", i + 1, step);
            }
            if !s.conclusion.is_empty() {
                let _ = writeln!(out, "  结论: {}", s.conclusion);
            }
        }
    }
    out
}

fn study_advice(advice: &StudyAdvice) -> String {
    let mut out = String::new();
    match advice {
        StudyAdvice::Text(text) if text.is_empty() => {}
        StudyAdvice::Text(text) => {
            let _ = writeln!(out, "{}", text);
        }
        StudyAdvice::Structured(s) => {
            if !s.summary.is_empty() {
                let _ = writeln!(out, "{}", s.summary);
            }
            for (label, items) in [
                ("重点", &s.key_points),
                ("易错", &s.common_mistakes),
                ("技巧", &s.study_tips),
                ("延伸", &s.related_topics),
            ] {
                for item in items {
                    let _ = writeln!(out, "• {}: {}", label, item);
                }
            }
        }
    }
    out
}

/// Render grading feedback
pub fn feedback(feedback: &Feedback) -> String {
    let mut out = String::new();
    if feedback.is_correct {
        let _ = writeln!(out, "✓ 回答正确");
    } else {
        let _ = writeln!(out, "✗ 回答错误，正确答案: {}", feedback.correct_answer);
        for (key, reason) in &feedback.why_wrong {
            let _ = writeln!(out, "  {} 错在: {}", key, reason);
        }
    }
    out.push_str(&explanation(&feedback.explanation));
    if !feedback.common_mistakes.is_empty() {
        let _ = writeln!(out, "常见错误:");
        for mistake in &feedback.common_mistakes {
            let _ = writeln!(out, "  - {}", mistake);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{QuestionOption, QuestionType};

    fn record() -> AnalysisRecord {
        AnalysisRecord {
            case_type: "转化型抢劫".to_string(),
            generated_question: GeneratedQuestion {
                kind: QuestionType::Single,
                question: "李某的行为如何定性？".to_string(),
                options: vec![
                    QuestionOption {
                        key: "A".to_string(),
                        content: "盗窃罪".to_string(),
                        ..Default::default()
                    },
                    QuestionOption {
                        key: "B".to_string(),
                        content: "抢劫罪".to_string(),
                        is_correct: true,
                        ..Default::default()
                    },
                ],
                correct_answer: "B".to_string(),
                explanation: Explanation::Text("当场使用暴力威胁".to_string()),
                ..Default::default()
            },
            study_advice: StudyAdvice::Text("复习刑法第269条".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_answer_hidden_unless_revealed() {
        let hidden = analysis(&record(), &[], false);
        assert!(hidden.contains("案例分析: 转化型抢劫"));
        assert!(hidden.contains("  B. 抢劫罪"));
        assert!(!hidden.contains("正确答案"));
        assert!(hidden.contains("复习刑法第269条"));

        let revealed = analysis(&record(), &[], true);
        assert!(revealed.contains("正确答案: B"));
        assert!(revealed.contains("解析: 当场使用暴力威胁"));
    }

    #[test]
    fn test_issues_are_listed() {
        let text = analysis(&record(), &[ShapeIssue::Missing("keyPoints")], false);
        assert!(text.contains("missing field `keyPoints`"));
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("短文本", 10), "短文本");
        assert_eq!(preview("一二三四五六", 3), "一二三...");
        assert_eq!(preview("a\n  b", 10), "a b");
    }

    #[test]
    fn test_short_id() {
        let id = Uuid::parse_str("12345678-9abc-4def-8123-456789abcdef").unwrap();
        assert_eq!(short_id(id), "12345678");
    }
}
