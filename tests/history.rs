//! History Integration Tests
//!
//! Persistence of the capped history list across reopen.

use std::time::Duration;

use fakao::core::grade;
use fakao::domain::{
    AnalysisRecord, CaseInput, GeneratedQuestion, HistoryEntry, QuestionOption, QuestionType,
};
use fakao::history::{History, HistoryStorage, JsonFileStorage, DEFAULT_KEY, DEFAULT_MAX_ENTRIES};
use tempfile::TempDir;

fn analyzed_entry(content: &str) -> HistoryEntry {
    let record = AnalysisRecord {
        case_type: "盗窃".to_string(),
        generated_question: GeneratedQuestion {
            kind: QuestionType::Single,
            question: "如何定性？".to_string(),
            options: vec![
                QuestionOption {
                    key: "A".to_string(),
                    content: "盗窃罪".to_string(),
                    is_correct: true,
                    why_wrong: None,
                },
                QuestionOption {
                    key: "B".to_string(),
                    content: "抢夺罪".to_string(),
                    is_correct: false,
                    why_wrong: Some("行为方式是秘密窃取".to_string()),
                },
            ],
            correct_answer: "A".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    HistoryEntry::new(CaseInput::new(content, None), Some(record))
}

#[test]
fn test_entries_survive_reopen() {
    let temp = TempDir::new().unwrap();
    let storage = JsonFileStorage::new(temp.path(), DEFAULT_KEY);

    let first = analyzed_entry("第一个案例");
    let second = analyzed_entry("第二个案例");
    {
        let mut history = History::open(storage.clone(), DEFAULT_MAX_ENTRIES).unwrap();
        history.push(first.clone()).unwrap();
        history.push(second.clone()).unwrap();
    }

    let history = History::open(storage, DEFAULT_MAX_ENTRIES).unwrap();
    assert_eq!(history.entries(), &[second, first]);
    assert!(temp.path().join("fakao-case-storage.json").exists());
}

#[test]
fn test_cap_of_twenty_is_persisted() {
    let temp = TempDir::new().unwrap();
    let storage = JsonFileStorage::new(temp.path(), DEFAULT_KEY);
    let mut history = History::open(storage.clone(), DEFAULT_MAX_ENTRIES).unwrap();

    for i in 0..25 {
        history.push(analyzed_entry(&format!("案例 {}", i))).unwrap();
    }

    let stored = storage.load().unwrap();
    assert_eq!(stored.len(), 20);
    assert_eq!(stored[0].case.content, "案例 24");
    assert_eq!(stored[19].case.content, "案例 5");
}

#[test]
fn test_graded_answer_is_persisted() {
    let temp = TempDir::new().unwrap();
    let storage = JsonFileStorage::new(temp.path(), DEFAULT_KEY);
    let mut history = History::open(storage.clone(), DEFAULT_MAX_ENTRIES).unwrap();

    let entry = analyzed_entry("甲秘密窃取乙的钱包");
    let id = entry.id();
    history.push(entry.clone()).unwrap();

    let question = &entry.analysis.as_ref().unwrap().generated_question;
    let (answer, feedback) = grade(id, question, "b", Duration::from_secs(12));
    assert!(!feedback.is_correct);
    history.record_answer(id, answer).unwrap();

    let reopened = History::open(storage, DEFAULT_MAX_ENTRIES).unwrap();
    let stored = reopened.get(id).unwrap().user_answer.as_ref().unwrap();
    assert_eq!(stored.selected_option, "b");
    assert!(!stored.is_correct);
    assert_eq!(stored.time_spent_ms, 12_000);
}

#[test]
fn test_persisted_shape() {
    let temp = TempDir::new().unwrap();
    let storage = JsonFileStorage::new(temp.path(), DEFAULT_KEY);
    storage.save(&[analyzed_entry("案例内容")]).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(storage.path()).unwrap()).unwrap();
    assert_eq!(raw["version"], 1);
    let entry = &raw["entries"][0];
    assert_eq!(entry["content"], "案例内容");
    assert_eq!(entry["status"], "pending");
    assert_eq!(entry["analysis"]["caseType"], "盗窃");
    assert!(entry.get("userAnswer").is_none());
}
