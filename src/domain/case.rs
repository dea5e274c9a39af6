//! Case input and user interaction types.
//!
//! A case is the narrative the user submits for analysis. History entries
//! pair the case with its completed analysis and the user's answer.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::analysis::AnalysisRecord;

/// Exam subject areas a case can be tagged with.
///
/// Serialized with the Chinese subject labels the upstream prompt and the
/// persisted history use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum SubjectArea {
    #[serde(rename = "刑法")]
    CriminalLaw,
    #[serde(rename = "民法")]
    CivilLaw,
    #[serde(rename = "刑事诉讼法")]
    CriminalProcedure,
    #[serde(rename = "民事诉讼法")]
    CivilProcedure,
    #[serde(rename = "行政法与行政诉讼法")]
    AdministrativeLaw,
    #[serde(rename = "商经知")]
    CommercialLaw,
    #[serde(rename = "理论法")]
    TheoreticalLaw,
    #[serde(rename = "三国法")]
    InternationalLaw,
}

impl SubjectArea {
    /// All subjects in display order
    pub const ALL: [SubjectArea; 8] = [
        SubjectArea::CriminalLaw,
        SubjectArea::CivilLaw,
        SubjectArea::CriminalProcedure,
        SubjectArea::CivilProcedure,
        SubjectArea::AdministrativeLaw,
        SubjectArea::CommercialLaw,
        SubjectArea::TheoreticalLaw,
        SubjectArea::InternationalLaw,
    ];

    /// The label used in prompts and persisted state
    pub fn label(&self) -> &'static str {
        match self {
            SubjectArea::CriminalLaw => "刑法",
            SubjectArea::CivilLaw => "民法",
            SubjectArea::CriminalProcedure => "刑事诉讼法",
            SubjectArea::CivilProcedure => "民事诉讼法",
            SubjectArea::AdministrativeLaw => "行政法与行政诉讼法",
            SubjectArea::CommercialLaw => "商经知",
            SubjectArea::TheoreticalLaw => "理论法",
            SubjectArea::InternationalLaw => "三国法",
        }
    }
}

impl std::fmt::Display for SubjectArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle of a submitted case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Created, not yet sent
    Pending,

    /// Request in flight
    Analyzing,

    /// Analysis received
    Completed,

    /// Request or assembly failed
    Error,
}

impl Default for CaseStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// A case narrative submitted for analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseInput {
    /// Unique identifier for this submission
    pub id: Uuid,

    /// Case text (trimmed)
    pub content: String,

    /// Optional subject hint passed to the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_area: Option<SubjectArea>,

    /// When the case was submitted
    pub created_at: DateTime<Utc>,

    /// Current status
    #[serde(default)]
    pub status: CaseStatus,
}

impl CaseInput {
    /// Create a new pending case. The content is trimmed.
    pub fn new(content: impl AsRef<str>, subject_area: Option<SubjectArea>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.as_ref().trim().to_string(),
            subject_area,
            created_at: Utc::now(),
            status: CaseStatus::Pending,
        }
    }

    /// Number of characters in the case text
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// A graded answer to a generated question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnswer {
    /// The case the question was generated for
    pub question_id: Uuid,

    /// Option key(s) the user picked, as entered
    pub selected_option: String,

    /// Whether the selection matched the correct answer
    pub is_correct: bool,

    /// Time taken to answer in milliseconds
    pub time_spent_ms: u64,

    /// When the answer was submitted
    pub answered_at: DateTime<Utc>,
}

/// One persisted history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub case: CaseInput,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_answer: Option<UserAnswer>,
}

impl HistoryEntry {
    /// Create an entry for a case, with its analysis if one completed
    pub fn new(case: CaseInput, analysis: Option<AnalysisRecord>) -> Self {
        Self {
            case,
            analysis,
            user_answer: None,
        }
    }

    /// Entry id (same as the case id)
    pub fn id(&self) -> Uuid {
        self.case.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_input_trims_content() {
        let case = CaseInput::new("  李某深夜潜入王某家中  \n", Some(SubjectArea::CriminalLaw));
        assert_eq!(case.content, "李某深夜潜入王某家中");
        assert_eq!(case.char_count(), 10);
        assert_eq!(case.status, CaseStatus::Pending);
    }

    #[test]
    fn test_subject_area_serializes_as_label() {
        let json = serde_json::to_string(&SubjectArea::AdministrativeLaw).unwrap();
        assert_eq!(json, "\"行政法与行政诉讼法\"");

        let parsed: SubjectArea = serde_json::from_str("\"商经知\"").unwrap();
        assert_eq!(parsed, SubjectArea::CommercialLaw);
    }

    #[test]
    fn test_history_entry_flattens_case() {
        let entry = HistoryEntry::new(CaseInput::new("some case text", None), None);
        let value = serde_json::to_value(&entry).unwrap();

        assert!(value.get("id").is_some());
        assert!(value.get("content").is_some());
        assert!(value.get("createdAt").is_some());
        assert!(value.get("analysis").is_none());

        let parsed: HistoryEntry = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, entry);
    }
}
