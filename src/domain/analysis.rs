//! The structured analysis record produced by a successful assembly.
//!
//! The model is asked for one JSON object in a fixed schema, but its output
//! drifts: explanation and study advice come back either as plain strings or
//! as structured objects, and numbers sometimes arrive as strings. The record
//! accepts all of these. Construction from parsed JSON goes field by field so
//! that a bad field degrades to its default instead of rejecting the whole
//! object; every such fallback is reported as a [`ShapeIssue`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Terminal output of a successful assembly. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    /// Reasoning the model echoed inside the JSON object, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,

    /// Case type label
    #[serde(default)]
    pub case_type: String,

    /// Cited legal provisions
    #[serde(default)]
    pub legal_basis: Vec<LegalCitation>,

    /// Exam key points touched by the case
    #[serde(default)]
    pub key_points: Vec<KeyPoint>,

    #[serde(default)]
    pub difficulty: Difficulty,

    #[serde(default)]
    pub generated_question: GeneratedQuestion,

    #[serde(default)]
    pub study_advice: StudyAdvice,
}

/// A legal provision relevant to the case
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegalCitation {
    /// Article identifier, e.g. "刑法第269条"
    pub article: String,

    /// Source text of the article
    pub content: String,

    /// Plain-language explanation
    pub interpretation: String,

    /// Relevance score, 0-100
    #[serde(deserialize_with = "lenient::number")]
    pub relevance: f64,

    /// Times examined in recent years
    #[serde(deserialize_with = "lenient::count")]
    pub frequency: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyPoint {
    pub name: String,
    pub category: String,

    /// Importance weight, 0-100
    #[serde(deserialize_with = "lenient::number")]
    pub weight: f64,
}

/// Categorical difficulty level. Unknown labels are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
    Other(String),
}

impl Default for DifficultyLevel {
    fn default() -> Self {
        Self::Medium
    }
}

impl From<String> for DifficultyLevel {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "easy" => Self::Easy,
            "medium" => Self::Medium,
            "hard" => Self::Hard,
            _ => Self::Other(s),
        }
    }
}

impl From<DifficultyLevel> for String {
    fn from(level: DifficultyLevel) -> Self {
        match level {
            DifficultyLevel::Easy => "easy".to_string(),
            DifficultyLevel::Medium => "medium".to_string(),
            DifficultyLevel::Hard => "hard".to_string(),
            DifficultyLevel::Other(s) => s,
        }
    }
}

impl std::fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from(self.clone()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Difficulty {
    pub level: DifficultyLevel,

    /// 1-10
    #[serde(deserialize_with = "lenient::number")]
    pub score: f64,

    /// Why this level was chosen
    pub reasoning: String,
}

/// Question type tag. Unknown tags are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionType {
    Single,
    Multiple,
    Subjective,
    Other(String),
}

impl Default for QuestionType {
    fn default() -> Self {
        Self::Single
    }
}

impl From<String> for QuestionType {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "single" => Self::Single,
            "multiple" => Self::Multiple,
            "subjective" => Self::Subjective,
            _ => Self::Other(s),
        }
    }
}

impl From<QuestionType> for String {
    fn from(kind: QuestionType) -> Self {
        match kind {
            QuestionType::Single => "single".to_string(),
            QuestionType::Multiple => "multiple".to_string(),
            QuestionType::Subjective => "subjective".to_string(),
            QuestionType::Other(s) => s,
        }
    }
}

/// One labeled answer option
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuestionOption {
    /// Option label (A/B/C/D)
    pub key: String,
    pub content: String,
    pub is_correct: bool,

    /// Why this option is wrong (wrong options only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub why_wrong: Option<String>,
}

/// Structured explanation of the correct answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StructuredExplanation {
    pub summary: String,
    pub legal_basis: Vec<String>,
    pub reasoning: Vec<String>,
    pub conclusion: String,
}

/// Explanation as either free text or the structured form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Explanation {
    Text(String),
    Structured(StructuredExplanation),
}

impl Default for Explanation {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl Explanation {
    /// One-line summary regardless of shape
    pub fn summary(&self) -> &str {
        match self {
            Explanation::Text(text) => text,
            Explanation::Structured(s) => &s.summary,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratedQuestion {
    #[serde(rename = "type")]
    pub kind: QuestionType,

    /// Question prompt
    pub question: String,

    /// Ordered options (choice questions)
    pub options: Vec<QuestionOption>,

    /// Correct option key(s) or reference answer
    pub correct_answer: String,

    pub explanation: Explanation,
    pub common_mistakes: Vec<String>,
    pub related_articles: Vec<String>,
}

impl GeneratedQuestion {
    /// Look up an option by key, case-insensitively
    pub fn option(&self, key: &str) -> Option<&QuestionOption> {
        self.options
            .iter()
            .find(|o| o.key.trim().eq_ignore_ascii_case(key.trim()))
    }

    /// Whether this question is answered by picking options
    pub fn is_choice(&self) -> bool {
        !matches!(self.kind, QuestionType::Subjective)
    }
}

/// Structured study advice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StructuredAdvice {
    pub summary: String,
    pub key_points: Vec<String>,
    pub common_mistakes: Vec<String>,
    pub study_tips: Vec<String>,
    pub related_topics: Vec<String>,
}

/// Study advice as either free text or the structured form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StudyAdvice {
    Text(String),
    Structured(StructuredAdvice),
}

impl Default for StudyAdvice {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// A field that did not match the expected shape
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeIssue {
    #[error("missing field `{0}`")]
    Missing(&'static str),

    #[error("field `{field}` has unexpected shape: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("field `{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("question has {0} option(s), expected at least 2")]
    TooFewOptions(usize),
}

/// Top-level fields every record is expected to carry
pub const REQUIRED_FIELDS: [&str; 6] = [
    "caseType",
    "legalBasis",
    "keyPoints",
    "difficulty",
    "generatedQuestion",
    "studyAdvice",
];

impl AnalysisRecord {
    /// Build a record from a parsed JSON object.
    ///
    /// Never fails: fields that are missing or of the wrong shape fall back
    /// to their defaults and are listed in the returned issues. A non-object
    /// value yields a default record with every required field missing.
    pub fn from_value(value: Value) -> (Self, Vec<ShapeIssue>) {
        let mut issues = Vec::new();
        let map = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let record = Self {
            thinking: optional_field(&map, "thinking", &mut issues),
            case_type: field(&map, "caseType", &mut issues),
            legal_basis: field(&map, "legalBasis", &mut issues),
            key_points: field(&map, "keyPoints", &mut issues),
            difficulty: field(&map, "difficulty", &mut issues),
            generated_question: field(&map, "generatedQuestion", &mut issues),
            study_advice: field(&map, "studyAdvice", &mut issues),
        };

        record.check_ranges(&mut issues);
        (record, issues)
    }

    fn check_ranges(&self, issues: &mut Vec<ShapeIssue>) {
        for citation in &self.legal_basis {
            if !(0.0..=100.0).contains(&citation.relevance) {
                issues.push(ShapeIssue::OutOfRange {
                    field: "legalBasis.relevance",
                    value: citation.relevance,
                });
            }
        }
        for point in &self.key_points {
            if !(0.0..=100.0).contains(&point.weight) {
                issues.push(ShapeIssue::OutOfRange {
                    field: "keyPoints.weight",
                    value: point.weight,
                });
            }
        }
        if !(1.0..=10.0).contains(&self.difficulty.score) {
            issues.push(ShapeIssue::OutOfRange {
                field: "difficulty.score",
                value: self.difficulty.score,
            });
        }
        let question = &self.generated_question;
        if question.is_choice() && question.options.len() < 2 {
            issues.push(ShapeIssue::TooFewOptions(question.options.len()));
        }
    }
}

fn field<T>(map: &Map<String, Value>, key: &'static str, issues: &mut Vec<ShapeIssue>) -> T
where
    T: DeserializeOwned + Default,
{
    match map.get(key) {
        None | Some(Value::Null) => {
            issues.push(ShapeIssue::Missing(key));
            T::default()
        }
        Some(value) => T::deserialize(value).unwrap_or_else(|e| {
            issues.push(ShapeIssue::Invalid {
                field: key,
                reason: e.to_string(),
            });
            T::default()
        }),
    }
}

fn optional_field<T>(
    map: &Map<String, Value>,
    key: &'static str,
    issues: &mut Vec<ShapeIssue>,
) -> Option<T>
where
    T: DeserializeOwned,
{
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => match T::deserialize(value) {
            Ok(v) => Some(v),
            Err(e) => {
                issues.push(ShapeIssue::Invalid {
                    field: key,
                    reason: e.to_string(),
                });
                None
            }
        },
    }
}

/// Deserializers that accept numbers or numeric strings.
mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let n = match Value::deserialize(deserializer)? {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| D::Error::custom("number out of range")),
            Value::String(s) => s
                .trim()
                .trim_end_matches('%')
                .parse::<f64>()
                .map_err(|_| D::Error::custom(format!("expected a number, got \"{}\"", s))),
            Value::Null => Ok(0.0),
            other => Err(D::Error::custom(format!("expected a number, got {}", other))),
        }?;
        if !n.is_finite() {
            return Err(D::Error::custom(format!("expected a finite number, got {}", n)));
        }
        Ok(n)
    }

    pub fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let n = number(deserializer)?;
        if n.is_sign_negative() {
            return Ok(0);
        }
        Ok(n.round().min(u32::MAX as f64) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_record_json() -> Value {
        json!({
            "thinking": "先判断盗窃，再看是否转化",
            "caseType": "转化型抢劫",
            "legalBasis": [{
                "article": "刑法第269条",
                "content": "犯盗窃、诈骗、抢夺罪，为窝藏赃物、抗拒抓捕或者毁灭罪证而当场使用暴力或者以暴力相威胁的，依照本法第二百六十三条的规定定罪处罚。",
                "interpretation": "盗窃后为抗拒抓捕当场以暴力相威胁的，按抢劫罪论处",
                "relevance": 95,
                "frequency": 4
            }],
            "keyPoints": [{"name": "转化型抢劫", "category": "刑法", "weight": 90}],
            "difficulty": {"level": "medium", "score": 6, "reasoning": "需要识别转化条件"},
            "generatedQuestion": {
                "type": "single",
                "question": "李某的行为应当如何定性？",
                "options": [
                    {"key": "A", "content": "盗窃罪", "isCorrect": false, "whyWrong": "忽略了转化情节"},
                    {"key": "B", "content": "抢劫罪", "isCorrect": true}
                ],
                "correctAnswer": "B",
                "explanation": "李某构成转化型抢劫",
                "commonMistakes": ["只认定盗窃罪"],
                "relatedArticles": ["刑法第263条"]
            },
            "studyAdvice": "重点掌握转化型抢劫的三个条件"
        })
    }

    #[test]
    fn test_full_record_has_no_issues() {
        let (record, issues) = AnalysisRecord::from_value(full_record_json());

        assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
        assert_eq!(record.case_type, "转化型抢劫");
        assert_eq!(record.legal_basis[0].frequency, 4);
        assert_eq!(record.difficulty.level, DifficultyLevel::Medium);
        assert_eq!(record.generated_question.kind, QuestionType::Single);
        assert_eq!(record.generated_question.explanation.summary(), "李某构成转化型抢劫");
        assert_eq!(
            record.study_advice,
            StudyAdvice::Text("重点掌握转化型抢劫的三个条件".to_string())
        );
    }

    #[test]
    fn test_structured_explanation_and_advice() {
        let mut value = full_record_json();
        value["generatedQuestion"]["explanation"] = json!({
            "summary": "构成抢劫罪",
            "legalBasis": ["刑法第269条"],
            "reasoning": ["先盗窃", "后以暴力相威胁"],
            "conclusion": "选B"
        });
        value["studyAdvice"] = json!({"summary": "掌握转化条件", "studyTips": ["多做真题"]});

        let (record, issues) = AnalysisRecord::from_value(value);
        assert!(issues.is_empty());
        assert_eq!(record.generated_question.explanation.summary(), "构成抢劫罪");
        match record.study_advice {
            StudyAdvice::Structured(advice) => {
                assert_eq!(advice.study_tips, vec!["多做真题".to_string()]);
                assert!(advice.key_points.is_empty());
            }
            other => panic!("expected structured advice, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let mut value = full_record_json();
        value["legalBasis"][0]["relevance"] = json!("88");
        value["difficulty"]["score"] = json!("7");

        let (record, issues) = AnalysisRecord::from_value(value);
        assert!(issues.is_empty());
        assert_eq!(record.legal_basis[0].relevance, 88.0);
        assert_eq!(record.difficulty.score, 7.0);
    }

    #[test]
    fn test_non_finite_strings_are_invalid() {
        let mut value = full_record_json();
        value["legalBasis"][0]["frequency"] = json!("NaN");
        value["difficulty"]["score"] = json!("inf");

        let (record, issues) = AnalysisRecord::from_value(value);
        assert!(record.legal_basis.is_empty());
        assert!(issues.iter().any(|i| matches!(
            i,
            ShapeIssue::Invalid { field: "legalBasis", reason } if reason.contains("finite")
        )));
        assert!(issues
            .iter()
            .any(|i| matches!(i, ShapeIssue::Invalid { field: "difficulty", .. })));
    }

    #[test]
    fn test_missing_fields_are_reported_not_fatal() {
        let (record, issues) = AnalysisRecord::from_value(json!({"a": 1}));

        assert_eq!(record.case_type, "");
        for key in REQUIRED_FIELDS {
            assert!(issues.contains(&ShapeIssue::Missing(key)), "{} not reported", key);
        }
    }

    #[test]
    fn test_invalid_field_falls_back_to_default() {
        let mut value = full_record_json();
        value["keyPoints"] = json!("not a list");

        let (record, issues) = AnalysisRecord::from_value(value);
        assert!(record.key_points.is_empty());
        assert!(matches!(issues[0], ShapeIssue::Invalid { field: "keyPoints", .. }));
        assert_eq!(record.case_type, "转化型抢劫");
    }

    #[test]
    fn test_unknown_labels_are_preserved() {
        let level: DifficultyLevel = serde_json::from_str("\"困难\"").unwrap();
        assert_eq!(level, DifficultyLevel::Other("困难".to_string()));
        assert_eq!(serde_json::to_string(&level).unwrap(), "\"困难\"");

        let kind: QuestionType = serde_json::from_str("\"MULTIPLE\"").unwrap();
        assert_eq!(kind, QuestionType::Multiple);
    }

    #[test]
    fn test_out_of_range_scores_are_reported() {
        let mut value = full_record_json();
        value["difficulty"]["score"] = json!(12);

        let (_, issues) = AnalysisRecord::from_value(value);
        assert_eq!(
            issues,
            vec![ShapeIssue::OutOfRange {
                field: "difficulty.score",
                value: 12.0
            }]
        );
    }
}
