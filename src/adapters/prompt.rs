//! Prompt construction for case analysis.

use crate::domain::SubjectArea;

/// System prompt: role, output rules and the JSON schema the final channel
/// must follow.
pub const SYSTEM_PROMPT: &str = r#"你是一位资深法律职业资格考试培训专家，熟悉刑法、民法、诉讼法等科目的命题规律。
请对用户提供的案例进行分析，并生成一道高质量的模拟题。

输出要求：
1. 只输出一个JSON对象，不要输出任何其他文字或markdown标记
2. 法条引用必须准确，使用现行有效的法律条文
3. 考点应为近年考试中反复出现的核心考点
4. 干扰项要有迷惑性，但在逻辑上必然错误

JSON Schema:
{
  "caseType": "string (案例类型)",
  "legalBasis": [
    {
      "article": "string (法条编号)",
      "content": "string (法条原文)",
      "interpretation": "string (通俗解读)",
      "relevance": "number (0-100)",
      "frequency": "number (近5年考频)"
    }
  ],
  "keyPoints": [
    { "name": "string (考点名)", "category": "string (科目)", "weight": "number (0-100)" }
  ],
  "difficulty": {
    "level": "string (easy/medium/hard)",
    "score": "number (1-10)",
    "reasoning": "string (难度判定理由)"
  },
  "generatedQuestion": {
    "type": "string (single/multiple/subjective)",
    "question": "string (题目)",
    "options": [
      { "key": "string (A/B/C/D)", "content": "string", "isCorrect": "boolean", "whyWrong": "string (仅错误选项)" }
    ],
    "correctAnswer": "string",
    "explanation": {
      "summary": "string (一句话总结)",
      "legalBasis": ["string (法律依据)"],
      "reasoning": ["string (推理步骤)"],
      "conclusion": "string (结论)"
    },
    "commonMistakes": ["string"],
    "relatedArticles": ["string"]
  },
  "studyAdvice": "string (学习建议)"
}"#;

/// Build the user message for a case
pub fn user_prompt(case_content: &str, subject_area: Option<SubjectArea>) -> String {
    let subject = subject_area
        .map(|s| format!("（科目：{}）", s.label()))
        .unwrap_or_default();

    format!(
        "请分析以下法律案例{}：\n\n{}\n\n请严格按照系统指令中的JSON格式返回分析结果。",
        subject, case_content
    )
}
