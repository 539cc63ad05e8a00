use serde::{Deserialize, Serialize};

/// 每份测验的目标题目数
pub const QUESTIONS_PER_QUIZ: usize = 10;
/// 每道题的选项数
pub const OPTIONS_PER_QUESTION: usize = 4;

/// 单道选择题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    #[serde(rename = "question")]
    pub prompt_text: String,
    pub options: Vec<String>,
    #[serde(rename = "correct")]
    pub correct_index: usize,
    pub theme: String,
    pub explanation: String,
}

/// LLM 生成并通过校验的题目集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQuiz {
    pub title: String,
    pub theme: String,
    pub questions: Vec<QuizQuestion>,
}

/// 持久化的测验记录，创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub title: String,
    pub theme: String,
    pub date: String,
    /// 仅用于去重查找
    pub source_document_id: String,
    /// 用于生成题目的纯文本
    pub content: String,
    pub questions: Vec<QuizQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}
