//! 题目生成服务 - 业务能力层
//!
//! 负责"一篇文章 → 一组选择题"：
//! 1. 用固定模板拼出提示词（主题列表 + 结构要求 + 正文）
//! 2. 调用 LLM，每次尝试只发一次请求
//! 3. 从响应中定位 JSON 并逐题校验，不合格的题目丢弃
//! 4. 主模型失败时用备用目标再试一次，最多两次
//!
//! 失败时返回 `PipelineError::GenerationFailed`，由调用方决定跳过该文档。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppResult, PipelineError};
use crate::models::{GeneratedQuiz, QuizQuestion, OPTIONS_PER_QUESTION, QUESTIONS_PER_QUIZ};
use crate::services::json_extract::extract_json;
use crate::services::llm_service::{Oracle, OracleTarget};

const QUESTION_KEYS: &[&str] = &["question", "q", "prompt"];
const OPTIONS_KEYS: &[&str] = &["options", "choices"];
const CORRECT_KEYS: &[&str] = &["correct", "correctIndex", "correct_index", "answer"];
const EXPLANATION_KEYS: &[&str] = &["explanation", "explication"];
const LIST_KEYS: &[&str] = &["questions", "quiz", "qcm"];

/// 题目生成服务
pub struct QuizGenerator {
    oracle: Arc<dyn Oracle>,
    primary: OracleTarget,
    fallback: Option<OracleTarget>,
    themes: Vec<String>,
    min_questions: usize,
    timeout: Duration,
}

impl QuizGenerator {
    /// 创建新的题目生成服务
    pub fn new(config: &Config, oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            primary: OracleTarget::primary(config),
            fallback: OracleTarget::fallback(config),
            themes: config
                .themes
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            min_questions: config.min_questions,
            timeout: Duration::from_secs(config.llm_timeout_secs),
        }
    }

    /// 覆盖单次调用超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 生成测验
    ///
    /// # 参数
    /// - `title`: 文章标题
    /// - `plain_text`: 清洗后的正文
    ///
    /// # 返回
    /// 通过校验的题目（`min_questions..=10` 道）
    pub async fn generate(&self, title: &str, plain_text: &str) -> AppResult<GeneratedQuiz> {
        let prompt = self.build_prompt(title, plain_text);
        let targets: Vec<&OracleTarget> = std::iter::once(&self.primary)
            .chain(self.fallback.as_ref())
            .collect();

        let mut last_err = None;
        for (attempt, target) in targets.iter().enumerate() {
            info!("🤖 第 {} 次生成，模型: {}", attempt + 1, target.model);

            match self.attempt(target, title, &prompt).await {
                Ok(quiz) => {
                    info!("✓ 生成 {} 道有效题目 (主题: {})", quiz.questions.len(), quiz.theme);
                    return Ok(quiz);
                }
                Err(e) => {
                    warn!("⚠️ 第 {} 次生成失败: {}", attempt + 1, e);
                    last_err = Some(e);
                }
            }
        }

        Err(PipelineError::GenerationFailed {
            attempts: targets.len(),
            last: Box::new(last_err.unwrap_or_else(|| {
                PipelineError::oracle_failed(&self.primary.model, "没有可用的调用目标")
            })),
        })
    }

    /// 单次尝试：一次调用 + 解析校验
    async fn attempt(&self, target: &OracleTarget, title: &str, prompt: &str) -> AppResult<GeneratedQuiz> {
        let response = match tokio::time::timeout(self.timeout, self.oracle.call(target, prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(PipelineError::oracle_failed(&target.model, format!("{:#}", e))),
            Err(_) => {
                return Err(PipelineError::oracle_failed(
                    &target.model,
                    format!("调用超时 ({:?})", self.timeout),
                ))
            }
        };

        debug!("LLM 响应长度: {} 字符", response.chars().count());
        self.parse_response(&target.model, title, &response)
    }

    /// 构建提示词
    pub fn build_prompt(&self, title: &str, plain_text: &str) -> String {
        format!(
            r#"Analyse cet article de newsletter intitulé "{title}".

Génère EXACTEMENT {count} questions QCM éducatives pour collégiens/lycéens :
- {options} options par question, 1 seule bonne réponse, donnée par son indice (0 à {max_index})
- Attribue À CHAQUE question UN des thèmes EXACTS suivants : {themes}
- Questions courtes, précises, niveau collège/lycée
- Explications détaillées et pédagogiques

Réponds uniquement avec un objet JSON valide de la forme :
{{
  "questions": [
    {{
      "question": "Question ?",
      "options": ["Option 1", "Option 2", "Option 3", "Option 4"],
      "correct": 1,
      "theme": "{example_theme}",
      "explanation": "Explication complète..."
    }}
  ]
}}

Contenu de l'article :
{plain_text}
"#,
            title = title,
            count = QUESTIONS_PER_QUIZ,
            options = OPTIONS_PER_QUESTION,
            max_index = OPTIONS_PER_QUESTION - 1,
            themes = self.themes.join(", "),
            example_theme = self.themes.first().map(String::as_str).unwrap_or_default(),
            plain_text = plain_text,
        )
    }

    /// 解析并校验 LLM 响应
    ///
    /// 不合格的题目被丢弃；剩余题目不足 `min_questions` 时整体拒绝
    pub fn parse_response(&self, model: &str, title: &str, response: &str) -> AppResult<GeneratedQuiz> {
        let value = extract_json(response).map_err(|e| PipelineError::malformed(model, e))?;

        let items = match &value {
            Value::Array(items) => items,
            Value::Object(obj) => first_of(obj, LIST_KEYS)
                .and_then(Value::as_array)
                .ok_or_else(|| PipelineError::malformed(model, "JSON 中没有 questions 列表"))?,
            _ => return Err(PipelineError::malformed(model, "JSON 不是对象或数组")),
        };

        let mut questions = Vec::new();
        for (idx, item) in items.iter().enumerate() {
            match self.parse_question(item) {
                Ok(question) => questions.push(question),
                Err(reason) => warn!("第 {} 题无效，已丢弃: {}", idx + 1, reason),
            }
        }
        questions.truncate(QUESTIONS_PER_QUIZ);

        if questions.len() < self.min_questions {
            return Err(PipelineError::malformed(
                model,
                format!(
                    "有效题目 {} 道，少于最低要求 {} 道",
                    questions.len(),
                    self.min_questions
                ),
            ));
        }

        Ok(GeneratedQuiz {
            title: title.to_string(),
            theme: dominant_theme(&questions),
            questions,
        })
    }

    /// 校验单道题目
    fn parse_question(&self, item: &Value) -> Result<QuizQuestion, String> {
        let obj = item.as_object().ok_or("不是 JSON 对象")?;

        let prompt_text = non_empty_str(obj, QUESTION_KEYS).ok_or("缺少题干")?;

        let options = first_of(obj, OPTIONS_KEYS)
            .and_then(Value::as_array)
            .ok_or("缺少选项列表")?
            .iter()
            .map(|o| o.as_str().map(|s| s.trim().to_string()))
            .collect::<Option<Vec<_>>>()
            .ok_or("选项必须是字符串")?;
        if options.len() != OPTIONS_PER_QUESTION {
            return Err(format!(
                "选项数为 {}，应为 {}",
                options.len(),
                OPTIONS_PER_QUESTION
            ));
        }

        let correct_index = first_of(obj, CORRECT_KEYS)
            .and_then(parse_correct_index)
            .ok_or("缺少或无法解析正确答案")?;
        if correct_index >= OPTIONS_PER_QUESTION {
            return Err(format!("正确答案下标 {} 超出范围", correct_index));
        }

        let raw_theme = non_empty_str(obj, &["theme"]).ok_or("缺少主题")?;
        let theme = self
            .match_theme(&raw_theme)
            .ok_or_else(|| format!("主题不在允许列表中: {}", raw_theme))?;

        let explanation = non_empty_str(obj, EXPLANATION_KEYS).ok_or("缺少解析")?;

        Ok(QuizQuestion {
            prompt_text,
            options,
            correct_index,
            theme,
            explanation,
        })
    }

    /// 主题匹配（忽略大小写），返回配置中的写法
    fn match_theme(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        self.themes
            .iter()
            .find(|t| t.as_str() == raw || t.to_lowercase() == raw.to_lowercase())
            .cloned()
    }
}

/// 出现次数最多的主题，次数相同时取最先出现的
pub fn dominant_theme(questions: &[QuizQuestion]) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for q in questions {
        *counts.entry(q.theme.as_str()).or_default() += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for q in questions {
        let count = counts[q.theme.as_str()];
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((q.theme.as_str(), count));
        }
    }
    best.map(|(t, _)| t.to_string()).unwrap_or_default()
}

fn first_of<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k))
}

fn non_empty_str(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    first_of(obj, keys)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// 正确答案：整数、数字字符串或字母 A-D
fn parse_correct_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => {
            let s = s.trim().trim_end_matches(['.', ')']);
            if let Ok(n) = s.parse::<usize>() {
                return Some(n);
            }
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => {
                    Some((c.to_ascii_uppercase() as u8 - b'A') as usize)
                }
                _ => None,
            }
        }
        _ => None,
    }
}
