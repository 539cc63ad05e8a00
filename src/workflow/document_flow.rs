//! 文档处理流程 - 流程层
//!
//! 核心职责：定义"一篇简报"的完整处理流程
//!
//! 流程顺序：
//! 1. 清洗内容（无文本 → 跳过）
//! 2. LLM 生成题目（主模型 → 备用模型，失败 → 跳过）
//! 3. 写入测验文件
//!
//! 去重检查和索引写回由编排层负责，本流程不碰索引

use std::fmt::Display;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppResult, PipelineError};
use crate::models::{ManifestEntry, NormalizedContent, Quiz, SourceDocument};
use crate::services::{ContentNormalizer, Oracle, Publisher, QuizGenerator};
use crate::utils::truncate_text;
use crate::workflow::document_ctx::DocumentCtx;

/// 文档在流水线中的状态（仅用于日志）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    Fetched,
    Normalized,
    Generated,
    GenerationFailed,
    Published,
    Skipped,
}

impl Display for DocumentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DocumentState::Fetched => "已读取",
            DocumentState::Normalized => "已清洗",
            DocumentState::Generated => "已生成",
            DocumentState::GenerationFailed => "生成失败",
            DocumentState::Published => "已发布",
            DocumentState::Skipped => "已跳过",
        };
        f.write_str(s)
    }
}

/// 跳过原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 索引中已有记录（由编排层在生成前判断）
    AlreadyProcessed,
    /// 清洗后没有文本
    EmptyDocument,
    /// 所有尝试都未得到有效题目
    GenerationFailed,
}

/// 文档处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessResult {
    /// 测验文件已写入，附带待写入索引的条目
    Published(ManifestEntry),
    /// 跳过，不写入索引
    Skipped(SkipReason),
}

/// 文档处理流程
///
/// - 编排单篇文档的处理流程
/// - 不持有索引，也不决定是否跳过已处理的文档
/// - 只依赖业务能力（services）
pub struct DocumentFlow {
    normalizer: ContentNormalizer,
    generator: QuizGenerator,
    publisher: Publisher,
    verbose_logging: bool,
}

impl DocumentFlow {
    /// 创建新的文档处理流程
    pub fn new(config: &Config, oracle: Arc<dyn Oracle>) -> Result<Self> {
        Ok(Self::from_parts(
            ContentNormalizer::new(config)?,
            QuizGenerator::new(config, oracle),
            Publisher::new(config),
            config.verbose_logging,
        ))
    }

    pub fn from_parts(
        normalizer: ContentNormalizer,
        generator: QuizGenerator,
        publisher: Publisher,
        verbose_logging: bool,
    ) -> Self {
        Self {
            normalizer,
            generator,
            publisher,
            verbose_logging,
        }
    }

    /// 处理一篇文档
    ///
    /// 生成失败和空文档以 `Skipped` 返回；测验文件写入失败以 `PersistenceFailed` 返回
    pub async fn run(&self, document: &SourceDocument, ctx: &DocumentCtx) -> AppResult<ProcessResult> {
        self.log_state(ctx, DocumentState::Fetched);
        info!("{} 标题: {} ({})", ctx, document.title, document.date);

        // ========== 步骤 1: 清洗 ==========
        let content = self.normalizer.normalize(&document.raw_content);
        if content.is_empty() {
            let err = PipelineError::EmptyDocument {
                id: document.id.clone(),
            };
            warn!("{} ⚠️ {}，跳过", ctx, err);
            self.log_state(ctx, DocumentState::Skipped);
            return Ok(ProcessResult::Skipped(SkipReason::EmptyDocument));
        }
        self.log_state(ctx, DocumentState::Normalized);
        info!("{} 正文 {} 字符", ctx, content.plain_text.chars().count());
        if self.verbose_logging {
            debug!("{} 正文预览: {}", ctx, truncate_text(&content.plain_text, 200));
        }

        // ========== 步骤 2: 生成题目 ==========
        let generated = match self.generator.generate(&document.title, &content.plain_text).await {
            Ok(generated) => generated,
            Err(e) => {
                error!("{} ❌ {}", ctx, e);
                self.log_state(ctx, DocumentState::GenerationFailed);
                return Ok(ProcessResult::Skipped(SkipReason::GenerationFailed));
            }
        };
        self.log_state(ctx, DocumentState::Generated);

        // ========== 步骤 3: 写入测验文件 ==========
        let quiz = build_quiz(document, content, generated);
        let entry = self.publisher.publish(&quiz).await?;

        self.log_state(ctx, DocumentState::Published);
        Ok(ProcessResult::Published(entry))
    }

    fn log_state(&self, ctx: &DocumentCtx, state: DocumentState) {
        debug!("{} ({}/{}) 状态: {}", ctx, ctx.index, ctx.total, state);
    }
}

fn build_quiz(
    document: &SourceDocument,
    content: NormalizedContent,
    generated: crate::models::GeneratedQuiz,
) -> Quiz {
    Quiz {
        title: document.title.clone(),
        theme: generated.theme,
        date: document.date.format("%Y-%m-%d").to_string(),
        source_document_id: document.id.clone(),
        content: content.plain_text,
        questions: generated.questions,
        display_html: content.display_html,
        image_url: content.image_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;

    use crate::services::OracleTarget;

    /// 总是返回同一个响应
    struct FixedOracle(String);

    #[async_trait]
    impl Oracle for FixedOracle {
        async fn call(&self, _target: &OracleTarget, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    fn ten_questions() -> String {
        let questions: Vec<_> = (0..10)
            .map(|i| {
                json!({
                    "question": format!("Question {} ?", i),
                    "options": ["A", "B", "C", "D"],
                    "correct": i % 4,
                    "theme": "SPORT",
                    "explanation": "parce que",
                })
            })
            .collect();
        json!({ "questions": questions }).to_string()
    }

    fn flow_in(dir: &std::path::Path, response: String) -> DocumentFlow {
        let config = Config {
            output_dir: dir.to_string_lossy().to_string(),
            ..Config::default()
        };
        DocumentFlow::new(&config, Arc::new(FixedOracle(response))).unwrap()
    }

    fn doc(raw: &str) -> SourceDocument {
        SourceDocument::new(
            "2024-02-03-recap",
            "Le récap",
            NaiveDate::from_ymd_opt(2024, 2, 3).unwrap(),
            raw,
        )
    }

    #[tokio::test]
    async fn test_publishes_quiz_with_document_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let flow = flow_in(dir.path(), ten_questions());
        let document = doc(r#"<body><img src="https://img.example/une.jpg" width="600"><p>Le PSG a gagné.</p></body>"#);
        let ctx = DocumentCtx::new(&document, 1, 1);

        let result = flow.run(&document, &ctx).await.unwrap();

        let entry = match result {
            ProcessResult::Published(entry) => entry,
            other => panic!("应当发布: {:?}", other),
        };
        assert_eq!(entry.source_document_id, "2024-02-03-recap");
        assert_eq!(entry.date, "2024-02-03");
        assert_eq!(entry.theme, "SPORT");
        assert_eq!(entry.image.as_deref(), Some("https://img.example/une.jpg"));

        let written: Quiz =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join(&entry.file)).unwrap()).unwrap();
        assert_eq!(written.questions.len(), 10);
        assert!(written.content.contains("Le PSG a gagné."));
    }

    #[tokio::test]
    async fn test_empty_document_is_skipped_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let flow = flow_in(dir.path(), ten_questions());
        let document = doc("<script>var x = 1;</script><p>   </p>");
        let ctx = DocumentCtx::new(&document, 1, 1);

        let result = flow.run(&document, &ctx).await.unwrap();

        assert_eq!(result, ProcessResult::Skipped(SkipReason::EmptyDocument));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unusable_response_is_generation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let flow = flow_in(dir.path(), "Désolé, je ne peux pas.".into());
        let document = doc("<p>Un vrai contenu.</p>");
        let ctx = DocumentCtx::new(&document, 1, 1);

        let result = flow.run(&document, &ctx).await.unwrap();

        assert_eq!(result, ProcessResult::Skipped(SkipReason::GenerationFailed));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unwritable_output_is_persistence_failure() {
        let dir = tempfile::tempdir().unwrap();
        // 输出目录的位置被一个普通文件占用
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, "").unwrap();
        let flow = flow_in(&blocked, ten_questions());
        let document = doc("<p>Un vrai contenu.</p>");
        let ctx = DocumentCtx::new(&document, 1, 1);

        let result = flow.run(&document, &ctx).await;

        let err = tokio_test::assert_err!(result);
        assert!(matches!(err, PipelineError::PersistenceFailed { .. }));
        assert!(!err.is_fatal());
    }
}
