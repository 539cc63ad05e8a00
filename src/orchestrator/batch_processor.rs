//! 批量文档处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一次运行的完整编排。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：创建来源读取器、LLM 服务和文档处理流程
//! 2. **加载索引**：读取去重索引（失败则终止运行）
//! 3. **批量加载**：从来源读取最近的候选文档
//! 4. **去重**：调用 LLM 之前先查索引，已处理的文档直接跳过
//! 5. **顺序处理**：逐篇处理，每发布一篇立即写回索引
//! 6. **全局统计**：汇总所有文档的处理结果
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单篇文档的细节
//! - **索引所有者**：唯一持有并写入索引的模块
//! - **严格顺序**：同一时刻只处理一篇文档，索引不会被并发写入
//! - **向下委托**：委托 `DocumentFlow` 处理单篇文档

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppResult, PipelineError};
use crate::models::SourceDocument;
use crate::services::{Ledger, LlmService, Oracle};
use crate::sources::{DirectorySource, SourceReader};
use crate::utils::logging;
use crate::workflow::{DocumentCtx, DocumentFlow, ProcessResult, SkipReason};

/// 一次运行的统计结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// 来源返回的文档数
    pub fetched: usize,
    /// 新发布的测验数
    pub published: usize,
    /// 索引中已有、直接跳过的文档数
    pub already_processed: usize,
    /// 清洗后没有文本的文档数
    pub empty: usize,
    /// 生成失败的文档数
    pub generation_failed: usize,
    /// 测验文件写入失败的文档数
    pub persistence_failed: usize,
    /// 因超出保留上限被淘汰的索引条目数
    pub evicted: usize,
}

impl RunReport {
    pub fn skipped(&self) -> usize {
        self.already_processed + self.empty
    }

    pub fn failed(&self) -> usize {
        self.generation_failed + self.persistence_failed
    }

    /// 按跳过原因计数
    pub fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::AlreadyProcessed => self.already_processed += 1,
            SkipReason::EmptyDocument => self.empty += 1,
            SkipReason::GenerationFailed => self.generation_failed += 1,
        }
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    source: Box<dyn SourceReader>,
    flow: DocumentFlow,
}

impl App {
    /// 初始化应用：本地目录来源 + OpenAI 兼容的 LLM 服务
    pub async fn initialize(config: Config) -> Result<Self> {
        let source = Box::new(DirectorySource::new(&config));
        let oracle = Arc::new(LlmService::new(&config));
        Self::with_components(config, source, oracle)
    }

    /// 使用自定义来源和 LLM 创建应用
    pub fn with_components(
        config: Config,
        source: Box<dyn SourceReader>,
        oracle: Arc<dyn Oracle>,
    ) -> Result<Self> {
        let flow = DocumentFlow::new(&config, oracle)?;
        Ok(Self {
            config,
            source,
            flow,
        })
    }

    /// 运行一次完整流水线
    ///
    /// 来源不可用时本次运行不做任何事；索引读写失败时终止运行
    pub async fn run(&self) -> AppResult<RunReport> {
        logging::log_startup(
            &self.source.name(),
            self.config.batch_size,
            self.config.retention_limit,
        );

        let mut ledger =
            Ledger::load(&self.config.manifest_path, self.config.retention_limit).await?;
        info!("📒 索引已有 {} 条记录", ledger.len());

        let documents = match self.load_documents().await {
            Ok(documents) => documents,
            Err(e @ PipelineError::SourceUnavailable { .. }) => {
                warn!("⚠️ {}，本次运行结束", e);
                return Ok(RunReport::default());
            }
            Err(e) => return Err(e),
        };

        let mut report = RunReport {
            fetched: documents.len(),
            ..Default::default()
        };

        if documents.is_empty() {
            warn!("⚠️ 没有找到候选文档，程序结束");
            return Ok(report);
        }

        let already = documents.iter().filter(|d| ledger.contains_document(d)).count();
        logging::log_documents_loaded(documents.len(), already);

        let total = documents.len();
        for (idx, document) in documents.iter().enumerate() {
            let ctx = DocumentCtx::new(document, idx + 1, total);

            if ledger.contains_document(document) {
                info!("{} ⏭️ 已处理过，跳过", ctx);
                report.record_skip(SkipReason::AlreadyProcessed);
                continue;
            }

            match self.flow.run(document, &ctx).await {
                Ok(ProcessResult::Published(entry)) => {
                    let evicted = ledger.append(entry);
                    for old in &evicted {
                        info!("{} 🗑️ 淘汰旧记录: {}", ctx, old.file);
                    }
                    report.evicted += evicted.len();
                    ledger.save().await?;
                    report.published += 1;
                    info!("{} ✅ 已发布并写入索引", ctx);
                }
                Ok(ProcessResult::Skipped(reason)) => report.record_skip(reason),
                Err(e) if e.is_fatal() => {
                    error!("{} ❌ 致命错误，终止运行: {}", ctx, e);
                    return Err(e);
                }
                Err(e) => {
                    error!("{} ❌ 处理过程中发生错误: {}", ctx, e);
                    report.persistence_failed += 1;
                }
            }
        }

        logging::print_final_stats(
            report.published,
            report.skipped(),
            report.failed(),
            report.fetched,
            &self.config.output_log_file,
        );

        Ok(report)
    }

    /// 加载候选文档
    async fn load_documents(&self) -> AppResult<Vec<SourceDocument>> {
        info!("\n📁 正在读取候选文档: {}", self.source.name());
        self.source.fetch().await
    }
}
