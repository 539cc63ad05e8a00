//! # Actu Quiz
//!
//! 把新闻简报自动转换成选择题测验的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 来源层（Sources）
//! - `sources/` - 只负责产出候选文档，不关心是否处理过
//! - `DirectorySource` - 读取本地目录中的 HTML 简报
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每次只处理一篇文档
//! - `ContentNormalizer` - 清洗 HTML，提取纯文本和配图
//! - `QuizGenerator` - 调用 LLM 生成并校验题目（主模型 → 备用模型）
//! - `Publisher` - 写入测验文件
//! - `Ledger` - 去重索引（manifest），有保留上限
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一篇简报"的完整处理流程
//! - `DocumentCtx` - 上下文封装（文档 ID + 序号）
//! - `DocumentFlow` - 流程编排（normalize → generate → publish）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 一次运行：加载索引、去重、顺序处理、写回索引
//!
//! ## 模块结构

pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod sources;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppResult, ConfigError, PipelineError};
pub use models::{ManifestEntry, Quiz, QuizQuestion, SourceDocument};
pub use orchestrator::{App, RunReport};
pub use services::{Ledger, LlmService, Oracle, OracleTarget};
pub use sources::{DirectorySource, SourceReader};
pub use workflow::{DocumentCtx, DocumentFlow, ProcessResult, SkipReason};
