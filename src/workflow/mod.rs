//! 流程层
//!
//! 单篇文档从读取到发布的处理流程

pub mod document_ctx;
pub mod document_flow;

pub use document_ctx::DocumentCtx;
pub use document_flow::{DocumentFlow, DocumentState, ProcessResult, SkipReason};
