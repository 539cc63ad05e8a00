//! 文档处理上下文
//!
//! 封装"我正在处理第几篇、哪一期简报"这一信息

use std::fmt::Display;

use crate::models::SourceDocument;

/// 文档处理上下文
#[derive(Debug, Clone)]
pub struct DocumentCtx {
    /// 文档 ID（去重键）
    pub document_id: String,

    /// 本次运行中的序号（从1开始，仅用于日志显示）
    pub index: usize,

    /// 本次运行的文档总数
    pub total: usize,
}

impl DocumentCtx {
    pub fn new(document: &SourceDocument, index: usize, total: usize) -> Self {
        Self {
            document_id: document.id.clone(),
            index,
            total,
        }
    }
}

impl Display for DocumentCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[文档 {}]", self.document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_display_uses_document_id() {
        let doc = SourceDocument::new(
            "2024-01-01-x",
            "X",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "",
        );
        let ctx = DocumentCtx::new(&doc, 1, 3);
        assert_eq!(ctx.to_string(), "[文档 2024-01-01-x]");
    }
}
