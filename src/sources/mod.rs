//! 来源读取
//!
//! 来源只负责产出候选文档，不关心是否处理过。读取器按白名单过滤来源，
//! 按日期从新到旧排序，只保留最近的 `batch_size` 篇。

pub mod directory;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::SourceDocument;

pub use directory::DirectorySource;

/// 候选文档来源
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// 来源名称（仅用于日志）
    fn name(&self) -> String;

    /// 读取最近的候选文档
    ///
    /// 来源不可达时返回 `SourceUnavailable`
    async fn fetch(&self) -> AppResult<Vec<SourceDocument>>;
}

/// 来源是否在白名单中（不区分大小写的子串匹配，白名单为空时全部允许）
pub fn origin_allowed(origin: &str, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let origin = origin.to_lowercase();
    allowed
        .iter()
        .any(|a| !a.trim().is_empty() && origin.contains(&a.trim().to_lowercase()))
}

/// 过滤白名单并按日期从新到旧保留前 `limit` 篇
pub fn select_recent(
    mut documents: Vec<SourceDocument>,
    allowed: &[String],
    limit: usize,
) -> Vec<SourceDocument> {
    documents.retain(|d| origin_allowed(&d.origin, allowed));
    documents.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
    documents.truncate(limit);
    documents
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn doc(id: &str, day: u32, origin: &str) -> SourceDocument {
        SourceDocument::new(
            id,
            id,
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            "<p>x</p>",
        )
        .with_origin(origin)
    }

    #[test]
    fn test_origin_allowed() {
        let allowed = vec!["hugodecrypte@kessel.media".to_string()];
        assert!(origin_allowed("HugoDecrypte <hugodecrypte@kessel.media>", &allowed));
        assert!(!origin_allowed("spam@example.com", &allowed));
        assert!(origin_allowed("n'importe qui", &[]));
    }

    #[test]
    fn test_select_recent_orders_filters_and_bounds() {
        let docs = vec![
            doc("a", 1, "news@kessel.media"),
            doc("c", 3, "news@kessel.media"),
            doc("spam", 9, "spam@example.com"),
            doc("b", 2, "news@kessel.media"),
        ];

        let selected = select_recent(docs, &["kessel.media".to_string()], 2);

        let ids: Vec<_> = selected.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }
}
