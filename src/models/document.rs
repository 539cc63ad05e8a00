use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 一篇待处理的来源文档
///
/// 每次运行由来源读取器重新生成，处理完即丢弃
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// 去重键：`<日期>-<标题 slug>`，同一期简报在多次运行间保持不变
    pub id: String,
    pub title: String,
    /// 发件人或来源标识，用于白名单过滤
    pub origin: String,
    /// 简报所属日期
    pub date: NaiveDate,
    /// 原始 HTML 或纯文本
    pub raw_content: String,
}

impl SourceDocument {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        date: NaiveDate,
        raw_content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            origin: "local".to_string(),
            date,
            raw_content: raw_content.into(),
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }
}

/// 清洗后的内容
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedContent {
    /// 用于提示词的纯文本，长度不超过配置上限
    pub plain_text: String,
    /// 去除样板和脚本后的 HTML 片段
    pub display_html: Option<String>,
    /// 正文中第一张有效图片
    pub image_url: Option<String>,
}

impl NormalizedContent {
    pub fn is_empty(&self) -> bool {
        self.plain_text.trim().is_empty()
    }
}
