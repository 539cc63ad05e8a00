use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppResult, PipelineError};
use crate::models::SourceDocument;
use crate::services::normalizer::{extract_meta, extract_title};
use crate::sources::{select_recent, SourceReader};
use crate::utils::slugify;

/// 未提取到标题时的默认值
const DEFAULT_TITLE: &str = "Newsletter";
/// 可作为来源标识的 meta 名称，按优先级排列
const ORIGIN_META_NAMES: &[&str] = &["sender", "from", "author"];

/// 本地目录来源：读取目录下的 `.html` / `.htm` 文件
pub struct DirectorySource {
    dir: PathBuf,
    allowed_origins: Vec<String>,
    batch_size: usize,
}

impl DirectorySource {
    pub fn new(config: &Config) -> Self {
        Self {
            dir: PathBuf::from(&config.source_dir),
            allowed_origins: config.allowed_origins.clone(),
            batch_size: config.batch_size,
        }
    }

    /// 从单个 HTML 文件构建文档
    pub async fn load_document(path: &Path) -> Result<SourceDocument> {
        let raw = fs::read_to_string(path)
            .await
            .with_context(|| format!("无法读取文件: {}", path.display()))?;

        let file_stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let title = extract_title(&raw).unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let date = match document_date(&raw, &file_stem) {
            Some(date) => date,
            None => modified_date(path).await?,
        };
        let origin = ORIGIN_META_NAMES
            .iter()
            .find_map(|name| extract_meta(&raw, name))
            .unwrap_or_else(|| "local".to_string());

        let id = edition_id(date, &title, &file_stem);

        Ok(SourceDocument {
            id,
            title,
            origin,
            date,
            raw_content: raw,
        })
    }
}

#[async_trait]
impl SourceReader for DirectorySource {
    fn name(&self) -> String {
        format!("目录 {}", self.dir.display())
    }

    async fn fetch(&self) -> AppResult<Vec<SourceDocument>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| PipelineError::source_unavailable(self.name(), e))?;

        let mut documents = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => return Err(PipelineError::source_unavailable(self.name(), e)),
            };

            let path = entry.path();
            if !is_html(&path) {
                continue;
            }

            match Self::load_document(&path).await {
                Ok(doc) => {
                    debug!("已读取: {} → {}", path.display(), doc.id);
                    documents.push(doc);
                }
                Err(e) => warn!("读取文件失败 {}: {:#}", path.display(), e),
            }
        }

        let total = documents.len();
        let selected = select_recent(documents, &self.allowed_origins, self.batch_size);
        info!(
            "📂 {} 中共 {} 个 HTML 文件，选取最近 {} 篇",
            self.dir.display(),
            total,
            selected.len()
        );
        Ok(selected)
    }
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
        .unwrap_or(false)
}

/// 日期来源：`<meta name="date">`，其次是文件名开头的 `YYYY-MM-DD`
fn document_date(raw: &str, file_stem: &str) -> Option<NaiveDate> {
    extract_meta(raw, "date")
        .and_then(|d| parse_leading_date(&d))
        .or_else(|| parse_leading_date(file_stem))
}

fn parse_leading_date(text: &str) -> Option<NaiveDate> {
    let prefix = text.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

async fn modified_date(path: &Path) -> Result<NaiveDate> {
    let modified = fs::metadata(path)
        .await
        .and_then(|m| m.modified())
        .with_context(|| format!("无法读取修改时间: {}", path.display()))?;
    Ok(DateTime::<Local>::from(modified).date_naive())
}

/// 每期简报的去重键：`<日期>-<标题 slug>`
///
/// 标题为空时退回到文件名
fn edition_id(date: NaiveDate, title: &str, file_stem: &str) -> String {
    let slug = if title == DEFAULT_TITLE {
        slugify(file_stem)
    } else {
        slugify(title)
    };
    let date_str = date.format("%Y-%m-%d").to_string();

    // 文件名本身以日期开头时，slug 里不再重复日期
    let slug = slug
        .strip_prefix(&date_str)
        .map(|s| s.trim_start_matches('-').to_string())
        .unwrap_or(slug);

    if slug.is_empty() {
        date_str
    } else {
        format!("{}-{}", date_str, slug)
    }
}
