//! 去重索引（manifest）- 业务能力层
//!
//! 索引文件是一个 JSON 数组，按从旧到新排列，最多保留 `retention_limit` 条。
//! 运行开始时整体读入内存并建立查找集合，每发布一篇后整体原子写回。
//!
//! 去重检查由编排层在调用 LLM 之前完成（`contains_document`），`append` 本身不做去重。
//! 旧版索引条目没有来源文档 ID，只能按标题匹配。
//! 条目被淘汰后其去重键也随之失效。

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{AppResult, PipelineError};
use crate::models::{ManifestEntry, SourceDocument};
use crate::utils::write_atomic;

/// 去重索引
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    retention_limit: usize,
    entries: Vec<ManifestEntry>,
    keys: HashSet<String>,
    /// 旧版条目（无来源文档 ID）的标题
    legacy_titles: HashSet<String>,
}

impl Ledger {
    /// 加载索引，文件不存在时视为空索引
    ///
    /// 文件存在但无法解析时返回 `LedgerIo`，避免覆盖已有数据
    pub async fn load(path: impl Into<PathBuf>, retention_limit: usize) -> AppResult<Self> {
        let path = path.into();

        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str::<Vec<ManifestEntry>>(&content)
                .map_err(|e| PipelineError::ledger_io(&path, format!("JSON 解析失败: {}", e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("索引文件不存在，使用空索引: {}", path.display());
                Vec::new()
            }
            Err(e) => return Err(PipelineError::ledger_io(&path, e)),
        };

        let mut ledger = Self {
            path,
            retention_limit,
            entries,
            keys: HashSet::new(),
            legacy_titles: HashSet::new(),
        };
        ledger.enforce_retention();
        ledger.rebuild_keys();

        debug!("索引已加载: {} 条", ledger.entries.len());
        Ok(ledger)
    }

    /// 是否已处理过该去重键
    pub fn has(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// 文档是否已处理过：按 ID 匹配，旧版条目按标题匹配
    pub fn contains_document(&self, document: &SourceDocument) -> bool {
        self.keys.contains(&document.id) || self.legacy_titles.contains(document.title.trim())
    }

    /// 追加一条记录，超出上限时淘汰最旧的条目
    ///
    /// # 返回
    /// 被淘汰的条目（从旧到新）
    pub fn append(&mut self, entry: ManifestEntry) -> Vec<ManifestEntry> {
        self.index_entry(&entry);
        self.entries.push(entry);

        let evicted = self.enforce_retention();
        if !evicted.is_empty() {
            self.rebuild_keys();
            debug!("索引超出上限，淘汰 {} 条旧记录", evicted.len());
        }
        evicted
    }

    /// 原子写回索引文件
    pub async fn save(&self) -> AppResult<()> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| PipelineError::ledger_io(&self.path, e))?;
        write_atomic(&self.path, json.as_bytes())
            .await
            .map_err(|e| PipelineError::ledger_io(&self.path, e))?;
        debug!("索引已保存: {} 条", self.entries.len());
        Ok(())
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn enforce_retention(&mut self) -> Vec<ManifestEntry> {
        let overflow = self.entries.len().saturating_sub(self.retention_limit);
        self.entries.drain(..overflow).collect()
    }

    fn rebuild_keys(&mut self) {
        self.keys.clear();
        self.legacy_titles.clear();
        for entry in std::mem::take(&mut self.entries) {
            self.index_entry(&entry);
            self.entries.push(entry);
        }
    }

    fn index_entry(&mut self, entry: &ManifestEntry) {
        self.keys.insert(entry.dedup_key().to_string());
        if entry.source_document_id.is_empty() {
            self.legacy_titles.insert(entry.title.trim().to_string());
        }
    }
}
