//! 发布服务 - 业务能力层
//!
//! 只负责"把一份测验写成文件并给出对应的索引条目"，不碰索引本身

use std::path::PathBuf;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppResult, PipelineError};
use crate::models::{ManifestEntry, Quiz};
use crate::utils::write_atomic;

/// 发布服务
pub struct Publisher {
    output_dir: PathBuf,
    default_image_url: Option<String>,
}

impl Publisher {
    /// 创建新的发布服务
    pub fn new(config: &Config) -> Self {
        Self {
            output_dir: PathBuf::from(&config.output_dir),
            default_image_url: config.default_image_url.clone(),
        }
    }

    /// 测验文件名，只由来源文档 ID 决定
    ///
    /// ID 含有非法字符时替换为 `_`，并附加 ID 哈希的前 8 位，避免不同 ID 撞名
    pub fn file_name_for(source_document_id: &str) -> String {
        let safe: String = source_document_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        if safe == source_document_id {
            format!("quiz_{}.json", safe)
        } else {
            let digest = format!("{:x}", Sha256::digest(source_document_id.as_bytes()));
            format!("quiz_{}-{}.json", safe, &digest[..8])
        }
    }

    pub fn path_for(&self, source_document_id: &str) -> PathBuf {
        self.output_dir.join(Self::file_name_for(source_document_id))
    }

    /// 写入测验文件并返回索引条目
    ///
    /// 同一 ID 重复发布时覆盖原文件
    pub async fn publish(&self, quiz: &Quiz) -> AppResult<ManifestEntry> {
        let file_name = Self::file_name_for(&quiz.source_document_id);
        let path = self.output_dir.join(&file_name);

        let json = serde_json::to_string_pretty(quiz).map_err(|e| PipelineError::PersistenceFailed {
            path: path.clone(),
            source: e.into(),
        })?;

        debug!("写入测验文件: {}", path.display());
        write_atomic(&path, json.as_bytes())
            .await
            .map_err(|e| PipelineError::PersistenceFailed {
                path: path.clone(),
                source: e,
            })?;

        info!("✓ 测验已写入: {} ({} 道题)", file_name, quiz.questions.len());

        Ok(ManifestEntry {
            date: quiz.date.clone(),
            file: file_name,
            title: quiz.title.clone(),
            source_document_id: quiz.source_document_id.clone(),
            image: quiz
                .image_url
                .clone()
                .or_else(|| self.default_image_url.clone()),
            theme: quiz.theme.clone(),
        })
    }
}
