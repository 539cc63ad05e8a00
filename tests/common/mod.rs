//! 集成测试共用的内存来源和脚本化 LLM
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actu_quiz::{AppResult, Config, Oracle, OracleTarget, PipelineError, SourceDocument, SourceReader};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};

/// 内存来源：每次 `fetch` 返回同一组文档
pub struct StaticSource {
    documents: Vec<SourceDocument>,
    unavailable: bool,
}

impl StaticSource {
    pub fn new(documents: Vec<SourceDocument>) -> Self {
        Self {
            documents,
            unavailable: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            documents: Vec::new(),
            unavailable: true,
        }
    }
}

#[async_trait]
impl SourceReader for StaticSource {
    fn name(&self) -> String {
        "内存来源".to_string()
    }

    async fn fetch(&self) -> AppResult<Vec<SourceDocument>> {
        if self.unavailable {
            return Err(PipelineError::source_unavailable(self.name(), "连接被拒绝"));
        }
        Ok(self.documents.clone())
    }
}

/// 预设的一次 LLM 响应
pub enum Reply {
    Text(String),
    Fail(String),
    /// 超过调用超时后才返回
    Hang(Duration),
}

/// 按顺序回放预设响应，并记录每次调用的模型
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn call(&self, target: &OracleTarget, _prompt: &str) -> Result<String> {
        self.calls.lock().unwrap().push(target.model.clone());
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(reason)) => Err(anyhow::anyhow!(reason)),
            Some(Reply::Hang(delay)) => {
                tokio::time::sleep(delay).await;
                Err(anyhow::anyhow!("响应来得太晚"))
            }
            None => Err(anyhow::anyhow!("没有更多预设响应")),
        }
    }
}

pub fn question(i: usize, theme: &str) -> Value {
    json!({
        "question": format!("Question {} sur l'actualité ?", i + 1),
        "options": ["Réponse A", "Réponse B", "Réponse C", "Réponse D"],
        "correct": i % 4,
        "theme": theme,
        "explanation": "D'après l'article.",
    })
}

/// 十道合法题目的 JSON 响应
pub fn valid_reply() -> Reply {
    let questions: Vec<_> = (0..10).map(|i| question(i, "SPORT")).collect();
    Reply::Text(json!({ "questions": questions }).to_string())
}

pub fn document(id: &str, date: &str) -> SourceDocument {
    SourceDocument::new(
        id,
        format!("Édition {}", id),
        NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        format!("<html><body><h1>Édition {}</h1><p>Le Tour de France part de Lille.</p></body></html>", id),
    )
}

/// 所有输出都落在临时目录里的配置
pub fn config_in(dir: &Path) -> Config {
    Config {
        output_dir: dir.join("quizzes").to_string_lossy().to_string(),
        manifest_path: dir.join("quizzes").join("manifest.json").to_string_lossy().to_string(),
        output_log_file: dir.join("output.txt").to_string_lossy().to_string(),
        llm_model_name: "primary-model".into(),
        llm_fallback_model_name: Some("fallback-model".into()),
        ..Config::default()
    }
}

pub fn read_manifest(config: &Config) -> Vec<Value> {
    let content = std::fs::read_to_string(&config.manifest_path).unwrap();
    serde_json::from_str(&content).unwrap()
}

pub fn manifest_ids(config: &Config) -> Vec<String> {
    read_manifest(config)
        .iter()
        .map(|e| e["sourceDocumentId"].as_str().unwrap().to_string())
        .collect()
}

pub fn quiz_files(config: &Config) -> Vec<String> {
    let mut names: Vec<_> = std::fs::read_dir(&config.output_dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .filter(|n| n.starts_with("quiz_"))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
