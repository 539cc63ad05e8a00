use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "ACTU_QUIZ_CONFIG";
/// 默认配置文件
pub const DEFAULT_CONFIG_PATH: &str = "actu_quiz.toml";

/// 样板文本裁剪规则
///
/// 同时找到 `start` 与其后的 `end` 时，删除两者之间（含锚点本身）的内容
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoilerplateCut {
    pub start: String,
    pub end: String,
}

/// 程序配置文件
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 来源 ---
    /// HTML 新闻简报所在目录
    pub source_dir: String,
    /// 允许的来源（发件人），为空表示全部接受
    pub allowed_origins: Vec<String>,
    /// 每次运行最多考虑的文档数量（最近的 K 篇）
    pub batch_size: usize,

    // --- 内容清洗 ---
    /// 发送给 LLM 的纯文本最大字符数
    pub content_char_limit: usize,
    /// 是否保留清洗后的 HTML 片段用于展示
    pub keep_display_html: bool,
    /// 样板文本裁剪规则
    pub boilerplate_cuts: Vec<BoilerplateCut>,

    // --- 测验 ---
    /// 允许的主题列表
    pub themes: Vec<String>,
    /// 可接受的最少题目数
    pub min_questions: usize,

    // --- 输出 ---
    /// 测验文件输出目录
    pub output_dir: String,
    /// 索引文件路径
    pub manifest_path: String,
    /// 索引最多保留的条目数
    pub retention_limit: usize,
    /// 未提取到图片时使用的默认图片
    pub default_image_url: Option<String>,

    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 主模型失败后使用的备用模型
    pub llm_fallback_model_name: Option<String>,
    /// 备用模型的 API 地址，未设置时沿用主地址
    pub llm_fallback_api_base_url: Option<String>,
    /// 单次调用超时（秒）
    pub llm_timeout_secs: u64,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,

    // --- 日志 ---
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: "newsletters".to_string(),
            allowed_origins: Vec::new(),
            batch_size: 5,
            content_char_limit: 5000,
            keep_display_html: true,
            boilerplate_cuts: Vec::new(),
            themes: default_themes(),
            min_questions: 5,
            output_dir: "quizzes".to_string(),
            manifest_path: "quizzes/manifest.json".to_string(),
            retention_limit: 50,
            default_image_url: None,
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.0-flash-exp".to_string(),
            llm_fallback_model_name: Some("gemini-1.5-flash".to_string()),
            llm_fallback_api_base_url: None,
            llm_timeout_secs: 60,
            llm_temperature: 0.3,
            llm_max_tokens: 8192,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
        }
    }
}

/// 默认主题
pub fn default_themes() -> Vec<String> {
    [
        "POLITIQUE EN FRANCE",
        "POLITIQUE INTERNATIONALE ET CONFLITS",
        "SOCIÉTÉ / FAITS DE SOCIÉTÉ",
        "ÉCONOMIE ET EMPLOI",
        "ENVIRONNEMENT ET CLIMAT",
        "SCIENCE, SANTÉ ET TECHNOLOGIE",
        "CULTURE ET MÉDIAS",
        "SPORT",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Config {
    /// 加载配置：默认值 → TOML 文件 → 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let base = if Path::new(&path).exists() {
            Self::from_toml_file(&path)?
        } else {
            Self::default()
        };
        let config = base.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载，缺省字段使用默认值
    pub fn from_toml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileParseFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|e| ConfigError::FileParseFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 仅使用环境变量覆盖默认值
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// 用环境变量覆盖当前配置
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        let api_key = env_string("LLM_API_KEY")
            .or_else(|| env_string("GEMINI_API_KEY"))
            .unwrap_or(self.llm_api_key);

        Ok(Self {
            source_dir: env_string("SOURCE_DIR").unwrap_or(self.source_dir),
            batch_size: env_parsed("BATCH_SIZE", "usize")?.unwrap_or(self.batch_size),
            content_char_limit: env_parsed("CONTENT_CHAR_LIMIT", "usize")?
                .unwrap_or(self.content_char_limit),
            min_questions: env_parsed("MIN_QUESTIONS", "usize")?.unwrap_or(self.min_questions),
            output_dir: env_string("OUTPUT_DIR").unwrap_or(self.output_dir),
            manifest_path: env_string("MANIFEST_PATH").unwrap_or(self.manifest_path),
            retention_limit: env_parsed("RETENTION_LIMIT", "usize")?
                .unwrap_or(self.retention_limit),
            llm_api_key: api_key,
            llm_api_base_url: env_string("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: env_string("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            llm_fallback_model_name: env_string("LLM_FALLBACK_MODEL_NAME")
                .or(self.llm_fallback_model_name),
            llm_fallback_api_base_url: env_string("LLM_FALLBACK_API_BASE_URL")
                .or(self.llm_fallback_api_base_url),
            llm_timeout_secs: env_parsed("LLM_TIMEOUT_SECS", "u64")?
                .unwrap_or(self.llm_timeout_secs),
            verbose_logging: env_parsed("VERBOSE_LOGGING", "bool")?
                .unwrap_or(self.verbose_logging),
            output_log_file: env_string("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
            ..self
        })
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.themes.iter().all(|t| t.trim().is_empty()) {
            return Err(ConfigError::invalid("themes", "主题列表不能为空"));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::invalid("batch_size", "必须大于 0"));
        }
        if self.retention_limit == 0 {
            return Err(ConfigError::invalid("retention_limit", "必须大于 0"));
        }
        if self.retention_limit < self.batch_size {
            return Err(ConfigError::invalid(
                "retention_limit",
                format!("不能小于 batch_size ({})", self.batch_size),
            ));
        }
        if self.content_char_limit == 0 {
            return Err(ConfigError::invalid("content_char_limit", "必须大于 0"));
        }
        if !(1..=crate::models::QUESTIONS_PER_QUIZ).contains(&self.min_questions) {
            return Err(ConfigError::invalid(
                "min_questions",
                format!("必须在 1..={} 之间", crate::models::QUESTIONS_PER_QUIZ),
            ));
        }
        if self.llm_model_name.trim().is_empty() {
            return Err(ConfigError::invalid("llm_model_name", "不能为空"));
        }
        Ok(())
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str, expected_type: &str) -> Result<Option<T>, ConfigError> {
    match env_string(name) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
        None => Ok(None),
    }
}
