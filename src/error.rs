use std::path::PathBuf;

use thiserror::Error;

/// 流水线错误类型
///
/// 与处理阶段一一对应，决定错误的传播范围：
/// - `SourceUnavailable` / `LedgerIo` 终止整个运行
/// - 其余错误只影响当前文档，后续文档照常处理
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 来源不可达（目录不存在、邮箱连接失败等）
    #[error("来源不可用 ({source_name}): {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// 文档没有可提取的文本
    #[error("文档没有可用文本: {id}")]
    EmptyDocument { id: String },

    /// 调用 LLM 失败（网络、超时、配额）
    #[error("LLM 调用失败 (模型: {model}): {reason}")]
    OracleCallFailed { model: String, reason: String },

    /// LLM 返回内容无法解析或未通过校验
    #[error("LLM 返回内容无效 (模型: {model}): {reason}")]
    MalformedOracleResponse { model: String, reason: String },

    /// 所有尝试都失败
    #[error("题目生成失败 (共尝试 {attempts} 次): {last}")]
    GenerationFailed {
        attempts: usize,
        last: Box<PipelineError>,
    },

    /// 测验文件写入失败
    #[error("写入文件失败 ({}): {source}", path.display())]
    PersistenceFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 索引文件读写失败
    #[error("索引文件读写失败 ({}): {reason}", path.display())]
    LedgerIo { path: PathBuf, reason: String },

    /// 配置错误
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },

    /// 配置文件读取或解析失败
    #[error("配置文件解析失败 ({path}): {reason}")]
    FileParseFailed { path: String, reason: String },

    /// 配置值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    InvalidValue { field: String, reason: String },
}

// ========== 便捷构造函数 ==========

impl PipelineError {
    /// 创建来源不可用错误
    pub fn source_unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    /// 创建 LLM 调用失败错误
    pub fn oracle_failed(model: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::OracleCallFailed {
            model: model.into(),
            reason: reason.to_string(),
        }
    }

    /// 创建 LLM 返回内容无效错误
    pub fn malformed(model: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::MalformedOracleResponse {
            model: model.into(),
            reason: reason.to_string(),
        }
    }

    /// 创建索引读写错误
    pub fn ledger_io(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PipelineError::LedgerIo {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// 是否需要终止整个运行
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::SourceUnavailable { .. }
                | PipelineError::LedgerIo { .. }
                | PipelineError::Config(_)
        )
    }
}

impl ConfigError {
    /// 创建配置值不合法错误
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 流水线结果类型
pub type AppResult<T> = Result<T, PipelineError>;
