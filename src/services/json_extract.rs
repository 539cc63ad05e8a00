//! 从 LLM 的自由文本中定位并解析 JSON
//!
//! LLM 不保证结构化输出，响应里可能带 markdown 代码块或前后说明文字。
//! 这里按出现顺序尝试每个 `{` / `[`，找到与之平衡的闭合括号后交给
//! `serde_json` 解析，返回第一个合法的 JSON 值。
//!
//! 最多尝试 `MAX_CANDIDATES` 个起始括号，括号残缺的长响应也只扫描有限次。

use serde_json::Value;
use thiserror::Error;

/// JSON 定位失败的原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonExtractError {
    #[error("响应中没有 JSON 对象或数组")]
    NotFound,
    #[error("JSON 括号不完整")]
    Unbalanced,
    #[error("JSON 解析失败: {0}")]
    Invalid(String),
}

/// 最多尝试的起始括号数
const MAX_CANDIDATES: usize = 32;

/// 提取文本中第一个合法的 JSON 对象或数组
pub fn extract_json(text: &str) -> Result<Value, JsonExtractError> {
    let mut last_err: Option<JsonExtractError> = None;
    let mut search_from = 0;
    let mut candidates = 0;

    while let Some(offset) = text[search_from..].find(['{', '[']) {
        if candidates == MAX_CANDIDATES {
            break;
        }
        candidates += 1;
        let start = search_from + offset;

        match find_matching_close(text, start) {
            Some(end) => match serde_json::from_str::<Value>(&text[start..=end]) {
                Ok(value) => return Ok(value),
                Err(e) => last_err = Some(JsonExtractError::Invalid(e.to_string())),
            },
            None => {
                if last_err.is_none() {
                    last_err = Some(JsonExtractError::Unbalanced);
                }
            }
        }

        // `{` 和 `[` 都是单字节字符
        search_from = start + 1;
    }

    Err(last_err.unwrap_or(JsonExtractError::NotFound))
}

/// 找到 `start` 处括号对应的闭合括号位置（字节下标）
///
/// 字符串字面量内的括号不计入；遇到不匹配的闭合括号返回 `None`
fn find_matching_close(text: &str, start: usize) -> Option<usize> {
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in text.as_bytes()[start..].iter().enumerate() {
        if in_string {
            match (escaped, b) {
                (true, _) => escaped = false,
                (false, b'\\') => escaped = true,
                (false, b'"') => in_string = false,
                _ => {}
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => stack.push(b'}'),
            b'[' => stack.push(b']'),
            b'}' | b']' => {
                if stack.pop() != Some(*b) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }

    None
}
