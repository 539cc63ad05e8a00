use serde::{Deserialize, Serialize};

/// 索引中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub date: String,
    /// 测验文件名（相对输出目录）
    pub file: String,
    #[serde(alias = "titre")]
    pub title: String,
    /// 旧版索引没有这个字段，读取时为空
    #[serde(default, alias = "titre_original")]
    pub source_document_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub theme: String,
}

impl ManifestEntry {
    /// 去重键：优先使用来源文档 ID，旧条目退回到标题
    pub fn dedup_key(&self) -> &str {
        if self.source_document_id.is_empty() {
            &self.title
        } else {
            &self.source_document_id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_entry_dedups_by_title() {
        let legacy: ManifestEntry = serde_json::from_str(
            r#"{"file":"quiz_20240101_0800.json","title":"Édition du lundi","date":"20240101_0800","image":"https://via.placeholder.com/300x200"}"#,
        )
        .unwrap();

        assert_eq!(legacy.source_document_id, "");
        assert_eq!(legacy.dedup_key(), "Édition du lundi");
        assert_eq!(legacy.theme, "");
    }

    #[test]
    fn test_french_aliases_are_accepted() {
        let entry: ManifestEntry = serde_json::from_str(
            r#"{"file":"a.json","titre":"Titre","titre_original":"2024-01-01-titre","date":"2024-01-01","theme":"SPORT"}"#,
        )
        .unwrap();

        assert_eq!(entry.title, "Titre");
        assert_eq!(entry.dedup_key(), "2024-01-01-titre");
    }
}
