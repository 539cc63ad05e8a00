//! 内容清洗服务 - 业务能力层
//!
//! 只负责把一篇原始 HTML / 文本变成可以交给 LLM 的纯文本：
//! - 删除 `<head>`、脚本、样式、注释、页眉页脚
//! - 删除隐藏元素（`display:none` / `visibility:hidden`）和 1×1 跟踪像素
//! - 按配置的起止锚点裁掉样板段落，锚点缺失时跳过
//! - 截断到配置的字符上限
//!
//! 解析是尽力而为的：残缺的标签不会报错，最差情况下只是多留了一些文字。

use anyhow::Result;
use regex::{Captures, Regex};
use tracing::debug;

use crate::config::{BoilerplateCut, Config};
use crate::models::NormalizedContent;
use crate::utils::truncate_chars;

/// 整段删除的元素
const STRIPPED_ELEMENTS: &[&str] = &["head", "script", "style", "noscript", "header", "footer"];

/// 标题最大长度
const MAX_TITLE_CHARS: usize = 100;

/// 内容清洗服务
pub struct ContentNormalizer {
    char_limit: usize,
    keep_display_html: bool,
    cuts: Vec<BoilerplateCut>,
    comment_re: Regex,
    element_res: Vec<Regex>,
    styled_open_re: Regex,
    hidden_style_re: Regex,
    img_re: Regex,
    src_re: Regex,
    pixel_re: Regex,
    body_re: Regex,
    empty_block_re: Regex,
    line_break_re: Regex,
    tag_re: Regex,
    entity_re: Regex,
    spaces_re: Regex,
}

impl ContentNormalizer {
    /// 创建新的内容清洗服务
    pub fn new(config: &Config) -> Result<Self> {
        let element_res = STRIPPED_ELEMENTS
            .iter()
            .map(|name| Regex::new(&format!(r"(?is)<{0}\b[^>]*>.*?</{0}\s*>", name)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            char_limit: config.content_char_limit,
            keep_display_html: config.keep_display_html,
            cuts: config.boilerplate_cuts.clone(),
            comment_re: Regex::new(r"(?s)<!--.*?-->")?,
            element_res,
            styled_open_re: Regex::new(
                r#"(?i)<([a-z][a-z0-9]*)\b[^>]*?\bstyle\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*>"#,
            )?,
            hidden_style_re: Regex::new(r"(?i)display\s*:\s*none|visibility\s*:\s*hidden")?,
            img_re: Regex::new(r"(?i)<img\b[^>]*>")?,
            src_re: Regex::new(r#"(?i)\bsrc\s*=\s*["']([^"']+)["']"#)?,
            pixel_re: Regex::new(r#"(?i)\b(?:width|height)\s*=\s*["']?[01](?:px)?(?:["'\s/>]|$)"#)?,
            body_re: Regex::new(r"(?is)<body\b[^>]*>(.*)</body\s*>")?,
            empty_block_re: Regex::new(&empty_block_pattern())?,
            line_break_re: Regex::new(
                r"(?i)<br\s*/?>|</(?:p|div|tr|li|ul|ol|h[1-6]|table|section|article|blockquote)\s*>",
            )?,
            tag_re: Regex::new(r"(?s)<[^>]*>")?,
            entity_re: Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});")?,
            spaces_re: Regex::new(r"[ \t\u{a0}]+")?,
        })
    }

    /// 清洗原始内容
    ///
    /// 相同输入总是得到相同输出；`plain_text` 的字符数不超过上限
    pub fn normalize(&self, raw: &str) -> NormalizedContent {
        let cleaned_html = self.strip_markup_noise(raw);
        let image_url = self.first_image_url(&cleaned_html);
        let cleaned_html = self.strip_tracking_images(&cleaned_html);

        let text = self.html_to_text(&cleaned_html);
        let text = self.cut_boilerplate(&text);
        let plain_text = truncate_chars(&text, self.char_limit);

        debug!(
            "清洗完成: 原始 {} 字符 → 纯文本 {} 字符",
            raw.chars().count(),
            plain_text.chars().count()
        );

        let display_html = if self.keep_display_html {
            let fragment = self.cut_boilerplate(&self.body_fragment(&cleaned_html));
            let fragment = self.empty_block_re.replace_all(&fragment, "");
            Some(fragment.trim().to_string()).filter(|h| !h.is_empty())
        } else {
            None
        };

        NormalizedContent {
            plain_text,
            display_html,
            image_url,
        }
    }

    /// 删除注释、整段元素和隐藏元素
    fn strip_markup_noise(&self, raw: &str) -> String {
        let mut html = self.comment_re.replace_all(raw, "").into_owned();
        for re in &self.element_res {
            html = re.replace_all(&html, "").into_owned();
        }
        self.strip_hidden_elements(&html)
    }

    /// 删除带隐藏样式的元素（含其子元素）
    fn strip_hidden_elements(&self, html: &str) -> String {
        let mut out = String::with_capacity(html.len());
        let mut cursor = 0;

        while let Some(caps) = self.styled_open_re.captures_at(html, cursor) {
            let (Some(whole), Some(tag)) = (caps.get(0), caps.get(1)) else {
                break;
            };
            let style = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or("");

            if !self.hidden_style_re.is_match(style) {
                out.push_str(&html[cursor..whole.end()]);
                cursor = whole.end();
                continue;
            }

            out.push_str(&html[cursor..whole.start()]);
            cursor = find_element_end(html, tag.as_str(), whole.end()).unwrap_or(whole.end());
        }

        out.push_str(&html[cursor..]);
        out
    }

    fn is_tracking_pixel(&self, img_tag: &str) -> bool {
        self.pixel_re.is_match(img_tag)
    }

    /// 第一张可展示的远程图片
    fn first_image_url(&self, html: &str) -> Option<String> {
        self.img_re
            .find_iter(html)
            .filter(|m| !self.is_tracking_pixel(m.as_str()))
            .filter_map(|m| self.src_re.captures(m.as_str()))
            .filter_map(|caps| caps.get(1).map(|s| s.as_str().trim().to_string()))
            .find(|src| src.starts_with("http://") || src.starts_with("https://"))
    }

    /// 删除跟踪像素和内嵌的 `cid:` 图片
    fn strip_tracking_images(&self, html: &str) -> String {
        self.img_re
            .replace_all(html, |caps: &Captures| {
                let tag = &caps[0];
                let is_cid = self
                    .src_re
                    .captures(tag)
                    .and_then(|c| c.get(1))
                    .map(|src| src.as_str().trim_start().starts_with("cid:"))
                    .unwrap_or(false);
                if is_cid || self.is_tracking_pixel(tag) {
                    String::new()
                } else {
                    tag.to_string()
                }
            })
            .into_owned()
    }

    fn html_to_text(&self, html: &str) -> String {
        let text = self.line_break_re.replace_all(html, "\n");
        let text = self.tag_re.replace_all(&text, "");
        let text = decode_entities(&self.entity_re, &text);

        let mut lines: Vec<String> = Vec::new();
        for line in text.lines() {
            let line = self.spaces_re.replace_all(line, " ").trim().to_string();
            if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
                continue;
            }
            lines.push(line);
        }
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }

    /// 按锚点裁掉样板段落
    fn cut_boilerplate(&self, text: &str) -> String {
        let mut text = text.to_string();
        for cut in &self.cuts {
            if cut.start.is_empty() || cut.end.is_empty() {
                continue;
            }
            let Some(start) = text.find(&cut.start) else {
                debug!("未找到样板起始锚点，跳过: {}", cut.start);
                continue;
            };
            let search_from = start + cut.start.len();
            let Some(end_offset) = text[search_from..].find(&cut.end) else {
                debug!("未找到样板结束锚点，跳过: {}", cut.end);
                continue;
            };
            let end = search_from + end_offset + cut.end.len();
            text.replace_range(start..end, "");
        }
        text.trim().to_string()
    }

    fn body_fragment(&self, html: &str) -> String {
        self.body_re
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or(html)
            .trim()
            .to_string()
    }
}

/// 裁剪后留下的空块元素，如 `<p></p>`
fn empty_block_pattern() -> String {
    let alternatives: Vec<String> = ["p", "div", "span", "td", "li", "section"]
        .iter()
        .map(|tag| format!(r"<{0}\b[^>]*>\s*</{0}\s*>", tag))
        .collect();
    format!("(?i){}", alternatives.join("|"))
}

/// 从 `open_end` 开始找 `tag` 对应的闭合标签结束位置，同名嵌套会计数
fn find_element_end(html: &str, tag: &str, open_end: usize) -> Option<usize> {
    let lower = html.to_ascii_lowercase();
    let tag = tag.to_ascii_lowercase();
    let open_pat = format!("<{}", tag);
    let close_pat = format!("</{}", tag);

    let mut depth = 1usize;
    let mut pos = open_end;

    while depth > 0 {
        let next_open = find_tag(&lower, &open_pat, pos);
        let next_close = find_tag(&lower, &close_pat, pos)?;

        match next_open {
            Some(open) if open < next_close => {
                depth += 1;
                pos = open + open_pat.len();
            }
            _ => {
                depth -= 1;
                let close_end = lower[next_close..].find('>')? + next_close + 1;
                if depth == 0 {
                    return Some(close_end);
                }
                pos = close_end;
            }
        }
    }

    None
}

/// 查找 `<tag` 或 `</tag`，要求其后是标签名边界
fn find_tag(lower: &str, pat: &str, from: usize) -> Option<usize> {
    let mut pos = from;
    while let Some(offset) = lower.get(pos..)?.find(pat) {
        let idx = pos + offset;
        let next = lower.as_bytes().get(idx + pat.len()).copied();
        if matches!(next, None | Some(b'>') | Some(b'/') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r')) {
            return Some(idx);
        }
        pos = idx + pat.len();
    }
    None
}

fn decode_entities(entity_re: &Regex, text: &str) -> String {
    entity_re
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let decoded = if let Some(num) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(num, 16).ok().and_then(char::from_u32)
            } else if let Some(num) = name.strip_prefix('#') {
                num.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(name)
            };
            match decoded {
                Some('\u{a0}') => " ".to_string(),
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "nbsp" => ' ',
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "rsquo" => '’',
        "lsquo" => '‘',
        "ldquo" => '“',
        "rdquo" => '”',
        "laquo" => '«',
        "raquo" => '»',
        "hellip" => '…',
        "ndash" => '–',
        "mdash" => '—',
        "euro" => '€',
        "eacute" => 'é',
        "egrave" => 'è',
        "ecirc" => 'ê',
        "agrave" => 'à',
        "acirc" => 'â',
        "ccedil" => 'ç',
        "ocirc" => 'ô',
        "ucirc" => 'û',
        "ugrave" => 'ù',
        "icirc" => 'î',
        "iuml" => 'ï',
        "Eacute" => 'É',
        "Agrave" => 'À',
        _ => return None,
    };
    Some(c)
}

// ========== 元数据提取 ==========

/// 提取标题：`<h1>` → `<h2>` → `<title>`
pub fn extract_title(html: &str) -> Option<String> {
    ["h1", "h2", "title"].iter().find_map(|tag| {
        let re = Regex::new(&format!(r"(?is)<{0}\b[^>]*>(.*?)</{0}\s*>", tag)).ok()?;
        let inner = re.captures(html)?.get(1)?.as_str();
        let text = inline_text(inner)?;
        Some(truncate_chars(&text, MAX_TITLE_CHARS))
    })
}

/// 提取 `<meta name="..." content="...">` 的内容，名称不区分大小写
pub fn extract_meta(html: &str, name: &str) -> Option<String> {
    let meta_re = Regex::new(r"(?is)<meta\b[^>]*>").ok()?;
    let attr_re = Regex::new(r#"(?i)\b([a-z][a-z-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).ok()?;

    let found = meta_re.find_iter(html).find_map(|m| {
        let mut meta_name = None;
        let mut content = None;
        for caps in attr_re.captures_iter(m.as_str()) {
            let value = caps.get(2).or_else(|| caps.get(3)).map(|v| v.as_str().trim().to_string());
            match caps[1].to_ascii_lowercase().as_str() {
                "name" | "property" => meta_name = value,
                "content" => content = value,
                _ => {}
            }
        }
        if meta_name?.eq_ignore_ascii_case(name) {
            content.filter(|c| !c.is_empty())
        } else {
            None
        }
    });
    found
}

/// 行内 HTML 转为单行文本
fn inline_text(fragment: &str) -> Option<String> {
    let tag_re = Regex::new(r"(?s)<[^>]*>").ok()?;
    let entity_re = Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").ok()?;
    let text = tag_re.replace_all(fragment, " ");
    let text = decode_entities(&entity_re, &text);
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    Some(text).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer_with(config: Config) -> ContentNormalizer {
        ContentNormalizer::new(&config).unwrap()
    }

    fn normalizer() -> ContentNormalizer {
        normalizer_with(Config::default())
    }

    #[test]
    fn test_strips_scripts_styles_and_comments() {
        let html = r#"<html><head><title>T</title><style>p { color: red }</style></head>
            <body><script>alert("x")</script><!-- secret --><p>Bonjour&nbsp;à tous</p>
            <noscript>activez JS</noscript><p>Deuxième &amp; dernier</p></body></html>"#;

        let content = normalizer().normalize(html);

        assert_eq!(content.plain_text, "Bonjour à tous\n\nDeuxième & dernier");
        let display = content.display_html.unwrap();
        assert!(!display.contains("<script"));
        assert!(!display.contains("<style"));
        assert!(!display.contains("secret"));
    }

    #[test]
    fn test_removes_hidden_elements_with_nesting() {
        let html = r#"<div>Visible</div>
            <div style="display: none"><div>caché</div><span>aussi caché</span></div>
            <span style='visibility:hidden'>invisible</span>
            <p style="color: blue">Toujours là</p>"#;

        let text = normalizer().normalize(html).plain_text;

        assert!(text.contains("Visible"));
        assert!(text.contains("Toujours là"));
        assert!(!text.contains("caché"));
        assert!(!text.contains("invisible"));
    }

    #[test]
    fn test_tracking_pixels_and_image_url() {
        let html = r#"<img src="https://track.example.com/open.gif" width="1" height="1">
            <img src="cid:logo@mail">
            <img src="https://cdn.example.com/une.jpg" width="600">
            <p>Texte</p>"#;

        let content = normalizer().normalize(html);

        assert_eq!(content.image_url.as_deref(), Some("https://cdn.example.com/une.jpg"));
        let display = content.display_html.unwrap();
        assert!(!display.contains("track.example.com"));
        assert!(!display.contains("cid:"));
        assert!(display.contains("une.jpg"));
    }

    #[test]
    fn test_plain_text_is_capped() {
        let config = Config {
            content_char_limit: 100,
            ..Config::default()
        };
        let huge = format!("<p>{}</p>", "é".repeat(1_000_000));

        let content = normalizer_with(config).normalize(&huge);

        assert_eq!(content.plain_text.chars().count(), 100);
    }

    #[test]
    fn test_boilerplate_cut_and_missing_anchor() {
        let config = Config {
            boilerplate_cuts: vec![
                BoilerplateCut {
                    start: "PUBLICITÉ".into(),
                    end: "FIN PUBLICITÉ".into(),
                },
                BoilerplateCut {
                    start: "Se désabonner".into(),
                    end: "ANCRE ABSENTE".into(),
                },
            ],
            ..Config::default()
        };
        let html = "<p>Début</p><p>PUBLICITÉ achetez FIN PUBLICITÉ</p><p>Suite</p><p>Se désabonner ici</p>";

        let content = normalizer_with(config).normalize(html);
        let text = content.plain_text;

        assert!(!text.contains("achetez"));
        assert!(text.contains("Début"));
        assert!(text.contains("Suite"));
        // 结束锚点缺失时不裁剪
        assert!(text.contains("Se désabonner ici"));

        // 展示用 HTML 同样去掉样板段落，不留空段落
        let display = content.display_html.unwrap();
        assert!(!display.contains("achetez"));
        assert!(!display.contains("<p></p>"));
        assert!(display.starts_with("<p>Début</p><p>Suite</p>"));
    }

    #[test]
    fn test_malformed_markup_does_not_panic_and_is_deterministic() {
        let html = r#"<div style="display:none"><p>jamais fermé <b>gras <i>texte & < > "#;
        let a = normalizer().normalize(html);
        let b = normalizer().normalize(html);
        assert_eq!(a, b);

        let plain = normalizer().normalize("Juste du texte brut.");
        assert_eq!(plain.plain_text, "Juste du texte brut.");
    }

    #[test]
    fn test_empty_after_cleaning() {
        let content = normalizer().normalize("<script>x()</script><style>a{}</style>");
        assert!(content.is_empty());
    }

    #[test]
    fn test_extract_title_priority() {
        assert_eq!(
            extract_title("<title>Onglet</title><h2>Sous-titre</h2><h1> Le <b>grand</b> titre </h1>").as_deref(),
            Some("Le grand titre")
        );
        assert_eq!(
            extract_title("<title>Onglet</title><h2>Sous-titre</h2>").as_deref(),
            Some("Sous-titre")
        );
        assert_eq!(extract_title("<title>L&#39;essentiel</title>").as_deref(), Some("L'essentiel"));
        assert_eq!(extract_title("<p>rien</p>"), None);
    }

    #[test]
    fn test_extract_meta() {
        let html = r#"<meta content="2024-03-05" name="date"><meta name="Sender" content="news@kessel.media">"#;
        assert_eq!(extract_meta(html, "date").as_deref(), Some("2024-03-05"));
        assert_eq!(extract_meta(html, "sender").as_deref(), Some("news@kessel.media"));
        assert_eq!(extract_meta(html, "author"), None);
    }
}
