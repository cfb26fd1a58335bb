//! Readers for the text-based formats: plain text, Markdown, HTML and CSV.
//!
//! All four are pure `&str → Vec<TextElement>` functions. The HTML reader is a
//! tag scanner, not a DOM: it only needs to know where blocks start and end
//! and which blocks are headings, list items or tables.

use crate::error::ExtractError;
use crate::pipeline::extract::{ElementKind, TextElement};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static RE_PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_MD_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s{0,3}#{1,6}\s+(.*?)(?:\s+#+)?\s*$").unwrap());
static RE_MD_LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*+]|\d{1,9}[.)])\s+(.*)$").unwrap());
static RE_HTML_DROP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>|<head\b.*?</head\s*>|<noscript\b.*?</noscript\s*>",
    )
    .unwrap()
});
static RE_HTML_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<(/?)([a-zA-Z][a-zA-Z0-9]*)\b[^>]*>").unwrap());
static RE_HTML_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[a-zA-Z]{2,8});").unwrap());

// ── Plain text ───────────────────────────────────────────────────────────────

/// One element per blank-line separated paragraph.
pub fn extract_plain(text: &str) -> Vec<TextElement> {
    let text = text.replace("\r\n", "\n");
    RE_PARAGRAPH_BREAK
        .split(&text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| TextElement::new(ElementKind::NarrativeText, p))
        .collect()
}

// ── Markdown ─────────────────────────────────────────────────────────────────

/// Headings become titles, list lines become list items, fenced code is kept
/// verbatim, and consecutive remaining lines form one paragraph.
pub fn extract_markdown(text: &str) -> Vec<TextElement> {
    let text = text.replace("\r\n", "\n");
    let mut elements = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut fence: Option<Vec<&str>> = None;

    for line in text.lines() {
        if let Some(code) = fence.as_mut() {
            if line.trim_start().starts_with("```") {
                let body = code.join("\n");
                if !body.trim().is_empty() {
                    elements.push(TextElement::new(ElementKind::Text, body));
                }
                fence = None;
            } else {
                code.push(line);
            }
            continue;
        }

        if line.trim_start().starts_with("```") {
            flush_paragraph(&mut paragraph, &mut elements);
            fence = Some(Vec::new());
        } else if line.trim().is_empty() {
            flush_paragraph(&mut paragraph, &mut elements);
        } else if let Some(caps) = RE_MD_HEADING.captures(line) {
            flush_paragraph(&mut paragraph, &mut elements);
            elements.push(TextElement::new(ElementKind::Title, caps[1].trim()));
        } else if let Some(caps) = RE_MD_LIST_ITEM.captures(line) {
            flush_paragraph(&mut paragraph, &mut elements);
            elements.push(TextElement::new(ElementKind::ListItem, caps[1].trim()));
        } else {
            paragraph.push(line.trim());
        }
    }

    // Unterminated fence: keep what was inside it.
    if let Some(code) = fence {
        let body = code.join("\n");
        if !body.trim().is_empty() {
            elements.push(TextElement::new(ElementKind::Text, body));
        }
    }
    flush_paragraph(&mut paragraph, &mut elements);
    elements
}

fn flush_paragraph(lines: &mut Vec<&str>, elements: &mut Vec<TextElement>) {
    if !lines.is_empty() {
        elements.push(TextElement::new(ElementKind::NarrativeText, lines.join(" ")));
        lines.clear();
    }
}

// ── HTML ─────────────────────────────────────────────────────────────────────

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "header", "hr", "html", "li", "main", "nav", "ol", "p", "pre",
    "section", "title", "ul",
];

/// Blocks become elements; `h1`–`h6` are titles, `li` list items and each
/// `table` a single table element with one line per row.
pub fn extract_html(html: &str) -> Vec<TextElement> {
    let html = RE_HTML_DROP.replace_all(html, " ");
    let mut scanner = HtmlScanner::default();
    let mut cursor = 0;

    for caps in RE_HTML_TAG.captures_iter(&html) {
        let Some(whole) = caps.get(0) else { continue };
        scanner.text(&html[cursor..whole.start()]);
        cursor = whole.end();
        let closing = &caps[1] == "/";
        let tag = caps[2].to_ascii_lowercase();
        scanner.tag(&tag, closing);
    }
    scanner.text(&html[cursor..]);
    scanner.finish()
}

#[derive(Default)]
struct HtmlScanner {
    elements: Vec<TextElement>,
    buffer: String,
    kind: Option<ElementKind>,
    table_depth: usize,
    table: Vec<Vec<String>>,
}

impl HtmlScanner {
    fn text(&mut self, raw: &str) {
        if raw.is_empty() {
            return;
        }
        let decoded = decode_entities(raw);
        if self.table_depth > 0 {
            if let Some(cell) = self.table.last_mut().and_then(|row| row.last_mut()) {
                cell.push_str(&decoded);
            }
        } else {
            self.buffer.push_str(&decoded);
        }
    }

    fn tag(&mut self, tag: &str, closing: bool) {
        match tag {
            "table" => {
                if closing {
                    self.table_depth = self.table_depth.saturating_sub(1);
                    if self.table_depth == 0 {
                        self.flush_table();
                    }
                } else {
                    if self.table_depth == 0 {
                        self.flush();
                    }
                    self.table_depth += 1;
                }
            }
            "tr" if self.table_depth > 0 && !closing => self.table.push(Vec::new()),
            "td" | "th" if self.table_depth > 0 && !closing => {
                if self.table.is_empty() {
                    self.table.push(Vec::new());
                }
                if let Some(row) = self.table.last_mut() {
                    row.push(String::new());
                }
            }
            "br" if self.table_depth == 0 => self.buffer.push(' '),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                self.kind = if closing { None } else { Some(ElementKind::Title) };
            }
            "li" => {
                self.flush();
                self.kind = if closing { None } else { Some(ElementKind::ListItem) };
            }
            t if self.table_depth == 0 && BLOCK_TAGS.contains(&t) => {
                self.flush();
                self.kind = None;
            }
            _ => {}
        }
    }

    fn flush(&mut self) {
        let text = collapse_whitespace(&self.buffer);
        self.buffer.clear();
        if !text.is_empty() {
            let kind = self.kind.unwrap_or(ElementKind::NarrativeText);
            self.elements.push(TextElement::new(kind, text));
        }
    }

    fn flush_table(&mut self) {
        let rows: Vec<String> = self
            .table
            .drain(..)
            .map(|row| {
                row.iter()
                    .map(|c| collapse_whitespace(c))
                    .filter(|c| !c.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|r| !r.is_empty())
            .collect();
        if !rows.is_empty() {
            self.elements
                .push(TextElement::new(ElementKind::Table, rows.join("\n")));
        }
    }

    fn finish(mut self) -> Vec<TextElement> {
        if self.table_depth > 0 {
            self.flush_table();
        }
        self.flush();
        self.elements
    }
}

fn collapse_whitespace(s: &str) -> String {
    RE_WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Decode the common named entities and all numeric character references.
/// Unknown names are left as written.
fn decode_entities(s: &str) -> String {
    RE_HTML_ENTITY
        .replace_all(s, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match body {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    "copy" => Some('©'),
                    "reg" => Some('®'),
                    "euro" => Some('€'),
                    "pound" => Some('£'),
                    "mdash" => Some('—'),
                    "ndash" => Some('–'),
                    "hellip" => Some('…'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}

// ── CSV ──────────────────────────────────────────────────────────────────────

/// The whole file is one table element: one line per record, cells joined by
/// a space. Quoted fields may contain commas, doubled quotes and newlines.
pub fn extract_csv(name: &str, text: &str) -> Result<Vec<TextElement>, ExtractError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ExtractError::Corrupt {
            name: name.to_string(),
            kind: "CSV".into(),
            detail: e.to_string(),
        })?;
        let line = record
            .iter()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !line.is_empty() {
            lines.push(line);
        }
    }

    if lines.is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![TextElement::new(ElementKind::Table, lines.join("\n"))])
}
