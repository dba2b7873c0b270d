//! The light markup report narratives are written in.
//!
//! Headings are `# Title` lines or lines whose only text is a `**bold**`
//! run (an emoji may precede it). Bullets start with `- `, `* ` or `• `, and
//! numbered items with `1. `. Inline `**bold**` works everywhere. Other
//! consecutive lines form a paragraph.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(Vec<Span>),
    ListItem { marker: String, spans: Vec<Span> },
    Paragraph(Vec<Span>),
}

/// Splits a line into plain and bold runs. An unmatched `**` is kept as
/// literal text.
pub fn parse_inline(line: &str) -> Vec<Span> {
    let parts: Vec<&str> = line.split("**").collect();
    let pairs = (parts.len() - 1) / 2;
    let mut spans: Vec<Span> = Vec::new();

    for (i, part) in parts.iter().enumerate() {
        let bold = i % 2 == 1 && i <= pairs * 2;
        let text = if i > pairs * 2 {
            // Everything after the last matched pair, with its marker
            format!("**{}", part)
        } else {
            part.to_string()
        };
        if text.is_empty() {
            continue;
        }
        match spans.last_mut() {
            Some(last) if last.bold == bold => last.text.push_str(&text),
            _ => spans.push(Span { text, bold }),
        }
    }
    spans
}

fn heading_text(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix('#') {
        let rest = rest.trim_start_matches('#');
        if rest.starts_with(' ') {
            return Some(rest.trim());
        }
    }

    let open = line.find("**")?;
    let inner = line[open + 2..].strip_suffix("**")?;
    let prefix = &line[..open];
    let decorated = prefix
        .chars()
        .any(|c| c.is_alphanumeric() || matches!(c, '-' | '*' | '•'));
    if inner.is_empty() || inner.contains("**") || decorated {
        return None;
    }
    Some(line)
}

fn list_item(line: &str) -> Option<(String, &str)> {
    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return Some(("•".to_string(), rest.trim_start()));
        }
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(". ") {
            return Some((format!("{}.", &line[..digits]), rest.trim_start()));
        }
    }
    None
}

/// Parses a narrative into blocks.
pub fn parse(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            flush(&mut paragraph, &mut blocks);
        } else if let Some(heading) = heading_text(line) {
            flush(&mut paragraph, &mut blocks);
            let spans = parse_inline(heading)
                .into_iter()
                .map(|s| Span::bold(s.text))
                .collect();
            blocks.push(Block::Heading(merge(spans)));
        } else if let Some((marker, rest)) = list_item(line) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::ListItem {
                marker,
                spans: parse_inline(rest),
            });
        } else {
            paragraph.push(line);
        }
    }
    flush(&mut paragraph, &mut blocks);

    blocks
}

fn flush(paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>) {
    if !paragraph.is_empty() {
        blocks.push(Block::Paragraph(parse_inline(&paragraph.join(" "))));
        paragraph.clear();
    }
}

fn merge(spans: Vec<Span>) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for span in spans {
        match merged.last_mut() {
            Some(last) if last.bold == span.bold => last.text.push_str(&span.text),
            _ => merged.push(span),
        }
    }
    merged
}
