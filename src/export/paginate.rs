//! Line wrapping and page breaking for the paginated export.
//!
//! Pages only break between whole lines, and a page never ends on a
//! heading: the heading moves to the next page with the text it introduces.

use super::markup::{Block, Span};

/// Page geometry in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    /// Characters per line
    pub width: usize,
    /// Lines per page
    pub height: usize,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            width: 90,
            height: 48,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Heading,
    ListItem,
    Body,
    Blank,
}

/// One rendered line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub kind: LineKind,
    /// Leading cells reserved for a list marker
    pub indent: usize,
    pub spans: Vec<Span>,
}

impl Line {
    fn blank() -> Self {
        Self {
            kind: LineKind::Blank,
            indent: 0,
            spans: Vec::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.kind == LineKind::Blank
    }

    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub lines: Vec<Line>,
}

fn width_of(s: &str) -> usize {
    s.chars().count()
}

/// Greedy word wrap that keeps each word's bold flag. Words longer than
/// the width get a line of their own.
fn wrap_spans(spans: &[Span], width: usize) -> Vec<Vec<Span>> {
    let width = width.max(1);
    let mut lines: Vec<Vec<Span>> = Vec::new();
    let mut current: Vec<Span> = Vec::new();
    let mut used = 0;

    for span in spans {
        for word in span.text.split_whitespace() {
            let needed = if used == 0 {
                width_of(word)
            } else {
                width_of(word) + 1
            };
            if used > 0 && used + needed > width {
                lines.push(std::mem::take(&mut current));
                used = 0;
            }

            let piece = if used == 0 {
                word.to_string()
            } else {
                format!(" {}", word)
            };
            used += width_of(&piece);
            match current.last_mut() {
                Some(last) if last.bold == span.bold => last.text.push_str(&piece),
                Some(last) if !last.bold => {
                    // Separator stays in the plain run
                    last.text.push(' ');
                    current.push(Span {
                        text: word.to_string(),
                        bold: span.bold,
                    });
                }
                _ => current.push(Span {
                    text: piece,
                    bold: span.bold,
                }),
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Wraps blocks into lines, with a blank line between blocks.
pub fn layout_lines(blocks: &[Block], width: usize) -> Vec<Line> {
    let mut lines = Vec::new();

    for (i, block) in blocks.iter().enumerate() {
        let continues_list = matches!(block, Block::ListItem { .. })
            && i > 0
            && matches!(blocks[i - 1], Block::ListItem { .. });
        if i > 0 && !continues_list {
            lines.push(Line::blank());
        }

        match block {
            Block::Heading(spans) => {
                lines.extend(wrap_spans(spans, width).into_iter().map(|spans| Line {
                    kind: LineKind::Heading,
                    indent: 0,
                    spans,
                }));
            }
            Block::Paragraph(spans) => {
                lines.extend(wrap_spans(spans, width).into_iter().map(|spans| Line {
                    kind: LineKind::Body,
                    indent: 0,
                    spans,
                }));
            }
            Block::ListItem { marker, spans } => {
                let indent = width_of(marker) + 1;
                for (n, mut wrapped) in wrap_spans(spans, width.saturating_sub(indent))
                    .into_iter()
                    .enumerate()
                {
                    if n == 0 {
                        wrapped.insert(0, Span::plain(format!("{} ", marker)));
                    }
                    lines.push(Line {
                        kind: LineKind::ListItem,
                        indent: if n == 0 { 0 } else { indent },
                        spans: wrapped,
                    });
                }
            }
        }
    }
    lines
}

fn has_body(lines: &[Line]) -> bool {
    lines
        .iter()
        .any(|l| matches!(l.kind, LineKind::Body | LineKind::ListItem))
}

/// Moves trailing headings off a full page. At least one body line stays
/// behind so every page makes progress.
fn take_orphaned_headings(page: &mut Vec<Line>) -> Vec<Line> {
    while page.last().is_some_and(Line::is_blank) {
        page.pop();
    }

    let mut carried = Vec::new();
    loop {
        let ends_with_heading = page.last().is_some_and(|l| l.kind == LineKind::Heading);
        if !ends_with_heading || !has_body(page) {
            break;
        }
        if let Some(heading) = page.pop() {
            carried.insert(0, heading);
        }
        while page.last().is_some_and(Line::is_blank) {
            page.pop();
        }
    }
    carried
}

/// Splits lines into pages of at most `height` lines.
pub fn paginate(lines: Vec<Line>, height: usize) -> Vec<Page> {
    let height = height.max(2);
    let mut pages = Vec::new();
    let mut current: Vec<Line> = Vec::new();

    for line in lines {
        if current.len() == height && !has_body(&current) {
            // Only headings so far: give up the spacing rather than the heading
            while current.last().is_some_and(Line::is_blank) {
                current.pop();
            }
            if line.is_blank() {
                continue;
            }
        }
        if current.len() == height {
            let carried = take_orphaned_headings(&mut current);
            pages.push(Page {
                lines: std::mem::take(&mut current),
            });
            current = carried;
        }
        // No blank lines at the top of a page
        if current.is_empty() && line.is_blank() {
            continue;
        }
        current.push(line);
    }

    while current.last().is_some_and(Line::is_blank) {
        current.pop();
    }
    if !current.is_empty() {
        pages.push(Page { lines: current });
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::markup::parse;

    fn body(text: &str) -> Line {
        Line {
            kind: LineKind::Body,
            indent: 0,
            spans: vec![Span::plain(text)],
        }
    }

    fn heading(text: &str) -> Line {
        Line {
            kind: LineKind::Heading,
            indent: 0,
            spans: vec![Span::bold(text)],
        }
    }

    #[test]
    fn test_wrap_respects_width_and_keeps_words() {
        let spans = vec![Span::plain("uno dos tres cuatro cinco seis")];
        let lines = wrap_spans(&spans, 10);
        let texts: Vec<String> = lines
            .iter()
            .map(|l| l.iter().map(|s| s.text.as_str()).collect())
            .collect();
        assert_eq!(texts, vec!["uno dos", "tres", "cuatro", "cinco seis"]);
    }

    #[test]
    fn test_wrap_keeps_bold_runs() {
        let spans = vec![Span::plain("clima"), Span::bold("ESTABLE hoy")];
        let lines = wrap_spans(&spans, 80);
        assert_eq!(
            lines,
            vec![vec![Span::plain("clima "), Span::bold("ESTABLE hoy")]]
        );
    }

    #[test]
    fn test_long_word_gets_own_line() {
        let spans = vec![Span::plain("a supercalifragilistico b")];
        let lines = wrap_spans(&spans, 5);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1][0].text, "supercalifragilistico");
    }

    #[test]
    fn test_list_continuation_is_indented() {
        let blocks = parse("- una viñeta bastante larga que se parte");
        let lines = layout_lines(&blocks, 16);
        assert!(lines.len() > 1);
        assert!(lines[0].text().starts_with("• "));
        assert_eq!(lines[1].indent, 2);
        assert!(lines.iter().all(|l| l.indent + width_of(&l.text()) <= 16));
    }

    #[test]
    fn test_pages_never_exceed_height() {
        let lines: Vec<Line> = (0..23).map(|i| body(&format!("línea {}", i))).collect();
        let pages = paginate(lines, 5);
        assert_eq!(pages.len(), 5);
        assert!(pages.iter().all(|p| p.lines.len() <= 5));
        let total: usize = pages.iter().map(|p| p.lines.len()).sum();
        assert_eq!(total, 23);
    }

    #[test]
    fn test_heading_not_left_at_page_bottom() {
        let lines = vec![
            body("a"),
            body("b"),
            body("c"),
            heading("TÍTULO"),
            body("d"),
            body("e"),
        ];
        let pages = paginate(lines, 4);

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].lines.len(), 3);
        assert_eq!(pages[1].lines[0], heading("TÍTULO"));
        for page in &pages[..pages.len() - 1] {
            assert_ne!(page.lines.last().unwrap().kind, LineKind::Heading);
        }
    }

    #[test]
    fn test_no_blank_line_at_page_top() {
        let lines = vec![body("a"), body("b"), Line::blank(), body("c")];
        let pages = paginate(lines, 2);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].lines, vec![body("c")]);
    }

    #[test]
    fn test_document_content_preserved_in_order() {
        let text = "**UNO**\n\nPárrafo largo con varias palabras para envolver en líneas cortas.\n\n\
                    **DOS**\n\n- a\n- b\n- c\n\n**TRES**\n\nFin del documento con texto.";
        let lines = layout_lines(&parse(text), 20);
        let expected: Vec<String> = lines
            .iter()
            .filter(|l| !l.is_blank())
            .map(Line::text)
            .collect();

        for height in 2..9 {
            let pages = paginate(lines.clone(), height);
            let flattened: Vec<String> = pages
                .iter()
                .flat_map(|p| p.lines.iter())
                .filter(|l| !l.is_blank())
                .map(Line::text)
                .collect();
            assert_eq!(flattened, expected, "height {}", height);
            for page in &pages[..pages.len() - 1] {
                assert!(page.lines.len() <= height);
                assert_ne!(page.lines.last().unwrap().kind, LineKind::Heading);
            }
        }
    }
}
