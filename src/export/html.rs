use std::fmt::Write;

use super::markup::{self, Block, Span};
use super::paginate::{layout_lines, paginate, Line, LineKind, Page, PageLayout};
use super::text::source_line;
use crate::report::Report;

const STYLE: &str = "\
body { font-family: Helvetica, Arial, sans-serif; background: #eef1f5; margin: 0; }
.page { background: #fff; width: 210mm; min-height: 297mm; margin: 12px auto; \
padding: 18mm 16mm; box-sizing: border-box; break-after: page; page-break-after: always; }
.page:last-child { break-after: auto; page-break-after: auto; }
.line { white-space: pre-wrap; margin: 0; line-height: 1.45; font-size: 11pt; }
.heading { color: #1f3b73; font-weight: bold; font-size: 12.5pt; }
.blank { height: 1.45em; }
footer { color: #777; font-size: 9pt; text-align: right; margin-top: 8mm; }
@media print { body { background: none; } .page { margin: 0; } }
";

/// Escapes text for HTML element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn paragraph(text: impl Into<String>) -> Block {
    Block::Paragraph(vec![Span::plain(text)])
}

fn labeled(label: &str, value: impl std::fmt::Display) -> Block {
    Block::ListItem {
        marker: "•".to_string(),
        spans: vec![Span::bold(format!("{}:", label)), Span::plain(format!(" {}", value))],
    }
}

/// The report as a sequence of blocks, in print order.
fn report_blocks(report: &Report) -> Vec<Block> {
    let stats = &report.stats;
    let summary = &stats.incidents.summary;
    let mut blocks = vec![
        Block::Heading(vec![Span::bold("INFORME MENSUAL - SKOLAI")]),
        paragraph(format!("Colegio: {}", report.school_name)),
        paragraph(format!("Mes: {}", report.period())),
        paragraph(format!(
            "Fecha de generación: {}",
            report.generated_at.format("%d-%m-%Y")
        )),
        Block::Heading(vec![Span::bold("ESTADÍSTICAS GENERALES")]),
        labeled("Total de Check-ins", stats.record_count),
        labeled("Estudiantes Activos", stats.distinct_subject_count),
        labeled(
            "Promedio Emocional",
            format!("{:.1}/5", stats.average_score),
        ),
        labeled("Alertas Generadas", stats.alert_count),
        labeled("Participación", format!("{:.0}%", stats.participation)),
        labeled("Tendencia", report.band.label()),
        labeled(
            "Incidentes",
            format!(
                "{} ({} pendientes, {} graves)",
                summary.total, summary.pending, summary.serious
            ),
        ),
        Block::Heading(vec![Span::bold("ANÁLISIS CON INTELIGENCIA ARTIFICIAL")]),
    ];

    if let Some(notice) = report.source.notice() {
        blocks.push(Block::Paragraph(vec![Span::bold(notice)]));
    }
    blocks.extend(markup::parse(&report.narrative));
    blocks.push(paragraph(format!("({})", source_line(&report.source))));

    blocks.push(Block::Heading(vec![Span::bold("RECOMENDACIONES")]));
    blocks.extend(
        report
            .recommendations
            .iter()
            .enumerate()
            .map(|(i, line)| Block::ListItem {
                marker: format!("{}.", i + 1),
                spans: markup::parse_inline(line),
            }),
    );
    blocks
}

/// Lays the report out into pages.
pub fn paginate_report(report: &Report, layout: PageLayout) -> Vec<Page> {
    let lines = layout_lines(&report_blocks(report), layout.width);
    paginate(lines, layout.height)
}

fn write_line(out: &mut String, line: &Line) {
    let class = match line.kind {
        LineKind::Heading => "line heading",
        LineKind::ListItem => "line item",
        LineKind::Body => "line",
        LineKind::Blank => {
            out.push_str("<p class=\"line blank\"></p>\n");
            return;
        }
    };

    let _ = write!(out, "<p class=\"{}\"", class);
    if line.indent > 0 {
        let _ = write!(out, " style=\"padding-left: {}ch\"", line.indent);
    }
    out.push('>');
    for span in &line.spans {
        if span.bold && line.kind != LineKind::Heading {
            let _ = write!(out, "<strong>{}</strong>", escape(&span.text));
        } else {
            out.push_str(&escape(&span.text));
        }
    }
    out.push_str("</p>\n");
}

/// Renders the report as a self-contained HTML document, one section per
/// page.
pub fn render_html(report: &Report, layout: PageLayout) -> String {
    let pages = paginate_report(report, layout);
    let title = format!("Informe {} - {}", report.period(), report.school_name);
    let mut out = String::new();

    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>\n{}</style>\n</head>\n<body>\n",
        escape(&title),
        STYLE
    );

    let total = pages.len();
    for (n, page) in pages.iter().enumerate() {
        let _ = writeln!(out, "<section class=\"page\" data-page=\"{}\">", n + 1);
        for line in &page.lines {
            write_line(&mut out, line);
        }
        let _ = writeln!(
            out,
            "<footer>SKOLAI - Sistema de Gestión Escolar · Página {} de {}</footer>",
            n + 1,
            total
        );
        out.push_str("</section>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}
