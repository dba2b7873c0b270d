use std::fmt::Write;

use crate::report::{NarrativeSource, Report};

const RULE: &str = "========================";

/// Spanish line describing where the narrative came from.
pub(super) fn source_line(source: &NarrativeSource) -> String {
    match source {
        NarrativeSource::Generated { model } => format!("Análisis generado con IA ({})", model),
        NarrativeSource::Fallback { .. } => {
            "Análisis generado localmente a partir de las estadísticas".to_string()
        }
    }
}

/// Renders the monthly report as plain text.
pub fn render_text(report: &Report) -> String {
    let stats = &report.stats;
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "INFORME MENSUAL - SKOLAI");
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out);
    let _ = writeln!(out, "Colegio: {}", report.school_name);
    let _ = writeln!(out, "Mes: {}", report.period());
    let _ = writeln!(
        out,
        "Fecha de generación: {}",
        report.generated_at.format("%d-%m-%Y")
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "ESTADÍSTICAS GENERALES");
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "Total de Check-ins: {}", stats.record_count);
    let _ = writeln!(out, "Estudiantes Activos: {}", stats.distinct_subject_count);
    let _ = writeln!(out, "Promedio Emocional: {:.1}/5", stats.average_score);
    let _ = writeln!(out, "Alertas Generadas: {}", stats.alert_count);
    let _ = writeln!(out, "Participación: {:.0}%", stats.participation);
    let _ = writeln!(out, "Tendencia: {}", report.band.label());
    let summary = &stats.incidents.summary;
    let _ = writeln!(
        out,
        "Incidentes: {} ({} pendientes, {} graves)",
        summary.total, summary.pending, summary.serious
    );
    if !stats.emotion_distribution.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Distribución emocional:");
        for entry in &stats.emotion_distribution {
            let _ = writeln!(out, "  {}: {}", entry.label, entry.count);
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "ANÁLISIS CON INTELIGENCIA ARTIFICIAL");
    let _ = writeln!(out, "{}", RULE);
    if let Some(notice) = report.source.notice() {
        let _ = writeln!(out, "{}", notice);
        let _ = writeln!(out);
    }
    let _ = writeln!(out, "{}", report.narrative.trim_end());
    let _ = writeln!(out);
    let _ = writeln!(out, "({})", source_line(&report.source));
    let _ = writeln!(out);

    let _ = writeln!(out, "RECOMENDACIONES");
    let _ = writeln!(out, "{}", RULE);
    for (i, line) in report.recommendations.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, line);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "---");
    let _ = writeln!(
        out,
        "Generado automáticamente por SKOLAI - Sistema de Gestión Escolar"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::stats::tests::{march, scenario_checkins};
    use crate::report::{FallbackReason, ReportComposer};

    #[tokio::test]
    async fn test_text_layout() {
        let report = ReportComposer::new("Liceo Bicentenario")
            .generate(march(), &scenario_checkins(), &[])
            .await;
        let text = render_text(&report);

        assert!(text.starts_with("INFORME MENSUAL - SKOLAI\n"));
        assert!(text.contains("Colegio: Liceo Bicentenario\n"));
        assert!(text.contains("Mes: Marzo 2025\n"));
        assert!(text.contains("Total de Check-ins: 10\n"));
        assert!(text.contains("Promedio Emocional: 3.4/5\n"));
        assert!(text.contains("Tendencia: Estable 📊\n"));
        assert!(text.contains("1. "));
        assert!(text.trim_end().ends_with("Sistema de Gestión Escolar"));

        let stats_at = text.find("ESTADÍSTICAS GENERALES").unwrap();
        let analysis_at = text.find("ANÁLISIS CON INTELIGENCIA ARTIFICIAL").unwrap();
        let recommendations_at = text.find("RECOMENDACIONES").unwrap();
        assert!(stats_at < analysis_at && analysis_at < recommendations_at);
    }

    #[tokio::test]
    async fn test_notice_printed_for_quota_fallback() {
        let mut report = ReportComposer::new("Liceo")
            .generate(march(), &scenario_checkins(), &[])
            .await;
        report.source = NarrativeSource::Fallback {
            reason: FallbackReason::RateLimited,
        };

        let text = render_text(&report);
        assert!(text.contains("límite de uso de la IA"));
    }
}
