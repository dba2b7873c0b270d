use std::fmt::Write;

use super::{Band, ReportStats};

/// Narrative built locally from the statistics.
///
/// Deterministic: the same statistics and band always give the same text.
pub fn narrative(stats: &ReportStats, band: Band) -> String {
    if stats.is_empty() {
        return format!(
            "📊 **ANÁLISIS GENERAL DEL MES**\n\n\
             No se registraron check-ins emocionales durante {}. Sin datos no es posible \
             evaluar el clima emocional del establecimiento.\n\n\
             🎯 **CONCLUSIÓN**\n\n\
             Se recomienda promover el uso diario del check-in para contar con información \
             en el próximo informe.",
            stats.period
        );
    }

    let mut text = String::new();

    // Writing to a String cannot fail
    let _ = write!(
        text,
        "📊 **ANÁLISIS GENERAL DEL MES**\n\n\
         Durante este período se registraron {} check-ins emocionales de {} estudiantes \
         diferentes, representando una participación del {:.0}% respecto al total de días \
         del mes.\n\n",
        stats.record_count, stats.distinct_subject_count, stats.participation
    );

    text.push_str("💭 **ESTADO EMOCIONAL**\n\n");
    let score = stats.average_score;
    let _ = match band {
        Band::Optimal => write!(
            text,
            "El clima emocional general es **POSITIVO** ({:.1}/5). Los estudiantes muestran \
             un estado de ánimo saludable y participativo. Se observa buena disposición hacia \
             las actividades escolares y relaciones interpersonales favorables.\n\n",
            score
        ),
        Band::Stable => write!(
            text,
            "El clima emocional es **ESTABLE** ({:.1}/5). La mayoría de los estudiantes \
             presenta un estado anímico dentro de rangos normales. Se recomienda mantener \
             monitoreo constante para detectar cambios tempranos.\n\n",
            score
        ),
        Band::NeedsAttention => write!(
            text,
            "El clima emocional requiere **ATENCIÓN PRIORITARIA** ({:.1}/5). Se detectaron \
             múltiples estudiantes con estados emocionales negativos recurrentes. Es \
             fundamental activar protocolos de contención y seguimiento individualizado.\n\n",
            score
        ),
    };

    if stats.alert_count > 0 {
        text.push_str("🚨 **ALERTAS TEMPRANAS**\n\n");
        let _ = write!(
            text,
            "Se generaron {} alertas automáticas basadas en respuestas de estudiantes que \
             indicaron tristeza, enojo, necesidad de ayuda o palabras clave relacionadas con \
             malestar emocional. Estos casos requieren seguimiento prioritario.\n\n",
            stats.alert_count
        );
        for student in &stats.follow_up {
            let _ = writeln!(text, "- {} ({} alerta(s))", student.student, student.alerts);
        }
        if !stats.follow_up.is_empty() {
            text.push('\n');
        }
    }

    let incidents = &stats.incidents.summary;
    if incidents.total > 0 {
        text.push_str("⚠️ **INCIDENTES DE CONVIVENCIA**\n\n");
        let _ = write!(
            text,
            "Se registraron {} incidentes de convivencia escolar ({} pendientes, {} de \
             gravedad moderada o alta). Es importante correlacionar estos eventos con los \
             check-ins emocionales para identificar patrones y estudiantes en riesgo.\n\n",
            incidents.total, incidents.pending, incidents.serious
        );
    }

    text.push_str("🎯 **CONCLUSIÓN**\n\n");
    let _ = write!(
        text,
        "El análisis sugiere {} las estrategias de bienestar emocional. Se recomienda \
         realizar seguimiento especial a estudiantes con emociones negativas recurrentes y \
         coordinar con el equipo psicosocial del establecimiento.",
        if band == Band::Optimal {
            "mantener"
        } else {
            "reforzar"
        }
    );

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::classify;
    use crate::report::stats::tests::{march, scenario_checkins};

    #[test]
    fn test_narrative_for_scenario() {
        let stats = ReportStats::collect(march(), &scenario_checkins(), &[]);
        let text = narrative(&stats, classify(&stats));

        assert!(text.starts_with("📊 **ANÁLISIS GENERAL DEL MES**"));
        assert!(text.contains("10 check-ins emocionales de 4 estudiantes"));
        assert!(text.contains("**ESTABLE** (3.4/5)"));
        assert!(text.contains("Se generaron 1 alertas"));
        assert!(!text.contains("INCIDENTES"));
        assert!(text.contains("sugiere reforzar"));
    }

    #[test]
    fn test_narrative_is_deterministic() {
        let stats = ReportStats::collect(march(), &scenario_checkins(), &[]);
        let band = classify(&stats);
        assert_eq!(narrative(&stats, band), narrative(&stats, band));
    }

    #[test]
    fn test_narrative_without_data() {
        let stats = ReportStats::collect(march(), &[], &[]);
        let text = narrative(&stats, classify(&stats));
        assert!(text.contains("No se registraron check-ins emocionales durante Marzo 2025"));
    }
}
