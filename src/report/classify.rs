use serde::Serialize;
use std::fmt;

use super::ReportStats;

/// Positive share above which the month counts as optimal.
const OPTIMAL_POSITIVE_RATIO: f64 = 70.0;
/// Negative share above which the month needs attention.
const ATTENTION_RATIO: f64 = 40.0;
/// Alert share above which the containment protocol is recommended.
const ALERT_RATIO: f64 = 20.0;
/// Fewer check-ins than this is low participation.
const MIN_CHECKINS: usize = 10;

/// Overall emotional climate of a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Band {
    Optimal,
    Stable,
    NeedsAttention,
}

impl Band {
    /// Trend label printed on the report.
    pub fn label(&self) -> &'static str {
        match self {
            Band::Optimal => "Positiva ✅",
            Band::Stable => "Estable 📊",
            Band::NeedsAttention => "Requiere Atención ⚠️",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::Optimal => write!(f, "optimal"),
            Band::Stable => write!(f, "stable"),
            Band::NeedsAttention => write!(f, "needs-attention"),
        }
    }
}

/// Places the statistics in a band. A period without check-ins needs
/// attention, since nobody is being heard.
pub fn classify(stats: &ReportStats) -> Band {
    if stats.is_empty() {
        Band::NeedsAttention
    } else if stats.positive_ratio > OPTIMAL_POSITIVE_RATIO {
        Band::Optimal
    } else if stats.attention_ratio > ATTENTION_RATIO {
        Band::NeedsAttention
    } else {
        Band::Stable
    }
}

/// Recommendation lines for the band, followed by alert and participation
/// advice when they apply.
pub fn recommendations(stats: &ReportStats, band: Band) -> Vec<String> {
    let mut lines: Vec<&str> = match band {
        Band::NeedsAttention => vec![
            "⚠️ Nivel emocional bajo detectado. Se recomienda intervención del equipo de convivencia.",
            "🔍 Realizar entrevistas individuales con estudiantes que presentan emociones negativas recurrentes.",
            "🎯 Implementar actividades de integración y fortalecimiento del clima escolar.",
        ],
        Band::Stable => vec![
            "📊 Bienestar emocional estable. Mantener actividades actuales.",
            "💬 Reforzar canales de comunicación con apoderados sobre el estado emocional.",
        ],
        Band::Optimal => vec![
            "✅ Excelente clima emocional. Continuar con las estrategias actuales.",
            "🎉 Reconocer y fortalecer las prácticas que están generando impacto positivo.",
        ],
    };

    if stats.alert_ratio() > ALERT_RATIO {
        lines.push("🚨 Alto número de alertas detectadas. Activar protocolo de contención emocional.");
        lines.push("👥 Coordinar con profesionales de apoyo (psicólogo, orientador).");
    }
    if stats.record_count < MIN_CHECKINS {
        lines.push("📱 Baja participación en check-ins. Incentivar el uso diario de la herramienta.");
    }

    lines.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CheckinRecord, Emotion};
    use crate::report::stats::tests::{march, scenario_checkins};
    use chrono::{TimeZone, Utc};

    fn stats_for(emotions: &[Emotion]) -> ReportStats {
        let at = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let checkins: Vec<CheckinRecord> = emotions
            .iter()
            .cloned()
            .map(|e| CheckinRecord::new("Ana", e).with_timestamp(at))
            .collect();
        ReportStats::collect(march(), &checkins, &[])
    }

    #[test]
    fn test_scenario_is_stable() {
        let stats = ReportStats::collect(march(), &scenario_checkins(), &[]);
        assert_eq!(classify(&stats), Band::Stable);
    }

    #[test]
    fn test_classify_idempotent() {
        let stats = ReportStats::collect(march(), &scenario_checkins(), &[]);
        let first = classify(&stats);
        let second = classify(&stats);
        assert_eq!(first, second);
        assert_eq!(classify(&stats.clone()), first);
    }

    #[test]
    fn test_classify_optimal_needs_more_than_70() {
        // Exactly 70% positive is not optimal
        let mut emotions = vec![Emotion::Bien; 7];
        emotions.extend(vec![Emotion::Normal; 3]);
        assert_eq!(classify(&stats_for(&emotions)), Band::Stable);

        let mut emotions = vec![Emotion::MuyFeliz; 8];
        emotions.extend(vec![Emotion::Triste; 2]);
        assert_eq!(classify(&stats_for(&emotions)), Band::Optimal);
    }

    #[test]
    fn test_classify_attention_above_40() {
        let mut emotions = vec![Emotion::Preocupado; 5];
        emotions.extend(vec![Emotion::Bien; 5]);
        assert_eq!(classify(&stats_for(&emotions)), Band::NeedsAttention);

        let mut emotions = vec![Emotion::Preocupado; 4];
        emotions.extend(vec![Emotion::Normal; 6]);
        assert_eq!(classify(&stats_for(&emotions)), Band::Stable);
    }

    #[test]
    fn test_classify_empty_needs_attention() {
        assert_eq!(classify(&stats_for(&[])), Band::NeedsAttention);
    }

    #[test]
    fn test_recommendations_add_alert_and_participation_lines() {
        // 3 of 5 check-ins are alerts, and 5 is low participation
        let stats = stats_for(&[
            Emotion::Triste,
            Emotion::Triste,
            Emotion::Enojado,
            Emotion::Bien,
            Emotion::Bien,
        ]);
        let band = classify(&stats);
        assert_eq!(band, Band::NeedsAttention);

        let lines = recommendations(&stats, band);
        assert_eq!(lines.len(), 6);
        assert!(lines.iter().any(|l| l.contains("protocolo de contención")));
        assert!(lines.last().unwrap().contains("Baja participación"));
    }

    #[test]
    fn test_recommendations_scenario() {
        let stats = ReportStats::collect(march(), &scenario_checkins(), &[]);
        let lines = recommendations(&stats, classify(&stats));
        // Stable block only: 10% alerts, 10 check-ins
        assert_eq!(lines.len(), 2);
    }
}
