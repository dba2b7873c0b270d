use serde::{Deserialize, Serialize};
use std::fmt::Write;

use super::ReportStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

const PERSONA: &str = "Eres un psicólogo educacional experto. Redactas informes mensuales \
profesionales, empáticos y orientados a la acción para equipos directivos de colegios. \
Usa **Títulos** en negrita y viñetas con '- '.";

const SECTIONS: [&str; 5] = [
    "Resumen ejecutivo del clima emocional",
    "Análisis de patrones emocionales detectados",
    "Identificación de estudiantes que requieren atención especial",
    "Recomendaciones concretas para profesores y directivos",
    "Sugerencias de intervenciones preventivas",
];

/// Builds the conversation sent to the generative backend. Only aggregated
/// figures and the names of students flagged for follow-up are included.
pub fn build_messages(stats: &ReportStats, school_name: &str) -> Vec<ChatMessage> {
    let mut body = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(
        body,
        "Genera el informe mensual de {} para {}.\n",
        school_name, stats.period
    );
    let _ = writeln!(body, "CHECK-INS EMOCIONALES");
    let _ = writeln!(body, "- Total de registros: {}", stats.record_count);
    let _ = writeln!(body, "- Estudiantes distintos: {}", stats.distinct_subject_count);
    let _ = writeln!(body, "- Participación: {:.0}%", stats.participation);
    let _ = writeln!(body, "- Promedio emocional: {:.1}/5", stats.average_score);
    let _ = writeln!(body, "- Emociones positivas: {:.0}%", stats.positive_ratio);
    let _ = writeln!(body, "- Emociones que requieren atención: {:.0}%", stats.attention_ratio);
    let _ = writeln!(body, "- Alertas generadas: {}", stats.alert_count);

    if !stats.emotion_distribution.is_empty() {
        let _ = writeln!(body, "\nDISTRIBUCIÓN DE EMOCIONES");
        for entry in &stats.emotion_distribution {
            let _ = writeln!(body, "- {}: {}", entry.label, entry.count);
        }
    }

    if !stats.follow_up.is_empty() {
        let _ = writeln!(body, "\nESTUDIANTES CON ALERTAS");
        for student in &stats.follow_up {
            let _ = writeln!(body, "- {}: {} alerta(s)", student.student, student.alerts);
        }
    }

    let incidents = &stats.incidents;
    let _ = writeln!(
        body,
        "\nINCIDENTES DE CONVIVENCIA ({} casos, {} pendientes, {} graves)",
        incidents.summary.total, incidents.summary.pending, incidents.summary.serious
    );
    for entry in &incidents.by_category {
        let _ = writeln!(body, "- {}: {}", entry.label, entry.count);
    }

    let _ = writeln!(body, "\nEl informe debe incluir:");
    for (i, section) in SECTIONS.iter().enumerate() {
        let _ = writeln!(body, "{}. {}", i + 1, section);
    }

    vec![ChatMessage::system(PERSONA), ChatMessage::user(body)]
}
