use chrono::Utc;
use std::sync::Arc;

use super::{
    build_messages, classify, fallback, recommendations, FallbackReason, NarrativeSource, Report,
    ReportPeriod, ReportStats, TextGenerator,
};
use crate::models::{CheckinRecord, IncidentRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedNarrative {
    pub text: String,
    pub source: NarrativeSource,
}

/// Produces report narratives, from the generator when it can and from the
/// local template otherwise. Composing never fails.
#[derive(Clone)]
pub struct ReportComposer {
    generator: Option<Arc<dyn TextGenerator>>,
    school_name: String,
}

impl ReportComposer {
    pub fn new(school_name: impl Into<String>) -> Self {
        Self {
            generator: None,
            school_name: school_name.into(),
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    pub fn school_name(&self) -> &str {
        &self.school_name
    }

    pub async fn compose(&self, stats: &ReportStats) -> ComposedNarrative {
        let band = classify(stats);
        let local = |reason: FallbackReason| ComposedNarrative {
            text: fallback::narrative(stats, band),
            source: NarrativeSource::Fallback { reason },
        };

        if stats.is_empty() {
            return local(FallbackReason::NoData);
        }
        let Some(generator) = &self.generator else {
            return local(FallbackReason::NotConfigured);
        };

        let messages = build_messages(stats, &self.school_name);
        match generator.generate(&messages).await {
            Ok(text) => {
                tracing::info!("Narrative for {} generated by {}", stats.period, generator.model());
                ComposedNarrative {
                    text,
                    source: NarrativeSource::Generated {
                        model: generator.model().to_string(),
                    },
                }
            }
            Err(e) => {
                tracing::warn!("Narrative generation failed, using local template: {}", e);
                local(FallbackReason::from(&e))
            }
        }
    }

    /// Aggregates the period, classifies it and composes the narrative.
    pub async fn generate(
        &self,
        period: ReportPeriod,
        checkins: &[CheckinRecord],
        incidents: &[IncidentRecord],
    ) -> Report {
        let stats = ReportStats::collect(period, checkins, incidents);
        let band = classify(&stats);
        let narrative = self.compose(&stats).await;

        Report {
            school_name: self.school_name.clone(),
            generated_at: Utc::now(),
            recommendations: recommendations(&stats, band),
            band,
            narrative: narrative.text,
            source: narrative.source,
            stats,
        }
    }
}
