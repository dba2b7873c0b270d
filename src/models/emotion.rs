use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Self-reported emotional state.
///
/// Labels changed over time in the kiosk; older labels and the kiosk emoji
/// parse into the same variants, and anything unrecognised is kept verbatim in
/// `Other` so it still counts toward totals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Emotion {
    MuyFeliz,
    Bien,
    Normal,
    Ansioso,
    Preocupado,
    Triste,
    Enojado,
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Valence {
    Positive,
    Neutral,
    Negative,
}

impl Emotion {
    /// Emotions offered by the kiosk, in display order.
    pub const KIOSK: [Emotion; 5] = [
        Emotion::Enojado,
        Emotion::Triste,
        Emotion::Normal,
        Emotion::Bien,
        Emotion::MuyFeliz,
    ];

    pub fn label(&self) -> &str {
        match self {
            Emotion::MuyFeliz => "Muy Feliz",
            Emotion::Bien => "Bien",
            Emotion::Normal => "Normal",
            Emotion::Ansioso => "Ansioso",
            Emotion::Preocupado => "Preocupado",
            Emotion::Triste => "Triste",
            Emotion::Enojado => "Enojado",
            Emotion::Other(label) => label,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Emotion::MuyFeliz => "😄",
            Emotion::Bien => "😊",
            Emotion::Normal => "😐",
            Emotion::Ansioso => "😟",
            Emotion::Preocupado => "😟",
            Emotion::Triste => "😢",
            Emotion::Enojado => "😡",
            Emotion::Other(_) => "❔",
        }
    }

    pub fn valence(&self) -> Valence {
        match self {
            Emotion::MuyFeliz | Emotion::Bien => Valence::Positive,
            Emotion::Normal | Emotion::Other(_) => Valence::Neutral,
            Emotion::Ansioso | Emotion::Preocupado | Emotion::Triste | Emotion::Enojado => {
                Valence::Negative
            }
        }
    }

    /// Wellbeing score on the 1-5 scale used by the monthly report.
    pub fn score(&self) -> u8 {
        match self {
            Emotion::MuyFeliz => 5,
            Emotion::Bien => 4,
            Emotion::Normal | Emotion::Other(_) => 3,
            Emotion::Ansioso | Emotion::Preocupado => 2,
            Emotion::Triste | Emotion::Enojado => 1,
        }
    }

    /// Emotions that alert staff on their own, regardless of the note.
    pub fn is_alarming(&self) -> bool {
        matches!(self, Emotion::Triste | Emotion::Enojado)
    }

    /// Lenient parse used for stored and imported data.
    pub fn parse_label(s: &str) -> Emotion {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "muy feliz" | "muy-feliz" | "muyfeliz" | "😄" => Emotion::MuyFeliz,
            "bien" | "😊" | "😌" => Emotion::Bien,
            "normal" | "😐" => Emotion::Normal,
            "ansioso" | "ansiosa" => Emotion::Ansioso,
            "preocupado" | "preocupada" | "😟" => Emotion::Preocupado,
            "triste" | "😢" => Emotion::Triste,
            "enojado" | "enojada" | "😡" | "😠" => Emotion::Enojado,
            _ => Emotion::Other(trimmed.to_string()),
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Emotion {
    type Err = String;

    /// Strict parse for user input: unknown labels are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Emotion::parse_label(s) {
            Emotion::Other(label) => Err(format!(
                "Invalid emotion '{}'. Valid options: enojado, triste, normal, bien, muy feliz, ansioso, preocupado",
                label
            )),
            emotion => Ok(emotion),
        }
    }
}

impl Serialize for Emotion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Emotion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Emotion::parse_label(&label))
    }
}
