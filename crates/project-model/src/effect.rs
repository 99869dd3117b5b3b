//! Visual effect definitions.

use serde::{Deserialize, Serialize};

use crate::timeline::EffectId;

/// Intensity used when none is given.
pub const DEFAULT_EFFECT_INTENSITY: u8 = 50;

/// Kind of visual effect placed on the effect track.
///
/// Wire names follow the editor's stored documents (`zoom`, `blur`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    #[serde(rename = "zoom", alias = "amplify")]
    Amplify,
    #[serde(rename = "fade")]
    Fade,
    #[serde(rename = "blur", alias = "soften")]
    Soften,
    #[serde(rename = "sparkle")]
    Sparkle,
}

impl EffectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Amplify => "zoom",
            Self::Fade => "fade",
            Self::Soften => "blur",
            Self::Sparkle => "sparkle",
        }
    }
}

/// A time-windowed effect.
///
/// Once an effect-track clip references this effect, the clip's window
/// is authoritative; `start_time`/`end_time` here are only refreshed by
/// [`crate::Timeline::sync_effect_windows`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Effect {
    pub id: EffectId,
    #[serde(rename = "type")]
    pub kind: EffectKind,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default = "default_intensity")]
    pub intensity: u8,
}

fn default_intensity() -> u8 {
    DEFAULT_EFFECT_INTENSITY
}

impl Effect {
    /// New unlinked effect; the id is assigned when added to a timeline.
    pub fn new(kind: EffectKind, start_time: f64, end_time: f64, intensity: u8) -> Self {
        Self {
            id: EffectId(0),
            kind,
            start_time,
            end_time,
            intensity: intensity.min(100),
        }
    }

    /// Intensity normalized to `[0.0, 1.0]`.
    pub fn normalized_intensity(&self) -> f64 {
        f64::from(self.intensity.min(100)) / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_wire_names() {
        let json = r#"{"id":3,"type":"zoom","startTime":1.0,"endTime":2.5}"#;
        let effect: Effect = serde_json::from_str(json).unwrap();
        assert_eq!(effect.kind, EffectKind::Amplify);
        assert_eq!(effect.intensity, DEFAULT_EFFECT_INTENSITY);

        let alias: EffectKind = serde_json::from_str("\"soften\"").unwrap();
        assert_eq!(alias, EffectKind::Soften);
        assert_eq!(serde_json::to_string(&alias).unwrap(), "\"blur\"");
    }

    #[test]
    fn test_intensity_is_clamped() {
        let effect = Effect::new(EffectKind::Fade, 0.0, 1.0, 250);
        assert_eq!(effect.intensity, 100);
        assert!((effect.normalized_intensity() - 1.0).abs() < 1e-9);
    }
}
