//! Effect selection and intensity mappings.

use cutflow_project_model::{EffectId, EffectKind, Timeline, TrackKind};

use crate::graph::{num, Filter};

/// Effect kinds the export pathway knows how to render.
pub const EXPORTABLE_EFFECTS: [EffectKind; 3] =
    [EffectKind::Amplify, EffectKind::Fade, EffectKind::Soften];

/// Longest fade-in (and fade-out) window, in seconds.
pub const MAX_FADE_WINDOW: f64 = 1.0;

/// How effects on the effect track are turned into graph nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EffectSelection {
    /// Only the earliest exportable effect is applied. Every other effect
    /// is dropped without a trace in the graph.
    #[default]
    FirstByStart,
}

/// An effect chosen for rendering, with its effective window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectedEffect {
    pub id: EffectId,
    pub kind: EffectKind,
    pub start_time: f64,
    pub end_time: f64,
    /// Intensity in `[0.0, 1.0]`.
    pub intensity: f64,
}

impl EffectSelection {
    pub fn select(self, timeline: &Timeline) -> Vec<SelectedEffect> {
        match self {
            Self::FirstByStart => first_by_start(timeline).into_iter().collect(),
        }
    }
}

fn first_by_start(timeline: &Timeline) -> Option<SelectedEffect> {
    timeline
        .clips_on_track(TrackKind::Effect)
        .into_iter()
        .filter(|clip| clip.is_non_empty())
        .find_map(|clip| {
            let effect = timeline.effect(clip.effect_ref?)?;
            EXPORTABLE_EFFECTS
                .contains(&effect.kind)
                .then(|| SelectedEffect {
                    id: effect.id,
                    kind: effect.kind,
                    start_time: clip.start_time,
                    end_time: clip.end_time,
                    intensity: effect.normalized_intensity(),
                })
        })
}

/// Zoom factor in `[1.0, 1.5]`.
pub fn amplify_factor(intensity: f64) -> f64 {
    1.0 + 0.5 * intensity.clamp(0.0, 1.0)
}

/// Fade window for an effect spanning `[start, end]`.
pub fn fade_window(start: f64, end: f64) -> f64 {
    ((end - start) / 2.0).clamp(0.0, MAX_FADE_WINDOW)
}

/// Box blur radius used by the export graph.
pub fn export_blur_radius(intensity: f64) -> u32 {
    (5.0 * intensity.clamp(0.0, 1.0)).round().max(1.0) as u32
}

/// Blur radius in pixels used by the editor preview. Deliberately differs
/// from [`export_blur_radius`].
pub fn preview_blur_px(intensity: f64) -> f64 {
    10.0 * intensity.clamp(0.0, 1.0)
}

/// Filters implementing `effect` on a `width`x`height` canvas.
pub fn effect_filters(effect: &SelectedEffect, width: u32, height: u32) -> Vec<Filter> {
    match effect.kind {
        EffectKind::Amplify => {
            let factor = num(amplify_factor(effect.intensity));
            vec![
                Filter::new("scale")
                    .positional(format!("iw*{factor}"))
                    .positional(format!("ih*{factor}")),
                Filter::new("crop").positional(width).positional(height),
            ]
        }
        EffectKind::Fade => {
            let window = fade_window(effect.start_time, effect.end_time);
            vec![
                Filter::new("fade")
                    .arg("t", "in")
                    .arg("st", num(effect.start_time))
                    .arg("d", num(window)),
                Filter::new("fade")
                    .arg("t", "out")
                    .arg("st", num(effect.end_time - window))
                    .arg("d", num(window)),
            ]
        }
        EffectKind::Soften => {
            let radius = export_blur_radius(effect.intensity);
            vec![Filter::new("boxblur").positional(radius).positional(radius)]
        }
        EffectKind::Sparkle => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutflow_project_model::{NewClip, Timeline};

    #[test]
    fn test_first_by_start_skips_unexportable_kinds() {
        let mut timeline = Timeline::new();
        timeline
            .add_clip(NewClip::media(TrackKind::Video, "a.mp4", 0.0, 10.0))
            .unwrap();
        timeline
            .add_effect_clip(EffectKind::Soften, 6.0, 8.0, 50)
            .unwrap();
        timeline
            .add_effect_clip(EffectKind::Sparkle, 0.0, 2.0, 50)
            .unwrap();
        let (fade, _) = timeline
            .add_effect_clip(EffectKind::Fade, 3.0, 5.0, 50)
            .unwrap();

        let selected = EffectSelection::FirstByStart.select(&timeline);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, fade);
        assert_eq!(selected[0].kind, EffectKind::Fade);
    }

    #[test]
    fn test_selection_uses_linked_clip_window() {
        let mut timeline = Timeline::new();
        let (_, clip) = timeline
            .add_effect_clip(EffectKind::Amplify, 1.0, 2.0, 100)
            .unwrap();
        timeline.set_clip_window(clip, 4.0, 6.0).unwrap();

        let selected = EffectSelection::FirstByStart.select(&timeline);
        assert_eq!(
            (selected[0].start_time, selected[0].end_time),
            (4.0, 6.0)
        );
    }

    #[test]
    fn test_no_exportable_effect_selects_nothing() {
        let mut timeline = Timeline::new();
        timeline
            .add_effect_clip(EffectKind::Sparkle, 0.0, 2.0, 50)
            .unwrap();
        assert!(EffectSelection::FirstByStart.select(&timeline).is_empty());
    }

    #[test]
    fn test_intensity_mappings() {
        assert_eq!(amplify_factor(0.0), 1.0);
        assert_eq!(amplify_factor(1.0), 1.5);
        assert_eq!(export_blur_radius(0.0), 1);
        assert_eq!(export_blur_radius(0.5), 3);
        assert_eq!(export_blur_radius(1.0), 5);
        assert_eq!(preview_blur_px(0.5), 5.0);
        assert_eq!(preview_blur_px(1.0), 10.0);
    }

    #[test]
    fn test_fade_window_is_capped() {
        assert_eq!(fade_window(0.0, 10.0), 1.0);
        assert_eq!(fade_window(2.0, 3.0), 0.5);
    }

    #[test]
    fn test_fade_filters() {
        let effect = SelectedEffect {
            id: EffectId(1),
            kind: EffectKind::Fade,
            start_time: 2.0,
            end_time: 6.0,
            intensity: 0.5,
        };
        let rendered: Vec<String> = effect_filters(&effect, 1920, 1080)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rendered, vec!["fade=t=in:st=2:d=1", "fade=t=out:st=5:d=1"]);
    }

    #[test]
    fn test_amplify_filters_crop_back_to_canvas() {
        let effect = SelectedEffect {
            id: EffectId(1),
            kind: EffectKind::Amplify,
            start_time: 0.0,
            end_time: 1.0,
            intensity: 0.5,
        };
        let rendered: Vec<String> = effect_filters(&effect, 1280, 720)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rendered, vec!["scale=iw*1.25:ih*1.25", "crop=1280:720"]);
    }
}
