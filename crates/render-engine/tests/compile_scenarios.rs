use std::collections::HashSet;
use std::path::PathBuf;

use cutflow_common::config::RenderDefaults;
use cutflow_project_model::{ExportRequest, NewClip, TextOverlay, Timeline, TrackKind};
use cutflow_render_engine::graph::PadRef;
use cutflow_render_engine::{compile, ChainRole, CompileOptions, InvocationPlan, Label, ResolvedSources};
use proptest::prelude::*;

fn options() -> CompileOptions {
    CompileOptions::new(&RenderDefaults::default(), "/tmp/work", "/p/exports/out.mp4")
}

fn resolve_all(timeline: &Timeline) -> ResolvedSources {
    timeline
        .clips()
        .iter()
        .filter_map(|c| c.source.clone())
        .map(|s| {
            let path = PathBuf::from("/p").join(s.trim_start_matches('/'));
            (s, path)
        })
        .collect()
}

fn compile_timeline(timeline: &Timeline, duration: f64) -> InvocationPlan {
    compile(timeline, duration, &resolve_all(timeline), &options()).expect("timeline should compile")
}

fn load_fixture_request() -> ExportRequest {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("export-request.json");
    let content = std::fs::read_to_string(path).expect("fixture request should be readable");
    serde_json::from_str(&content).expect("fixture request should parse")
}

#[test]
fn two_videos_and_one_audio_concat_without_mix() {
    let mut timeline = Timeline::new();
    timeline
        .add_clip(NewClip::media(TrackKind::Video, "a.mp4", 0.0, 5.0))
        .unwrap();
    timeline
        .add_clip(NewClip::media(TrackKind::Video, "b.mp4", 5.0, 12.0))
        .unwrap();
    timeline
        .add_clip(NewClip::media(TrackKind::Audio, "music.mp3", 0.0, 10.0))
        .unwrap();
    assert_eq!(timeline.duration(), 12.0);

    let plan = compile_timeline(&timeline, timeline.duration());

    assert_eq!(plan.inputs.len(), 3);
    let concat = plan
        .graph
        .find(|r| matches!(r, ChainRole::Concat { .. }))
        .expect("concat node");
    assert_eq!(concat.role, ChainRole::Concat { inputs: 2 });
    assert_eq!(concat.inputs.len(), 2);
    assert_eq!(plan.mix_nodes(), 0);
    assert_eq!(plan.audio_out, Some(Label::new("a0")));

    let args = plan.to_args();
    assert!(args.iter().any(|a| a == "-shortest"));
    let t = args.iter().position(|a| a == "-t").unwrap();
    assert_eq!(args[t + 1], "12");
}

#[test]
fn single_image_loops_then_trims_without_concat() {
    let mut timeline = Timeline::new();
    timeline
        .add_clip(NewClip::media(TrackKind::Image, "still.png", 0.0, 5.0))
        .unwrap();
    assert_eq!(timeline.duration(), 5.0);

    let plan = compile_timeline(&timeline, timeline.duration());
    assert_eq!(plan.concat_nodes(), 0);
    assert_eq!(plan.graph.chains().len(), 1);

    let chain = &plan.graph.chains()[0];
    assert!(matches!(chain.role, ChainRole::NormalizeImage { .. }));
    let names: Vec<&str> = chain.filters.iter().map(|f| f.name()).collect();
    let loop_at = names.iter().position(|n| *n == "loop").expect("loop filter");
    let trim_at = names.iter().position(|n| *n == "trim").expect("trim filter");
    assert!(loop_at < trim_at);
    assert!(!plan.to_args().iter().any(|a| a == "-shortest"));
}

#[test]
fn overlays_chain_in_list_order_regardless_of_windows() {
    let mut timeline = Timeline::new();
    timeline
        .add_clip(NewClip::media(TrackKind::Video, "a.mp4", 0.0, 10.0))
        .unwrap();
    let (t1, _) = timeline
        .add_text_clip(TextOverlay::new("T1"), 6.0, 8.0)
        .unwrap();
    let (t2, _) = timeline
        .add_text_clip(TextOverlay::new("T2"), 0.0, 2.0)
        .unwrap();
    let (t3, _) = timeline
        .add_text_clip(TextOverlay::new("T3"), 3.0, 4.0)
        .unwrap();

    let plan = compile_timeline(&timeline, timeline.duration());
    let overlays: Vec<_> = plan
        .graph
        .chains()
        .iter()
        .filter(|c| matches!(c.role, ChainRole::TextOverlay { .. }))
        .collect();

    assert_eq!(overlays.len(), 3);
    let order: Vec<ChainRole> = overlays.iter().map(|c| c.role).collect();
    assert_eq!(
        order,
        vec![
            ChainRole::TextOverlay { text: t1 },
            ChainRole::TextOverlay { text: t2 },
            ChainRole::TextOverlay { text: t3 },
        ]
    );
    // Each overlay consumes the previous one's output.
    for pair in overlays.windows(2) {
        assert_eq!(pair[1].inputs[0], PadRef::Label(pair[0].outputs[0].clone()));
    }
    assert_eq!(plan.video_out, Some(overlays[2].outputs[0].clone()));
}

#[test]
fn empty_overlay_window_is_skipped() {
    // Only loaded documents can carry an empty window; mutations reject it.
    let mut source = Timeline::new();
    source
        .add_clip(NewClip::media(TrackKind::Video, "a.mp4", 0.0, 10.0))
        .unwrap();
    source
        .add_text_clip(TextOverlay::new("gone"), 1.0, 2.0)
        .unwrap();
    let mut request = source.to_export_request();
    for clip in &mut request.clips {
        if clip.kind == TrackKind::Text {
            clip.end_time = clip.start_time;
        }
    }
    let (timeline, duration) = Timeline::from_export_request(request);

    let plan = compile_timeline(&timeline, duration);
    assert_eq!(plan.overlay_nodes(), 0);
    assert!(plan.side_files.is_empty());
}

#[test]
fn fixture_request_golden_graph() {
    let request = load_fixture_request();
    let (timeline, duration) = Timeline::from_export_request(request);
    let plan = compile_timeline(&timeline, duration);

    assert_eq!(
        plan.inputs,
        vec![
            PathBuf::from("/p/uploads/intro.mp4"),
            PathBuf::from("/p/uploads/main.mp4"),
            PathBuf::from("/p/uploads/music.mp3"),
        ]
    );

    let expected = [
        "[0:v]scale=1920:1080:force_original_aspect_ratio=decrease,pad=1920:1080:(ow-iw)/2:(oh-ih)/2,setsar=1,trim=duration=5,setpts=PTS-STARTPTS[v0]",
        "[1:v]scale=1920:1080:force_original_aspect_ratio=decrease,pad=1920:1080:(ow-iw)/2:(oh-ih)/2,setsar=1,trim=duration=7,setpts=PTS-STARTPTS[v1]",
        "[v0][v1]concat=n=2:v=1:a=0[vcat]",
        "[vcat]drawtext=textfile=/tmp/work/text-0.txt:fontsize=48:fontcolor=0xFFFFFF:x=100:y=100:box=1:boxcolor=black@0.5:boxborderw=5:enable='between(t,1,3)'[vt0]",
        "[vt0]scale=iw*1.25:ih*1.25,crop=1920:1080[vfx0]",
        "[2:a]asetpts=PTS-STARTPTS,atrim=0:10[a0]",
    ]
    .join(";");
    assert_eq!(plan.graph.render(), expected);

    let args = plan.to_args();
    let maps: Vec<&str> = args
        .windows(2)
        .filter(|w| w[0] == "-map")
        .map(|w| w[1].as_str())
        .collect();
    assert_eq!(maps, vec!["[vfx0]", "[a0]"]);
    assert_eq!(plan.side_files[0].contents, "Welcome");
}

fn media_timeline(visual: &[(bool, usize, f64)], audio: &[(usize, f64)]) -> Timeline {
    let mut timeline = Timeline::new();
    let mut cursor = 0.0;
    for (is_image, source, span) in visual {
        let (kind, ext) = if *is_image {
            (TrackKind::Image, "png")
        } else {
            (TrackKind::Video, "mp4")
        };
        timeline
            .add_clip(NewClip::media(kind, format!("v{source}.{ext}"), cursor, cursor + span))
            .unwrap();
        cursor += span;
    }
    for (source, span) in audio {
        timeline
            .add_clip(NewClip::media(TrackKind::Audio, format!("a{source}.mp3"), 0.0, *span))
            .unwrap();
    }
    timeline
}

proptest! {
    #[test]
    fn input_count_matches_distinct_sources(
        visual in prop::collection::vec((any::<bool>(), 0usize..3, 0.5f64..20.0), 0..5),
        audio in prop::collection::vec((0usize..3, 0.5f64..20.0), 0..5),
    ) {
        prop_assume!(!visual.is_empty() || !audio.is_empty());
        let timeline = media_timeline(&visual, &audio);
        let plan = compile_timeline(&timeline, timeline.duration());

        let distinct: HashSet<&str> = timeline
            .clips()
            .iter()
            .filter_map(|c| c.source.as_deref())
            .collect();
        prop_assert_eq!(plan.inputs.len(), distinct.len());
    }

    #[test]
    fn concat_and_mix_nodes_follow_clip_counts(
        visual_count in 0usize..6,
        audio_count in 0usize..6,
    ) {
        prop_assume!(visual_count + audio_count > 0);
        let visual: Vec<(bool, usize, f64)> = (0..visual_count).map(|i| (i % 2 == 0, i, 2.0)).collect();
        let audio: Vec<(usize, f64)> = (0..audio_count).map(|i| (i, 3.0)).collect();
        let timeline = media_timeline(&visual, &audio);
        let plan = compile_timeline(&timeline, timeline.duration());

        if visual_count > 1 {
            prop_assert_eq!(plan.concat_nodes(), 1);
            let concat = plan.graph.find(|r| matches!(r, ChainRole::Concat { .. })).unwrap();
            prop_assert_eq!(concat.inputs.len(), visual_count);
        } else {
            prop_assert_eq!(plan.concat_nodes(), 0);
        }

        if audio_count > 1 {
            prop_assert_eq!(plan.mix_nodes(), 1);
            let mix = plan.graph.find(|r| matches!(r, ChainRole::Mix { .. })).unwrap();
            prop_assert_eq!(mix.inputs.len(), audio_count);
        } else {
            prop_assert_eq!(plan.mix_nodes(), 0);
        }

        prop_assert_eq!(plan.shortest(), audio_count > 0);
        prop_assert_eq!(plan.video_out.is_some(), visual_count > 0);
    }
}
