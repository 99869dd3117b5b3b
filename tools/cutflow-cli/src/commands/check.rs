//! Check that the external media tools are available.

use cutflow_common::config::AppConfig;
use cutflow_render_engine::probe::command_exists;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("CutFlow System Check");
    println!("{}", "=".repeat(50));

    let tools = [
        ("Renderer", &config.render.ffmpeg_binary, true),
        ("Probe", &config.render.ffprobe_binary, false),
    ];

    let mut all_required_ok = true;
    for (role, binary, required) in tools {
        if command_exists(binary) {
            println!("[OK] {role}: {binary}");
        } else if required {
            all_required_ok = false;
            println!("[FAIL] {role}: {binary} not found on PATH");
        } else {
            println!("[WARN] {role}: {binary} not found, imports fall back to default durations");
        }
    }

    println!();
    println!(
        "Canvas: {}x{}, {} / {}",
        config.render.canvas_width,
        config.render.canvas_height,
        config.render.video_codec,
        config.render.audio_codec
    );

    println!();
    if all_required_ok {
        println!("All required tools are available. CutFlow is ready to export.");
    } else {
        println!("Some required tools are missing. Install ffmpeg to export.");
    }

    Ok(())
}
