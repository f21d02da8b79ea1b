//! Check system capabilities.

use kenburns_common::config::{config_file_path, AppConfig};
use kenburns_render_engine::tool_available;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Kenburns System Check");
    println!("{}", "=".repeat(50));

    let mut ready = true;
    for (role, binary) in [
        ("Encoder", config.encoder.ffmpeg.as_str()),
        ("Prober", config.encoder.ffprobe.as_str()),
    ] {
        if tool_available(binary) {
            println!("[OK] {role}: {binary}");
        } else {
            println!("[MISSING] {role}: {binary} did not respond to -version");
            ready = false;
        }
    }

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[INFO] Config: defaults ({} not present)", config_path.display());
    }

    match &config.render.font_path {
        Some(path) if path.is_file() => println!("[OK] Overlay font: {}", path.display()),
        Some(path) => {
            println!("[WARN] Overlay font: {} not found", path.display());
        }
        None => println!("[OK] Overlay font: bundled DejaVu Sans"),
    }

    println!(
        "[OK] Transitions: max {:.2}s, divisor {}, {:?}; scale clamp [{}, {}]",
        config.interpolation.max_window_secs,
        config.interpolation.window_divisor,
        config.interpolation.easing,
        config.interpolation.min_scale,
        config.interpolation.max_scale,
    );

    println!();
    if ready {
        println!("All required tools are available. Kenburns is ready to export.");
    } else {
        println!("Some required tools are missing. Install ffmpeg to export.");
    }

    Ok(())
}
