//! Validate a timeline file.

use std::path::PathBuf;

use kenburns_common::config::AppConfig;
use kenburns_processing_core::diagnose;
use kenburns_processing_core::interpolate::Interpolator;
use kenburns_project_model::document::TimelineDocument;

pub fn run(path: PathBuf, config: &AppConfig) -> anyhow::Result<()> {
    println!("Validating timeline at: {}", path.display());

    let timeline = TimelineDocument::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load timeline: {e}"))?
        .into_timeline();

    println!("  Zoom effects: {}", timeline.effects().len());
    println!("  Text overlays: {}", timeline.overlays().len());
    println!("  Ends at: {:.3}s", timeline.end_time());

    let interpolator = Interpolator::from_config(&config.interpolation);
    for effect in timeline.effects() {
        println!(
            "    {:<16} [{:>7.3}s, {:>7.3}s] ({:.1}%, {:.1}%) x{:.2}  transition {:.3}s",
            effect.id,
            effect.start_time,
            effect.end_time,
            effect.x,
            effect.y,
            effect.scale,
            interpolator.transition_window(effect),
        );
    }

    let issues = diagnose(&timeline, interpolator.bounds());
    if issues.is_empty() {
        println!("\nTimeline is valid.");
    } else {
        println!("\nValidation issues:");
        for issue in &issues {
            println!("  - {issue}");
        }
        println!(
            "\n{} issue(s) found. Export still works; see notes above.",
            issues.len()
        );
    }

    Ok(())
}
