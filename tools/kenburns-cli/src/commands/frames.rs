//! Print the deterministic export frame clock.

use kenburns_common::clock::FrameClock;

pub fn run(duration: f64, fps: u32) -> anyhow::Result<()> {
    if fps == 0 {
        anyhow::bail!("--fps must be positive");
    }
    let clock = FrameClock::new(duration, fps);
    println!(
        "{} frame(s) for {duration}s at {fps} fps",
        clock.frame_count()
    );
    for tick in clock {
        println!("{:>6}  {:.6}", tick.index, tick.time_secs);
    }
    Ok(())
}
