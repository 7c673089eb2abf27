//! Terminal presentation of detection results.

use owo_colors::OwoColorize;

use crate::dsp::HitEvent;

/// One line per hit, timestamp first so lines sort naturally.
pub fn format_hit(hit: &HitEvent) -> String {
    format!(
        "{:>10.3}s  sample {:<12} envelope {:.3}",
        hit.time_secs, hit.sample_index, hit.envelope
    )
}

pub fn print_hit(hit: &HitEvent) {
    println!("{} {}", "HIT".red().bold(), format_hit(hit));
}

/// Fixed-width envelope meter, `#` for the filled part. Levels at or
/// above 1.0 fill the whole bar.
pub fn format_level_bar(level: f32, width: usize) -> String {
    let clamped = level.clamp(0.0, 1.0);
    let filled = (clamped * width as f32).round() as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    for i in 0..width {
        bar.push(if i < filled { '#' } else { ' ' });
    }
    bar.push(']');
    bar
}

/// Redraws the live envelope meter in place on stderr, keeping stdout
/// clean for hit lines.
pub fn print_level(level: f32) {
    eprint!("\r{} {:.3}", format_level_bar(level, 30), level);
}

pub fn print_device_list(devices: &[String]) {
    println!("{}", "Available input devices:".bold());
    for device in devices {
        println!("  {}", device);
    }
}
