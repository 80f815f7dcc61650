//! Application entry point — strum-click.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse CLI arguments (device / threshold / debounce overrides).
//! 3. Enumerate input devices and auto-suggest an instrument cable.
//! 4. Create the tokio runtime (multi-thread, 2 workers) and the click
//!    dispatcher.
//! 5. Run the interactive menu until the user quits.

use std::io::{self, Write};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use strum_click::audio::{
    list_input_devices, suggest_instrument_device, CpalBackend, InputDeviceInfo,
};
use strum_click::click::MouseClicker;
use strum_click::config::DetectorConfig;
use strum_click::detector::{run_level_meter, LevelReading, OnsetDetector};
use strum_click::dispatch::ActionDispatcher;

/// Width of the level-meter bar in characters.
const METER_WIDTH: usize = 50;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Turn instrument strums into mouse clicks.
#[derive(Debug, Parser)]
#[command(name = "strum-click", version, about)]
struct Cli {
    /// Input device index (see --list-devices). Default: auto-suggested
    /// instrument device, falling back to the system default input.
    #[arg(long)]
    device: Option<usize>,

    /// RMS volume threshold that triggers a click, in (0.0, 1.0].
    #[arg(long)]
    threshold: Option<f32>,

    /// Minimum seconds between clicks.
    #[arg(long)]
    debounce: Option<f32>,

    /// List input devices and exit.
    #[arg(long)]
    list_devices: bool,
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // 2. Device listing / selection
    let devices = list_input_devices().context("failed to enumerate audio input devices")?;

    if cli.list_devices {
        print_device_list(&devices);
        return Ok(());
    }

    println!("=== strum-click ===");
    println!("This program converts your instrument strums into mouse clicks!");
    println!();
    print_device_list(&devices);

    let device = match cli.device {
        Some(index) => {
            if !devices.iter().any(|d| d.index == index) {
                anyhow::bail!("input device index {index} does not exist (see list above)");
            }
            Some(index)
        }
        None => choose_device(&devices),
    };

    // 3. Configuration (edited by the menu while the detector is Idle)
    let mut config = DetectorConfig {
        device,
        ..Default::default()
    };
    if let Some(t) = cli.threshold {
        config.threshold = t;
    }
    if let Some(d) = cli.debounce {
        config.debounce_secs = d;
    }
    config
        .validate()
        .context("invalid command-line configuration")?;

    // 4. Runtime + click dispatcher
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let (dispatcher, mut click_errors) =
        ActionDispatcher::new(rt.handle().clone(), Arc::new(MouseClicker::new()));

    // Drain contained click failures so the channel never accumulates.
    rt.spawn(async move {
        while let Some(e) = click_errors.recv().await {
            log::debug!("click error drained: {e}");
        }
    });

    let detector = OnsetDetector::new(dispatcher);

    // 5. Menu loop
    loop {
        println!();
        println!("=== MENU ===");
        println!("Current sensitivity: {}", config.threshold);
        println!("1. Start clicking mode");
        println!("2. Test audio levels (recommended first)");
        println!("3. Adjust sensitivity");
        println!("4. Quit");

        match prompt("Choose option (1-4): ")?.as_str() {
            "1" => run_clicking_mode(&detector, &config)?,
            "2" => run_level_test(&config)?,
            "3" => adjust_sensitivity(&mut config)?,
            "4" => break,
            other => println!("Invalid choice {other:?}. Please enter 1-4."),
        }
    }

    println!("Goodbye!");
    Ok(())
}

// ---------------------------------------------------------------------------
// Menu actions
// ---------------------------------------------------------------------------

/// Option 1 — run the detector until the user presses Enter.
fn run_clicking_mode(detector: &OnsetDetector, config: &DetectorConfig) -> Result<()> {
    println!();
    println!("=== TIPS ===");
    println!("- Make sure your game window is active to receive clicks");
    println!("- Start with gentle strumming to test");
    println!();
    prompt("Press Enter when ready to start...")?;

    if let Err(e) = detector.start(config.clone(), CpalBackend::new()) {
        println!("Could not start: {e}");
        print_troubleshooting();
        return Ok(());
    }

    println!(
        "Listening for instrument input... (threshold: {})",
        config.threshold
    );
    println!("Strum to trigger mouse clicks. Press Enter to stop.");
    prompt("")?;

    detector.stop();
    if let Some(fault) = detector.take_fault() {
        println!("Audio stream error: {fault}");
        print_troubleshooting();
    }
    println!("Stopped.");
    Ok(())
}

/// Option 2 — level meter for a user-chosen duration, no clicking.
fn run_level_test(config: &DetectorConfig) -> Result<()> {
    let secs: u64 = prompt("Test duration in seconds (default 10): ")?
        .parse()
        .unwrap_or(10);

    println!("Testing audio levels for {secs} seconds...");
    println!("Play your instrument to see volume levels:");

    let (tx, rx) = mpsc::channel::<LevelReading>();
    let threshold = config.threshold;

    // Presentation runs on its own thread; the meter blocks this one.
    let renderer = std::thread::spawn(move || {
        while let Ok(reading) = rx.recv() {
            print!("\r{}", render_bar(reading.volume, threshold));
            let _ = io::stdout().flush();
        }
    });

    let result = run_level_meter(
        config,
        Duration::from_secs(secs),
        CpalBackend::new(),
        tx,
    );
    let _ = renderer.join();
    println!();

    match result {
        Ok(()) => {
            println!("Test complete! Pick a threshold just below the volume you saw while strumming.");
        }
        Err(e) => {
            println!("Test failed: {e}");
            print_troubleshooting();
        }
    }
    Ok(())
}

/// Option 3 — edit the threshold (only reachable while Idle).
fn adjust_sensitivity(config: &mut DetectorConfig) -> Result<()> {
    match prompt("Enter new sensitivity (0.001-1.0): ")?.parse::<f32>() {
        Ok(value) if value.is_finite() => {
            config.threshold = value.clamp(0.001, 1.0);
            println!("Sensitivity adjusted to: {}", config.threshold);
        }
        _ => println!("Invalid input. Please enter a number between 0.001 and 1.0"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn print_device_list(devices: &[InputDeviceInfo]) {
    println!("Available audio input devices:");
    for d in devices {
        println!(
            "{}: {} - inputs: {} - sample rate: {}",
            d.index, d.name, d.max_input_channels, d.default_sample_rate
        );
    }
    if devices.is_empty() {
        println!("(none found)");
    }
}

/// Pick a device: auto-suggestion first, manual entry otherwise, system
/// default as the final fallback.
fn choose_device(devices: &[InputDeviceInfo]) -> Option<usize> {
    if let Some(suggested) = suggest_instrument_device(devices) {
        println!(
            "*** Found potential instrument device: {} ***",
            suggested.name
        );
        return Some(suggested.index);
    }

    println!();
    println!("Couldn't auto-detect an instrument cable.");
    println!("Look at the list above and find your instrument input.");
    match prompt("Enter the device number (blank for system default): ") {
        Ok(line) if !line.is_empty() => match line.parse::<usize>() {
            Ok(index) if devices.iter().any(|d| d.index == index) => Some(index),
            _ => {
                println!("Invalid input. Using default input device.");
                None
            }
        },
        _ => None,
    }
}

/// One line of the level meter, `\r`-overwritten in place.
fn render_bar(volume: f32, threshold: f32) -> String {
    let filled = ((volume * METER_WIDTH as f32) as usize).min(METER_WIDTH);
    let bar: String = "█".repeat(filled) + &"░".repeat(METER_WIDTH - filled);
    let threshold_pos = ((threshold * METER_WIDTH as f32) as usize).min(METER_WIDTH);
    format!("Volume: {volume:.4} |{bar}| threshold at pos {threshold_pos}")
}

fn print_troubleshooting() {
    println!();
    println!("Troubleshooting tips:");
    println!("1. Make sure your instrument cable is plugged in");
    println!("2. Try selecting a different device number");
    println!("3. Check your system sound settings - the cable should show input levels");
    println!("4. Check that this user has permission to access the audio device");
}

/// Print `msg`, flush, and read one trimmed line from stdin.
fn prompt(msg: &str) -> Result<String> {
    print!("{msg}");
    io::stdout().flush().context("failed to flush stdout")?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read stdin")?;
    Ok(line.trim().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_is_always_meter_width() {
        for v in [0.0_f32, 0.01, 0.5, 1.0, 2.0] {
            let line = render_bar(v, 0.01);
            let bar: String = line
                .chars()
                .skip_while(|&c| c != '|')
                .skip(1)
                .take_while(|&c| c != '|')
                .collect();
            assert_eq!(bar.chars().count(), METER_WIDTH, "volume {v}");
        }
    }

    #[test]
    fn silent_bar_is_all_empty() {
        let line = render_bar(0.0, 0.01);
        assert!(!line.contains('█'));
    }

    #[test]
    fn loud_bar_is_all_full() {
        let line = render_bar(1.0, 0.01);
        assert!(!line.contains('░'));
    }

    #[test]
    fn overdriven_volume_is_clamped_to_the_bar() {
        let line = render_bar(3.0, 0.5);
        assert!(!line.contains('░'));
    }
}
