// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Saving a snapshot
//! - Streaming frames and reporting throughput

use camera_access::{CameraDevice, CameraManager, Config, FilterType, Frame};
use chrono::Local;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Folder created under the pictures directory
const DEFAULT_SAVE_FOLDER: &str = "camera-access";

/// How long to wait for the first frame after starting a session
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause between polls when no new frame arrived
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Frames discarded while the sensor settles
const WARMUP: Duration = Duration::from_millis(500);

/// Options of the snapshot command
pub struct SnapshotOptions {
    pub camera: usize,
    pub output: Option<PathBuf>,
    pub zoom: f32,
    pub filter: Option<String>,
    pub white_balance: Option<String>,
    pub alternative: bool,
}

/// List all available cameras
pub fn list_cameras(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let backend_name = config.backend.display_name();
    let manager = CameraManager::new(config)?;
    let cameras = manager.available_cameras();

    if cameras.is_empty() {
        println!("No cameras found ({} backend).", backend_name);
        return Ok(());
    }

    println!("Available cameras ({}):", backend_name);
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        let default_marker = if camera.is_default { " (default)" } else { "" };
        println!("  [{}] {}{}", index, camera.name, default_marker);
        println!("      Id: {}", camera.id);
        println!("      Position: {}", camera.position);
        println!();
    }

    Ok(())
}

/// Capture a single frame and save it as an image
pub fn take_snapshot(
    config: Config,
    options: SnapshotOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let manager = CameraManager::new(config)?;
    let camera = select_camera(&manager, options.camera)?;
    println!("Using camera: {}", camera.name);

    manager.set_zoom_level(options.zoom)?;
    if let Some(mode) = options.white_balance.as_deref() {
        let applied = manager.set_white_balance(mode);
        println!("White balance: {}", applied);
    }
    if let Some(name) = options.filter.as_deref() {
        let filter = FilterType::from_name(name);
        if filter == FilterType::None && !name.eq_ignore_ascii_case("none") {
            return Err(format!("Unknown filter '{}'", name).into());
        }
        let adjustments = manager.image_adjustments().with_filter(filter);
        manager.set_image_adjustments(adjustments);
    }

    let format = manager.start_session(&camera.id)?;
    println!("Capture format: {}", format);

    println!("Capturing...");
    let frame = if options.alternative {
        wait_for_first_frame(&manager, FIRST_FRAME_TIMEOUT)
            .and_then(|_| manager.capture_frame_alternative(true))
    } else {
        capture_after_warmup(&manager)
    };
    manager.stop_session()?;

    let frame = frame.ok_or("Failed to capture frame from camera")?;

    let output_path = match options.output {
        Some(path) if path.is_dir() => path.join(default_file_name()),
        Some(path) => path,
        None => get_default_snapshot_dir().join(default_file_name()),
    };
    save_frame(&frame, &output_path)?;

    println!("Snapshot saved: {}", output_path.display());
    Ok(())
}

/// Stream frames until the duration ends or Ctrl+C
pub fn stream(
    config: Config,
    camera_index: usize,
    duration: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let manager = CameraManager::new(config)?;
    let camera = select_camera(&manager, camera_index)?;
    println!("Using camera: {}", camera.name);

    let format = manager.start_session(&camera.id)?;
    println!("Streaming {} (press Ctrl+C to stop)", format);

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = Arc::clone(&stop_flag);
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    let start = Instant::now();
    let target_duration = Duration::from_secs(duration);
    let mut last_report = Instant::now();
    let mut delivered: u64 = 0;
    let mut last_frame_time = None;

    while duration == 0 || start.elapsed() < target_duration {
        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Interrupted");
            break;
        }

        match manager.capture_frame(false) {
            Some(frame) if last_frame_time != Some(frame.captured_at) => {
                last_frame_time = Some(frame.captured_at);
                delivered += 1;
            }
            _ => std::thread::sleep(POLL_INTERVAL),
        }

        if last_report.elapsed() >= Duration::from_secs(1) {
            let stats = manager.stats();
            let elapsed = start.elapsed().as_secs_f64();
            print!(
                "\r{:.1}s  delivered {:.1} fps  captured {}  failures {}  interval {:.1} ms   ",
                elapsed,
                delivered as f64 / elapsed,
                stats.frames_captured,
                stats.read_failures,
                stats.interval_ms
            );
            std::io::stdout().flush()?;
            last_report = Instant::now();
        }
    }
    println!();

    let stats = manager.stats();
    manager.stop_session()?;
    println!(
        "Captured {} frames, {} read failures, final interval {:.1} ms",
        stats.frames_captured, stats.read_failures, stats.interval_ms
    );
    Ok(())
}

/// Print the effective configuration as JSON
pub fn show_config(
    config: &Config,
    path: Option<&Path>,
    save: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(path) => println!("# {}", path.display()),
        None => println!("# no config location available"),
    }
    println!("{}", serde_json::to_string_pretty(config)?);

    if save {
        let path = path.ok_or("No config location to save to")?;
        config.save(path)?;
        println!("Configuration saved: {}", path.display());
    }
    Ok(())
}

fn select_camera(
    manager: &CameraManager,
    index: usize,
) -> Result<CameraDevice, Box<dyn std::error::Error>> {
    let cameras = manager.available_cameras();
    if cameras.is_empty() {
        return Err("No cameras found".into());
    }
    cameras.get(index).cloned().ok_or_else(|| {
        format!(
            "Camera index {} out of range (0-{})",
            index,
            cameras.len() - 1
        )
        .into()
    })
}

fn wait_for_first_frame(manager: &CameraManager, timeout: Duration) -> Option<Arc<Frame>> {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if let Some(frame) = manager.capture_frame(true) {
            return Some(frame);
        }
    }
    None
}

/// Keep taking frames through the warm-up period, then take one more
fn capture_after_warmup(manager: &CameraManager) -> Option<Arc<Frame>> {
    let start = Instant::now();
    let mut frame = None;
    while start.elapsed() < FIRST_FRAME_TIMEOUT {
        if let Some(f) = manager.capture_frame(true) {
            frame = Some(f);
            if start.elapsed() > WARMUP {
                break;
            }
        }
    }
    frame
}

/// Save a BGRA frame; the format follows the file extension
fn save_frame(frame: &Frame, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let row_bytes = frame.width as usize * 4;
    let mut rgba = Vec::with_capacity(row_bytes * frame.height as usize);
    for row in frame.data.chunks(frame.stride as usize).take(frame.height as usize) {
        for pixel in row[..row_bytes].chunks_exact(4) {
            rgba.extend_from_slice(&[pixel[2], pixel[1], pixel[0], pixel[3]]);
        }
    }

    let image = image::RgbaImage::from_raw(frame.width, frame.height, rgba)
        .ok_or("Frame buffer does not match its dimensions")?;
    let is_jpeg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));
    if is_jpeg {
        // JPEG has no alpha channel
        image::DynamicImage::ImageRgba8(image).to_rgb8().save(path)?;
    } else {
        image.save(path)?;
    }
    Ok(())
}

fn default_file_name() -> String {
    format!("snapshot_{}.png", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Get default snapshot directory
fn get_default_snapshot_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(DEFAULT_SAVE_FOLDER)
}
