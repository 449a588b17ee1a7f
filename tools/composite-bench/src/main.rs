//! Composite benchmark CLI for Liquid Glass.
//!
//! Crops a region out of a screenshot, renders it with the default style
//! and reports how long each stage took.
//!
//! Usage:
//!   cargo run -- <screenshot.png> <x> <y> <width> <height> [dpr] [out.png]
//!   cargo run -- <screenshot.png> --full [out.png]
//!
//! Output defaults to `composite.png` in `LIQUID_GLASS_DOWNLOAD_DIR`.
//! `--wallpaper` anywhere renders over the first `LIQUID_GLASS_WALLPAPERS`
//! entry instead of the default gradient.

use std::path::PathBuf;
use std::time::Instant;

use liquid_glass_lib::capture::{crop, decode_raster};
use liquid_glass_lib::config::Config;
use liquid_glass_lib::geometry::{scale_to_device_pixels, SelectionRect};
use liquid_glass_lib::render::{render, Background, HttpWallpaperProvider, WallpaperProvider};
use liquid_glass_lib::settings::StyleParams;

fn main() {
    liquid_glass_lib::init_logging();

    let mut args: Vec<String> = std::env::args().collect();
    let use_wallpaper = args.iter().any(|a| a == "--wallpaper");
    args.retain(|a| a != "--wallpaper");

    if args.len() < 3 {
        eprintln!("Usage:");
        eprintln!("  composite-bench <screenshot.png> <x> <y> <width> <height> [dpr] [out.png]");
        eprintln!("  composite-bench <screenshot.png> --full [out.png]");
        std::process::exit(1);
    }

    if let Err(e) = run(&args, &Config::from_env(), use_wallpaper) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &[String], config: &Config, use_wallpaper: bool) -> Result<(), String> {
    let start = Instant::now();

    let bytes = std::fs::read(&args[1]).map_err(|e| format!("Cannot read {}: {}", args[1], e))?;
    let viewport = decode_raster(&bytes).map_err(|e| e.to_string())?;
    let decode_ms = start.elapsed().as_millis();

    let (rect, pixel_ratio, out) = if args[2] == "--full" {
        let rect = SelectionRect::new(0.0, 0.0, viewport.width() as f64, viewport.height() as f64);
        (rect, 1.0, args.get(3))
    } else {
        let num = |i: usize| -> Result<f64, String> {
            let raw = args.get(i).ok_or("Missing rectangle argument")?;
            raw.parse::<f64>().map_err(|_| format!("Not a number: {}", raw))
        };
        let rect = SelectionRect::new(num(2)?, num(3)?, num(4)?, num(5)?);
        let pixel_ratio = match args.get(6) {
            Some(raw) => raw.parse::<f64>().map_err(|_| format!("Not a number: {}", raw))?,
            None => 1.0,
        };
        (rect, pixel_ratio, args.get(7))
    };

    let crop_start = Instant::now();
    let pixel_rect = scale_to_device_pixels(rect, pixel_ratio).to_pixel_rect();
    let cropped = crop(&viewport, pixel_rect).map_err(|e| e.to_string())?;
    let crop_ms = crop_start.elapsed().as_millis();

    let mut style = StyleParams::default();
    let mut wallpaper = None;
    let mut fetch_ms = 0;
    if use_wallpaper {
        let reference = config
            .wallpapers
            .first()
            .ok_or("--wallpaper needs LIQUID_GLASS_WALLPAPERS")?;
        let fetch_start = Instant::now();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| format!("Cannot start runtime: {}", e))?;
        let image = runtime
            .block_on(HttpWallpaperProvider::new().fetch(reference))
            .map_err(|e| e.to_string())?;
        fetch_ms = fetch_start.elapsed().as_millis();
        style.background = Background::Wallpaper(reference.clone());
        wallpaper = Some(image);
    }

    let render_start = Instant::now();
    let frame = render(&cropped, &style, wallpaper.as_ref());
    let render_ms = render_start.elapsed().as_millis();

    let encode_start = Instant::now();
    let png = frame.encode_png().map_err(|e| e.to_string())?;
    let encode_ms = encode_start.elapsed().as_millis();

    let out = out
        .map(PathBuf::from)
        .unwrap_or_else(|| config.download_dir.join("composite.png"));
    std::fs::write(&out, &png).map_err(|e| format!("Cannot write {}: {}", out.display(), e))?;

    println!("=== Composite Benchmark ===");
    println!("Input:   {} ({}x{})", args[1], viewport.width(), viewport.height());
    println!(
        "Region:  {}x{} at {},{} (dpr {})",
        pixel_rect.width, pixel_rect.height, pixel_rect.x, pixel_rect.y, pixel_ratio
    );
    println!("Output:  {} ({}x{}, {} bytes)", out.display(), frame.width(), frame.height(), png.len());
    println!("Decode:  {}ms", decode_ms);
    println!("Crop:    {}ms", crop_ms);
    if use_wallpaper {
        println!("Fetch:   {}ms", fetch_ms);
    }
    println!("Render:  {}ms", render_ms);
    println!("Encode:  {}ms", encode_ms);
    println!("Total:   {}ms", start.elapsed().as_millis());

    Ok(())
}
