//! lucidgif - Inspect and export GIF images
//!
//! A command-line tool for printing GIF metadata and exporting decoded
//! frames as PNG files.

use clap::{Parser, Subcommand};
use lucid_gif::{gif_decode_file, gif_decode_file_with, ExtensionRegistry};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lucidgif")]
#[command(version)]
#[command(about = "Inspect and export GIF images", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print stream metadata, frame geometry and extension payloads
    Info {
        /// Input GIF file
        input: PathBuf,
    },

    /// Decode a GIF and write every frame as a PNG file
    Export {
        /// Input GIF file
        input: PathBuf,

        /// Output directory (default: alongside the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { input } => {
            let mut registry = ExtensionRegistry::new();
            registry.register_comment(|comment| {
                println!("comment: {}", comment.text());
            })?;
            registry.register_application(|app| {
                println!(
                    "application: {}{} ({} data byte(s))",
                    String::from_utf8_lossy(&app.identifier),
                    String::from_utf8_lossy(&app.auth_code),
                    app.data.total_len()
                );
            })?;
            registry.register_graphics(|gc| {
                println!(
                    "graphics control: delay {} ms, disposal {}, transparent index {:?}",
                    gc.delay_millis(),
                    gc.disposal_method(),
                    gc.transparent_index()
                );
            })?;

            let gif = gif_decode_file_with(&input, &registry)
                .map_err(|e| format!("Failed to decode '{}': {}", input.display(), e))?;

            println!("version: {}", gif.version());
            println!("screen: {}x{}", gif.width(), gif.height());
            match gif.global_palette() {
                Some(palette) => println!("global palette: {} color(s)", palette.len()),
                None => println!("global palette: none"),
            }
            println!("frames: {}", gif.frame_count());
            for (i, frame) in gif.frames().iter().enumerate() {
                println!(
                    "  frame {}: {}x{} at ({}, {})",
                    i,
                    frame.width(),
                    frame.height(),
                    frame.descriptor.left,
                    frame.descriptor.top
                );
            }
        }

        Commands::Export { input, output } => {
            let gif = gif_decode_file(&input)
                .map_err(|e| format!("Failed to decode '{}': {}", input.display(), e))?;

            eprintln!(
                "Decoded '{}': {}x{}, {} frame(s)",
                input.display(),
                gif.width(),
                gif.height(),
                gif.frame_count()
            );

            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "frame".to_string());
            let dir = match output {
                Some(dir) => {
                    std::fs::create_dir_all(&dir)?;
                    dir
                }
                None => input.parent().unwrap_or(std::path::Path::new(".")).to_path_buf(),
            };

            for (i, frame) in gif.frames().iter().enumerate() {
                let mut raw = Vec::with_capacity(frame.pixels.len() * 3);
                for color in &frame.pixels {
                    raw.extend_from_slice(&[color.r, color.g, color.b]);
                }
                let img = image::RgbImage::from_raw(
                    u32::from(frame.width()),
                    u32::from(frame.height()),
                    raw,
                )
                .ok_or("Failed to create image from decoded frame")?;

                let path = dir.join(format!("{}_{}.png", stem, i));
                img.save(&path)?;
                eprintln!(
                    "  frame {}: {}x{} -> '{}'",
                    i,
                    frame.width(),
                    frame.height(),
                    path.display()
                );
            }
        }
    }

    Ok(())
}
