// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use qrcapture::framing::{Rect, Resolution};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "qrcapture")]
#[command(about = "Barcode scanning pipeline over camera-style preview frames")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan image files as if they were camera preview frames
    Scan {
        /// Image files, served as preview frames in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Screen resolution the scan window is laid out on (default: image size)
        #[arg(short, long, value_parser = parse_resolution)]
        screen: Option<Resolution>,

        /// Fixed scan window size instead of the automatic one
        #[arg(short, long, value_parser = parse_resolution)]
        framing: Option<Resolution>,

        /// On-screen scan window bounds as LEFT,TOP,RIGHT,BOTTOM
        #[arg(long, value_parser = parse_rect)]
        scan_window: Option<Rect>,

        /// Config file (default: ~/.config/qrcapture/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Keep scanning after a result instead of stopping at the first one
        #[arg(long)]
        continuous: bool,

        /// Look for light codes on a dark background
        #[arg(long)]
        invert: bool,
    },

    /// Print the scan window for a screen and camera preview size
    Framing {
        /// Screen resolution, e.g. 1080x1920
        #[arg(short, long, value_parser = parse_resolution)]
        screen: Resolution,

        /// Camera preview resolution, e.g. 1920x1080
        #[arg(short, long, value_parser = parse_resolution)]
        camera: Resolution,

        /// Fixed scan window size instead of the automatic one
        #[arg(short, long, value_parser = parse_resolution)]
        framing: Option<Resolution>,

        /// On-screen scan window bounds as LEFT,TOP,RIGHT,BOTTOM
        #[arg(long, value_parser = parse_rect)]
        scan_window: Option<Rect>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn parse_resolution(value: &str) -> Result<Resolution, String> {
    Resolution::parse(value)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))
}

fn parse_rect(value: &str) -> Result<Rect, String> {
    let parts: Vec<i32> = value
        .split(',')
        .map(|p| p.trim().parse::<i32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid rect '{}': {}", value, e))?;
    match parts[..] {
        [left, top, right, bottom] => Ok(Rect::new(left, top, right, bottom)),
        _ => Err(format!("expected LEFT,TOP,RIGHT,BOTTOM, got '{}'", value)),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=qrcapture::capture=trace, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            files,
            screen,
            framing,
            scan_window,
            config,
            continuous,
            invert,
        } => cli::scan_files(cli::ScanOptions {
            files,
            screen,
            framing,
            scan_window,
            config,
            continuous,
            invert,
        }),
        Commands::Framing {
            screen,
            camera,
            framing,
            scan_window,
            json,
        } => cli::print_framing(screen, camera, framing, scan_window, json),
    }
}
