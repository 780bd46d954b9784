mod convert;

use anyhow::{Context, Result, bail};
use arboard::{Clipboard, ImageData};
use clap::Parser;
use convert::MagickConverter;
use image::ImageFormat;
use indicatif::{ProgressBar, ProgressStyle};
use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use zoom_enhance_core::viewport::SelectionEvent;
use zoom_enhance_core::{Config, Dials, Editor, GeminiClient, GifOptions, Point, Rect, init};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image to start from (PNG, JPEG, GIF, HEIC)
    input: PathBuf,

    /// Region to enhance as x,y,w,h in the current image's pixels; repeat to zoom further
    #[arg(short, long, value_parser = parse_rect)]
    select: Vec<Rect>,

    /// Enhance the whole image first, with dials suggested by the model
    #[arg(long)]
    auto: bool,

    /// Regenerate the last step with this prompt
    #[arg(long)]
    regenerate: Option<String>,

    /// Write the final step here (format from extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the zoom animation here
    #[arg(long)]
    gif: Option<PathBuf>,

    #[arg(long, default_value_t = 50)]
    sharpness: u32,

    #[arg(long, default_value_t = 50)]
    denoise: u32,

    #[arg(long, default_value_t = 50)]
    imagination: u32,

    /// Ask the model to hide an easter egg
    #[arg(long)]
    easter_egg: bool,

    /// Override the description model defined in .env
    #[arg(short, long)]
    model: Option<String>,

    /// Override the image model defined in .env
    #[arg(long)]
    image_model: Option<String>,

    /// Copy the final image to the clipboard
    #[arg(short, long, default_value_t = false)]
    copy: bool,
}

fn parse_rect(s: &str) -> std::result::Result<Rect, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| format!("expected x,y,w,h: {e}"))?;
    match parts.as_slice() {
        [x, y, w, h] => Ok(Rect::new(*x, *y, *w, *h)),
        _ => Err(format!("expected 4 comma-separated numbers, got {}", parts.len())),
    }
}

fn spinner(message: String) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("{spinner:.green} {msg}")?,
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

/// Replays `rect` as a drag on a canvas matching the image, so screen and image pixels coincide.
fn drag_select(editor: &mut Editor, rect: Rect) -> Option<Rect> {
    let (w, h) = {
        let img = editor.current_image()?;
        (img.width() as f64, img.height() as f64)
    };
    editor.resize_canvas(w, h);
    editor.pointer_down(Point::new(rect.x, rect.y));
    editor.pointer_move(Point::new(rect.right(), rect.bottom()));
    match editor.pointer_up() {
        SelectionEvent::Completed(selected) => Some(selected),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    // Load config and override models if specified via CLI
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(m) = args.model {
        config.model_name = m;
    }
    if let Some(m) = args.image_model {
        config.image_model_name = m;
    }
    let client = GeminiClient::new(&config).context("Failed to initialize Gemini client")?;

    let mut editor = Editor::new(config.editor.clone());
    editor.set_dials(Dials::new(args.sharpness, args.denoise, args.imagination));
    editor.set_seek_easter_egg(args.easter_egg);

    let bytes = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let declared = args.input.to_string_lossy().to_string();
    editor
        .load_image(bytes, &declared, &MagickConverter::new())
        .await
        .context("Failed to load image")?;

    if args.auto {
        let progress = spinner(format!("Auto-enhancing with {}...", config.image_model_name))?;
        let result = editor.auto_enhance(&client).await;
        progress.finish_and_clear();
        result.context("Auto-enhance failed")?;
        editor.complete_reveal();
        info!(dials = ?editor.dials(), "auto-enhance done");
    }

    for (i, rect) in args.select.iter().enumerate() {
        let Some(selected) = drag_select(&mut editor, *rect) else {
            warn!(?rect, "selection is too small or outside the image, skipped");
            continue;
        };

        let progress = spinner(format!(
            "Enhancing selection {} of {}...",
            i + 1,
            args.select.len()
        ))?;
        let result = editor.enhance_selection(selected, &client).await;
        progress.finish_and_clear();
        result.with_context(|| format!("Enhancement {} failed", i + 1))?;
        editor.complete_reveal();
    }

    if let Some(prompt) = &args.regenerate {
        let progress = spinner("Regenerating last step...".to_string())?;
        let result = editor.regenerate(prompt, &client).await;
        progress.finish_and_clear();
        if !result.context("Regeneration failed")? {
            bail!("Nothing to regenerate: the history has no enhanced step yet");
        }
        editor.complete_reveal();
    }

    if editor.easter_egg_found() {
        println!("The model says it hid an easter egg somewhere. Happy hunting!");
    }

    if let Some(path) = &args.output {
        let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
        let bytes = editor
            .export_still(format)?
            .context("Nothing to export")?;
        tokio::fs::write(path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Saved {}", path.display());
    }

    if let Some(path) = &args.gif {
        let progress = spinner("Rendering zoom animation...".to_string())?;
        let bytes = editor.export_gif(GifOptions::default()).await;
        progress.finish_and_clear();
        let bytes = bytes?.context("Nothing to export")?;
        tokio::fs::write(path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Saved {}", path.display());
    }

    if args.copy {
        if let Some(current) = editor.current_image() {
            let rgba = current.image().to_rgba8();
            let data = ImageData {
                width: rgba.width() as usize,
                height: rgba.height() as usize,
                bytes: Cow::Owned(rgba.into_raw()),
            };
            match Clipboard::new() {
                Ok(mut clipboard) => {
                    if let Err(e) = clipboard.set_image(data) {
                        eprintln!("Warning: Failed to copy to clipboard: {}", e);
                    } else {
                        println!("(Copied to clipboard)");
                    }
                }
                Err(e) => eprintln!("Warning: Could not access clipboard: {}", e),
            }
        }
    }

    println!(
        "History: {} step(s), showing step {}",
        editor.history().len(),
        editor.history().current_index().unwrap_or(0)
    );
    Ok(())
}
