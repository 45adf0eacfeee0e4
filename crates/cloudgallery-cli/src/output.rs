//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use cloudgallery_api_models::{ImageRecord, UserProfile};
use cloudgallery_client::slideshow::Caption;
use serde::Serialize;
use url::Url;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

const TITLE_WIDTH: usize = 40;

pub(crate) fn render_image_list(images: &[ImageRecord], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&images)?,
        OutputFormat::Table => {
            println!("{:>6} {:<16} {:<20} TITLE", "ID", "CAPTURED", "LOCATION");
            for image in images {
                println!("{}", image_row(image));
            }
            if images.is_empty() {
                println!("no images");
            }
        }
    }
    Ok(())
}

pub(crate) fn render_image_detail(
    image: &ImageRecord,
    original: &Url,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(image)?,
        OutputFormat::Table => {
            println!("id: {}", image.id);
            println!("title: {}", image.display_title());
            println!("file: {}", image.filename);
            println!("original: {original}");
            if let Some(date) = image.capture_date {
                println!("captured: {}", date.format("%Y-%m-%d %H:%M"));
            }
            if let Some(location) = image
                .location
                .as_deref()
                .filter(|_| image.has_known_location())
            {
                println!("location: {location}");
            }
            if let Some(resolution) = &image.resolution {
                println!("resolution: {resolution}");
            }
            let tags = image.tags();
            if !tags.is_empty() {
                println!("tags: {}", tags.join(", "));
            }
        }
    }
    Ok(())
}

pub(crate) fn render_profile(profile: &UserProfile, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(profile)?,
        OutputFormat::Table => {
            println!("Registered {} <{}> (id {})", profile.username, profile.email, profile.id);
        }
    }
    Ok(())
}

#[must_use]
pub(crate) fn format_caption(caption: &Caption) -> String {
    format!("[{}] {} ({})", caption.counter, caption.title, caption.date)
}

#[must_use]
pub(crate) fn image_row(image: &ImageRecord) -> String {
    let captured = image
        .capture_date
        .map_or_else(|| "-".to_string(), |date| date.format("%Y-%m-%d %H:%M").to_string());
    let location = if image.has_known_location() {
        image.location.as_deref().unwrap_or("-")
    } else {
        "-"
    };
    format!(
        "{:>6} {:<16} {:<20} {}",
        image.id,
        captured,
        truncate(location, 20),
        truncate(image.display_title(), TITLE_WIDTH)
    )
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let kept: String = value.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}
