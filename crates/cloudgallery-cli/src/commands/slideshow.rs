use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::anyhow;
use cloudgallery_client::Route;
use cloudgallery_client::gallery::GalleryView;
use cloudgallery_client::slideshow::{Slideshow, SlideshowCommand, SlideshowPlayer};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::cli::SlideshowArgs;
use crate::client::{AppContext, CliError, CliResult};
use crate::output::format_caption;

const KEY_HELP: &str = "keys: n next, p previous, enter or space pause/resume, q quit";

pub(crate) async fn handle_slideshow(ctx: &AppContext, args: SlideshowArgs) -> CliResult<()> {
    ctx.enter(Route::Gallery)?;
    let mut gallery = GalleryView::new();
    match args.query.as_deref() {
        Some(query) => gallery.search(&ctx.api, query).await?,
        None => gallery.refresh(&ctx.api).await?,
    }

    let wanted: BTreeSet<i64> = args.ids.iter().copied().collect();
    if !wanted.is_empty() {
        gallery.toggle_select_mode();
        for id in wanted {
            if !gallery.toggle_selection(id) {
                return Err(CliError::validation(format!(
                    "image {id} is not in the gallery"
                )));
            }
        }
    }

    let show = gallery
        .open_slideshow()
        .ok_or_else(|| CliError::validation("no images to show"))?;
    let interval = args
        .interval_ms
        .map_or_else(|| ctx.config.slideshow_interval(), Duration::from_millis);
    println!("{}: {KEY_HELP}", gallery.play_label());

    let input = BufReader::new(tokio::io::stdin()).lines();
    play(show, interval, input, |line| println!("{line}")).await
}

/// Drive a slideshow from line-oriented input until `q` or end of input.
async fn play<R, F>(
    show: Slideshow,
    interval: Duration,
    mut input: Lines<R>,
    mut emit: F,
) -> CliResult<()>
where
    R: AsyncBufRead + Unpin,
    F: FnMut(&str),
{
    let player = SlideshowPlayer::start(show, interval);
    let mut state = player.subscribe();
    let first = state.borrow_and_update().clone();
    emit(&status_line(&first));

    let mut input_open = true;
    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let show = state.borrow_and_update().clone();
                if show.is_closed() {
                    break;
                }
                emit(&status_line(&show));
            }
            line = input.next_line(), if input_open => {
                let command = match line {
                    Ok(Some(raw)) => match command_for(&raw) {
                        Some(command) => command,
                        None => {
                            emit(KEY_HELP);
                            continue;
                        }
                    },
                    Ok(None) => {
                        input_open = false;
                        SlideshowCommand::Close
                    }
                    Err(err) => {
                        return Err(CliError::failure(anyhow!("failed to read input: {err}")));
                    }
                };
                if player.send(command).await.is_err() {
                    break;
                }
            }
        }
    }
    player.close();
    Ok(())
}

fn command_for(raw: &str) -> Option<SlideshowCommand> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "n" | "next" => Some(SlideshowCommand::Next),
        "p" | "prev" => Some(SlideshowCommand::Prev),
        "" | "space" => Some(SlideshowCommand::Toggle),
        "q" | "quit" => Some(SlideshowCommand::Close),
        _ => SlideshowCommand::from_key(raw),
    }
}

fn status_line(show: &Slideshow) -> String {
    let caption = format_caption(&show.caption());
    if show.is_playing() {
        caption
    } else {
        format!("{caption} [paused]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudgallery_test_support::fixtures::{described_record, image_record};

    fn show() -> Slideshow {
        Slideshow::new(
            vec![described_record(1, "One"), image_record(2), image_record(3)],
            0,
        )
        .expect("non-empty")
    }

    #[test]
    fn typed_keys_map_to_commands() {
        assert_eq!(command_for("n"), Some(SlideshowCommand::Next));
        assert_eq!(command_for(" P "), Some(SlideshowCommand::Prev));
        assert_eq!(command_for(""), Some(SlideshowCommand::Toggle));
        assert_eq!(command_for("q"), Some(SlideshowCommand::Close));
        assert_eq!(command_for("ArrowRight"), Some(SlideshowCommand::Next));
        assert_eq!(command_for("Escape"), Some(SlideshowCommand::Close));
        assert_eq!(command_for("x"), None);
    }

    #[tokio::test]
    async fn quit_ends_the_session_after_the_first_caption() {
        let input = BufReader::new(&b"q\n"[..]).lines();
        let mut lines = Vec::new();
        tokio::time::timeout(
            Duration::from_secs(5),
            play(show(), Duration::from_secs(60), input, |line| {
                lines.push(line.to_string());
            }),
        )
        .await
        .expect("slideshow finished")
        .map_err(|err| err.display_message())
        .expect("played");
        assert_eq!(lines.first().map(String::as_str), Some("[1 / 3] One (2024-03-09)"));
    }

    #[tokio::test]
    async fn end_of_input_closes_the_slideshow() {
        let input = BufReader::new(&b"n\nwhat\n"[..]).lines();
        let mut lines = Vec::new();
        tokio::time::timeout(
            Duration::from_secs(5),
            play(show(), Duration::from_secs(60), input, |line| {
                lines.push(line.to_string());
            }),
        )
        .await
        .expect("slideshow finished")
        .map_err(|err| err.display_message())
        .expect("played");
        assert!(lines.iter().any(|line| line == KEY_HELP));
    }
}
