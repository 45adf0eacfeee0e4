use anyhow::anyhow;
use cloudgallery_client::Route;
use cloudgallery_client::editor::{
    AspectRatio, CropRect, EditorSession, JPEG_QUALITY, encode_jpeg,
};

use crate::cli::CropArgs;
use crate::client::{AppContext, CliError, CliResult};

pub(crate) async fn handle_crop(ctx: &AppContext, args: CropArgs) -> CliResult<()> {
    let aspect = AspectRatio::parse(&args.aspect).ok_or_else(|| {
        CliError::validation(format!(
            "unknown aspect '{}'; use free, 1:1, 4:3, or 16:9",
            args.aspect
        ))
    })?;
    let explicit = match (args.x, args.y, args.width, args.height) {
        (Some(x), Some(y), Some(width), Some(height)) => Some(CropRect {
            x,
            y,
            width,
            height,
        }),
        (None, None, None, None) => None,
        _ => {
            return Err(CliError::validation(
                "--x, --y, --width, and --height must be given together",
            ));
        }
    };
    let displayed = match (args.display_width, args.display_height) {
        (Some(width), Some(height)) => Some((width, height)),
        (None, None) => None,
        _ => {
            return Err(CliError::validation(
                "--display-width and --display-height must be given together",
            ));
        }
    };
    if explicit.is_none() && aspect == AspectRatio::Free {
        return Err(CliError::validation(
            "pass a crop rectangle or choose a fixed --aspect",
        ));
    }

    ctx.enter(Route::Editor { id: args.id })?;
    let mut editor = EditorSession::open(&ctx.api, args.id, displayed).await?;
    editor.set_aspect(aspect);
    if let Some(crop) = explicit {
        editor.set_crop(crop);
        editor.commit_crop()?;
    }
    editor.set_filter(args.brightness, args.contrast)?;

    if let Some(out) = args.dry_run {
        let rendered = editor.render()?;
        let jpeg = encode_jpeg(&rendered, JPEG_QUALITY)?;
        tokio::fs::write(&out, jpeg).await.map_err(|err| {
            CliError::failure(anyhow!("failed to write '{}': {err}", out.display()))
        })?;
        println!(
            "Wrote {}x{} preview to {}",
            rendered.width(),
            rendered.height(),
            out.display()
        );
        return Ok(());
    }

    let route = editor.save(&ctx.api).await?;
    println!("Saved edited image {} (now at {route})", args.id);
    Ok(())
}
