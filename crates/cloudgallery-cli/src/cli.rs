//! Argument parsing, logging setup, and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use cloudgallery_config::{ClientConfig, ConfigOverrides};
use cloudgallery_telemetry::{
    LogFormat, LoggingConfig, command_span, init_logging, log_format_from_str,
};
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::client::{AppContext, CliResult};
use crate::commands::auth::{handle_login, handle_logout, handle_register, handle_whoami};
use crate::commands::editor::handle_crop;
use crate::commands::images::{handle_edit, handle_list, handle_remove, handle_search, handle_show};
use crate::commands::slideshow::handle_slideshow;
use crate::commands::upload::handle_upload;

/// Parses CLI arguments, executes the requested command, and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let command_name = command_label(&cli.command);
    let trace_id = Uuid::new_v4().to_string();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };
    let logging = LoggingConfig {
        level: &config.log_level,
        format: log_format_from_str(config.log_format.as_deref()).unwrap_or_else(LogFormat::infer),
        ..LoggingConfig::default()
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: logging disabled: {err}");
    }

    let span = command_span(command_name, &trace_id);
    let result = dispatch(cli, config, &trace_id).instrument(span).await;

    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

fn load_config(cli: &Cli) -> CliResult<ClientConfig> {
    let mut config = cloudgallery_config::load(cli.config.as_deref())?;
    config.apply_overrides(ConfigOverrides {
        app_origin: cli.origin.clone(),
        backend_port: cli.backend_port,
        session_file: cli.session_file.clone(),
        http_timeout_secs: cli.timeout,
    });
    config.validate()?;
    Ok(config)
}

async fn dispatch(cli: Cli, config: ClientConfig, trace_id: &str) -> CliResult<()> {
    let ctx = AppContext::from_config(config, trace_id)?;
    let output = cli.output;

    match cli.command {
        Command::Login(args) => handle_login(&ctx, args).await,
        Command::Register(args) => handle_register(&ctx, args, output).await,
        Command::Logout => handle_logout(&ctx),
        Command::Whoami => handle_whoami(&ctx),
        Command::Ls => handle_list(&ctx, output).await,
        Command::Search(args) => handle_search(&ctx, args, output).await,
        Command::Show(args) => handle_show(&ctx, args, output).await,
        Command::Edit(args) => handle_edit(&ctx, args, output).await,
        Command::Rm(args) => handle_remove(&ctx, args).await,
        Command::Upload(args) => handle_upload(&ctx, args).await,
        Command::Crop(args) => handle_crop(&ctx, args).await,
        Command::Slideshow(args) => handle_slideshow(&ctx, args).await,
    }
}

#[derive(Parser)]
#[command(name = "cloudgallery", about = "Terminal client for the CloudGallery photo service")]
pub(crate) struct Cli {
    #[arg(long, global = true, env = "CLOUDGALLERY_CONFIG", help = "Path to a TOML config file")]
    pub(crate) config: Option<PathBuf>,
    #[arg(long, global = true, value_parser = parse_url, help = "Origin the client is served from")]
    pub(crate) origin: Option<Url>,
    #[arg(long, global = true, help = "Backend port on the origin host")]
    pub(crate) backend_port: Option<u16>,
    #[arg(long, global = true, help = "Where the session token is persisted")]
    pub(crate) session_file: Option<PathBuf>,
    #[arg(long, global = true, help = "HTTP timeout in seconds")]
    pub(crate) timeout: Option<u64>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Exchange credentials for a session token.
    Login(LoginArgs),
    /// Create an account.
    Register(RegisterArgs),
    /// Forget the stored session token.
    Logout,
    /// Report whether a session is stored.
    Whoami,
    /// List your images.
    Ls,
    /// Search images by description, location, or tag.
    Search(SearchArgs),
    /// Show one image.
    Show(ImageArgs),
    /// Edit description, location, or capture date.
    Edit(EditArgs),
    /// Delete an image.
    Rm(RemoveArgs),
    /// Upload an image and stream processing progress.
    Upload(UploadArgs),
    /// Crop and adjust an image, replacing the stored original.
    Crop(CropArgs),
    /// Play images as a slideshow driven from stdin.
    Slideshow(SlideshowArgs),
}

#[derive(Args)]
pub(crate) struct LoginArgs {
    pub(crate) username: String,
    #[arg(long, env = "CLOUDGALLERY_PASSWORD", help = "Prompted for when omitted")]
    pub(crate) password: Option<String>,
}

#[derive(Args)]
pub(crate) struct RegisterArgs {
    pub(crate) username: String,
    pub(crate) email: String,
    #[arg(long, env = "CLOUDGALLERY_PASSWORD", help = "Prompted for when omitted")]
    pub(crate) password: Option<String>,
}

#[derive(Args)]
pub(crate) struct SearchArgs {
    #[arg(help = "Search terms; blank lists everything")]
    pub(crate) query: String,
}

#[derive(Args)]
pub(crate) struct ImageArgs {
    #[arg(help = "Image identifier")]
    pub(crate) id: i64,
}

#[derive(Args)]
pub(crate) struct EditArgs {
    #[arg(help = "Image identifier")]
    pub(crate) id: i64,
    #[arg(long)]
    pub(crate) description: Option<String>,
    #[arg(long)]
    pub(crate) location: Option<String>,
    #[arg(long, help = "Capture date as YYYY-MM-DDTHH:MM", conflicts_with = "clear_date")]
    pub(crate) capture_date: Option<String>,
    #[arg(long, help = "Remove the capture date")]
    pub(crate) clear_date: bool,
}

#[derive(Args)]
pub(crate) struct RemoveArgs {
    #[arg(help = "Image identifier")]
    pub(crate) id: i64,
    #[arg(long, help = "Confirm the deletion")]
    pub(crate) yes: bool,
}

#[derive(Args)]
pub(crate) struct UploadArgs {
    #[arg(help = "Image file to upload")]
    pub(crate) path: PathBuf,
    #[arg(long)]
    pub(crate) description: Option<String>,
}

#[derive(Args)]
pub(crate) struct CropArgs {
    #[arg(help = "Image identifier")]
    pub(crate) id: i64,
    #[arg(long, default_value = "free", help = "free, 1:1, 4:3, or 16:9")]
    pub(crate) aspect: String,
    #[arg(long, help = "Crop left edge in pixels")]
    pub(crate) x: Option<f64>,
    #[arg(long, help = "Crop top edge in pixels")]
    pub(crate) y: Option<f64>,
    #[arg(long, help = "Crop width in pixels")]
    pub(crate) width: Option<f64>,
    #[arg(long, help = "Crop height in pixels")]
    pub(crate) height: Option<f64>,
    #[arg(long, help = "Width the crop coordinates were measured against")]
    pub(crate) display_width: Option<f64>,
    #[arg(long, help = "Height the crop coordinates were measured against")]
    pub(crate) display_height: Option<f64>,
    #[arg(long, default_value_t = 100, help = "Brightness percent (50-150)")]
    pub(crate) brightness: u16,
    #[arg(long, default_value_t = 100, help = "Contrast percent (50-150)")]
    pub(crate) contrast: u16,
    #[arg(long, value_name = "OUT", help = "Write the JPEG locally instead of saving it")]
    pub(crate) dry_run: Option<PathBuf>,
}

#[derive(Args)]
pub(crate) struct SlideshowArgs {
    #[arg(help = "Images to play; all images when omitted")]
    pub(crate) ids: Vec<i64>,
    #[arg(long, help = "Play search results instead of the full gallery")]
    pub(crate) query: Option<String>,
    #[arg(long, help = "Autoplay interval in milliseconds")]
    pub(crate) interval_ms: Option<u64>,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Login(_) => "login",
        Command::Register(_) => "register",
        Command::Logout => "logout",
        Command::Whoami => "whoami",
        Command::Ls => "ls",
        Command::Search(_) => "search",
        Command::Show(_) => "show",
        Command::Edit(_) => "edit",
        Command::Rm(_) => "rm",
        Command::Upload(_) => "upload",
        Command::Crop(_) => "crop",
        Command::Slideshow(_) => "slideshow",
    }
}

fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommands() {
        let cli = Cli::try_parse_from([
            "cloudgallery",
            "ls",
            "--origin",
            "https://photos.example",
            "--backend-port",
            "9000",
            "--output",
            "json",
        ])
        .expect("parse");
        assert_eq!(cli.origin.as_ref().map(Url::as_str), Some("https://photos.example/"));
        assert_eq!(cli.backend_port, Some(9000));
        assert!(matches!(cli.output, OutputFormat::Json));
        assert_eq!(command_label(&cli.command), "ls");
    }

    #[test]
    fn crop_arguments_parse() {
        let cli = Cli::try_parse_from([
            "cloudgallery",
            "crop",
            "7",
            "--aspect",
            "16:9",
            "--brightness",
            "120",
            "--dry-run",
            "out.jpg",
        ])
        .expect("parse");
        let Command::Crop(args) = cli.command else {
            panic!("expected crop");
        };
        assert_eq!(args.id, 7);
        assert_eq!(args.aspect, "16:9");
        assert_eq!(args.brightness, 120);
        assert_eq!(args.contrast, 100);
        assert_eq!(args.dry_run, Some(PathBuf::from("out.jpg")));
    }

    #[test]
    fn edit_rejects_date_with_clear_date() {
        let parsed = Cli::try_parse_from([
            "cloudgallery",
            "edit",
            "3",
            "--capture-date",
            "2024-01-01T10:00",
            "--clear-date",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn bad_origin_is_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["cloudgallery", "ls", "--origin", "not a url"]).is_err());
    }
}
