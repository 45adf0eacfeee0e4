use cloudgallery_client::Route;
use cloudgallery_client::upload::UploadSession;

use crate::cli::UploadArgs;
use crate::client::{AppContext, CliResult};

pub(crate) async fn handle_upload(ctx: &AppContext, args: UploadArgs) -> CliResult<()> {
    ctx.enter(Route::Upload)?;
    let mut session = UploadSession::new(&ctx.config);
    session.select_file(&args.path)?;
    if let Some(description) = args.description {
        session.description = description;
    }

    let record = session
        .submit_with(&ctx.api, |line| println!("{line}"))
        .await?;
    println!("Uploaded {} as image {}", record.filename, record.id);
    Ok(())
}
