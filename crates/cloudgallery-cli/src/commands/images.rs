use cloudgallery_client::Route;
use cloudgallery_client::detail::DetailView;
use cloudgallery_client::gallery::GalleryView;

use crate::cli::{EditArgs, ImageArgs, OutputFormat, RemoveArgs, SearchArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_image_detail, render_image_list};

pub(crate) async fn handle_list(ctx: &AppContext, output: OutputFormat) -> CliResult<()> {
    ctx.enter(Route::Gallery)?;
    let mut gallery = GalleryView::new();
    gallery.refresh(&ctx.api).await?;
    render_image_list(gallery.images(), output)
}

pub(crate) async fn handle_search(
    ctx: &AppContext,
    args: SearchArgs,
    output: OutputFormat,
) -> CliResult<()> {
    ctx.enter(Route::Gallery)?;
    let mut gallery = GalleryView::new();
    gallery.search(&ctx.api, &args.query).await?;
    render_image_list(gallery.images(), output)
}

pub(crate) async fn handle_show(
    ctx: &AppContext,
    args: ImageArgs,
    output: OutputFormat,
) -> CliResult<()> {
    ctx.enter(Route::ImageDetail { id: args.id })?;
    let view = DetailView::load(&ctx.api, args.id).await?;
    let original = view.original_url(&ctx.api)?;
    render_image_detail(view.record(), &original, output)
}

pub(crate) async fn handle_edit(
    ctx: &AppContext,
    args: EditArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let unchanged = args.description.is_none()
        && args.location.is_none()
        && args.capture_date.is_none()
        && !args.clear_date;
    if unchanged {
        return Err(CliError::validation(
            "nothing to change; pass --description, --location, --capture-date, or --clear-date",
        ));
    }
    ctx.enter(Route::ImageDetail { id: args.id })?;
    let mut view = DetailView::load(&ctx.api, args.id).await?;
    view.begin_edit();
    let form = view.form_mut();
    if let Some(description) = args.description {
        form.description = description;
    }
    if let Some(location) = args.location {
        form.location = location;
    }
    if let Some(date) = args.capture_date {
        form.capture_date = date;
    } else if args.clear_date {
        form.capture_date.clear();
    }
    view.save(&ctx.api).await?;
    let original = view.original_url(&ctx.api)?;
    render_image_detail(view.record(), &original, output)
}

pub(crate) async fn handle_remove(ctx: &AppContext, args: RemoveArgs) -> CliResult<()> {
    ctx.enter(Route::ImageDetail { id: args.id })?;
    let view = DetailView::load(&ctx.api, args.id).await?;
    if !view.delete(&ctx.api, args.yes).await? {
        return Err(CliError::validation(format!(
            "refusing to delete image {} without --yes",
            args.id
        )));
    }
    println!("Deleted image {}", args.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_context;
    use anyhow::{Result, anyhow};
    use cloudgallery_test_support::fixtures::{described_record, record_json, records_json};
    use httpmock::prelude::*;

    fn authed(server: &MockServer, dir: &std::path::Path) -> Result<AppContext> {
        let ctx = test_context(server, dir)?;
        ctx.api.session().establish("tok")?;
        Ok(ctx)
    }

    #[tokio::test]
    async fn listing_requires_a_session() -> Result<()> {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir()?;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/my-images/");
            then.status(200).json_body(records_json(&[]));
        });
        let ctx = test_context(&server, dir.path())?;
        let err = handle_list(&ctx, OutputFormat::Table)
            .await
            .expect_err("guarded");
        assert_eq!(err.exit_code(), 2);
        mock.assert_hits(0);
        Ok(())
    }

    #[tokio::test]
    async fn search_sends_the_query() -> Result<()> {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir()?;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/search/")
                .query_param("q", "bridge")
                .header("authorization", "Bearer tok");
            then.status(200)
                .json_body(records_json(&[described_record(2, "Bridge")]));
        });
        let ctx = authed(&server, dir.path())?;
        handle_search(
            &ctx,
            SearchArgs {
                query: " bridge ".to_string(),
            },
            OutputFormat::Json,
        )
        .await
        .map_err(|err| anyhow!(err.display_message()))?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn edit_clears_the_date_and_keeps_other_fields() -> Result<()> {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir()?;
        let record = described_record(4, "Harbour");
        server.mock(|when, then| {
            when.method(GET).path("/images/4");
            then.status(200).json_body(record_json(&record));
        });
        let put = server.mock(|when, then| {
            when.method(PUT).path("/images/4").json_body(serde_json::json!({
                "description": "Harbour",
                "location": "Porto",
                "capture_date": null,
            }));
            then.status(200).json_body(record_json(&record));
        });
        let ctx = authed(&server, dir.path())?;
        handle_edit(
            &ctx,
            EditArgs {
                id: 4,
                description: None,
                location: Some("Porto".to_string()),
                capture_date: None,
                clear_date: true,
            },
            OutputFormat::Table,
        )
        .await
        .map_err(|err| anyhow!(err.display_message()))?;
        put.assert();
        Ok(())
    }

    #[tokio::test]
    async fn remove_without_yes_is_refused() -> Result<()> {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir()?;
        server.mock(|when, then| {
            when.method(GET).path("/images/8");
            then.status(200).json_body(record_json(&described_record(8, "x")));
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/images/8");
            then.status(200);
        });
        let ctx = authed(&server, dir.path())?;
        let err = handle_remove(&ctx, RemoveArgs { id: 8, yes: false })
            .await
            .expect_err("unconfirmed");
        assert_eq!(err.exit_code(), 2);
        delete.assert_hits(0);

        handle_remove(&ctx, RemoveArgs { id: 8, yes: true })
            .await
            .map_err(|err| anyhow!(err.display_message()))?;
        delete.assert();
        Ok(())
    }
}
