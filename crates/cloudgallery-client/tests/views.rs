use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use cloudgallery_client::detail::DetailView;
use cloudgallery_client::editor::{AspectRatio, EditorSession};
use cloudgallery_client::gallery::GalleryView;
use cloudgallery_client::progress::ProgressChannel;
use cloudgallery_client::upload::{
    LINE_CHANNEL_UNAVAILABLE, LINE_OPENING_CHANNEL, LINE_PREPARING_REQUEST, UploadSession,
};
use cloudgallery_client::{ApiClient, ClientError, Navigator, Route, SessionContext};
use cloudgallery_config::ClientConfig;
use cloudgallery_test_support::fixtures::{
    config_for, described_record, image_record, png_bytes, record_json, records_json, write_png,
};
use cloudgallery_test_support::progress::ProgressServer;
use httpmock::prelude::*;
use url::Url;

fn authed_client(server: &MockServer) -> Result<(ApiClient, ClientConfig)> {
    let config = config_for(&server.base_url(), &PathBuf::from("/tmp/unused-session.json"))?;
    let session = SessionContext::in_memory();
    session.establish("tok")?;
    let navigator = Navigator::new(session.clone(), Route::Gallery);
    Ok((ApiClient::new(&config, session, navigator)?, config))
}

#[tokio::test]
async fn gallery_refresh_prunes_selection_and_plays_selected() -> Result<()> {
    let server = MockServer::start_async().await;
    let (api, _) = authed_client(&server)?;
    let mut first = server.mock(|when, then| {
        when.method(GET).path("/my-images/");
        then.status(200)
            .json_body(records_json(&[image_record(1), image_record(2), image_record(3)]));
    });

    let mut view = GalleryView::new();
    view.refresh(&api).await?;
    view.toggle_select_mode();
    view.toggle_selection(3);
    view.toggle_selection(1);
    first.assert();
    first.delete();

    server.mock(|when, then| {
        when.method(GET).path("/my-images/");
        then.status(200)
            .json_body(records_json(&[image_record(1), image_record(2)]));
    });
    view.refresh(&api).await?;
    assert_eq!(view.selected().iter().copied().collect::<Vec<_>>(), vec![1]);

    let show = view.open_slideshow().expect("slideshow");
    assert_eq!(show.images().len(), 1);
    assert_eq!(show.current().id, 1);
    Ok(())
}

#[tokio::test]
async fn detail_save_sends_null_date_and_replaces_record() -> Result<()> {
    let server = MockServer::start_async().await;
    let (api, _) = authed_client(&server)?;
    let record = described_record(7, "Bridge");
    server.mock(|when, then| {
        when.method(GET).path("/images/7");
        then.status(200).json_body(record_json(&record));
    });
    let mut updated = record.clone();
    updated.description = Some("Bridge at night".to_string());
    updated.capture_date = None;
    let put = server.mock(|when, then| {
        when.method(PUT)
            .path("/images/7")
            .header("authorization", "Bearer tok")
            .json_body(serde_json::json!({
                "description": "Bridge at night",
                "location": "Lisbon",
                "capture_date": null,
            }));
        then.status(200).json_body(record_json(&updated));
    });

    let mut view = DetailView::load(&api, 7).await?;
    assert_eq!(view.form().capture_date, "2024-03-09T14:05");
    view.begin_edit();
    view.form_mut().description = "Bridge at night".to_string();
    view.form_mut().capture_date = String::new();
    let saved = view.save(&api).await?;
    assert_eq!(saved.description.as_deref(), Some("Bridge at night"));
    assert!(!view.is_editing());
    put.assert();

    assert_eq!(view.open_editor(api.navigator()), Route::Editor { id: 7 });
    Ok(())
}

#[tokio::test]
async fn detail_delete_requires_confirmation_and_keeps_state_on_failure() -> Result<()> {
    let server = MockServer::start_async().await;
    let (api, _) = authed_client(&server)?;
    let view = DetailView::from_record(image_record(9), 1);

    let mut failing = server.mock(|when, then| {
        when.method(DELETE).path("/images/9");
        then.status(500);
    });
    assert!(!view.delete(&api, false).await?);
    failing.assert_hits(0);

    api.navigator().navigate(Route::ImageDetail { id: 9 });
    let err = view.delete(&api, true).await.expect_err("server error");
    assert!(matches!(err, ClientError::Api { .. }));
    assert_eq!(api.navigator().current(), Route::ImageDetail { id: 9 });
    failing.delete();

    let ok = server.mock(|when, then| {
        when.method(DELETE).path("/images/9");
        then.status(204);
    });
    assert!(view.delete(&api, true).await?);
    ok.assert();
    assert_eq!(api.navigator().current(), Route::Gallery);
    Ok(())
}

#[tokio::test]
async fn editor_saves_cropped_jpeg_and_opens_detail() -> Result<()> {
    let server = MockServer::start_async().await;
    let (api, _) = authed_client(&server)?;
    let record = image_record(11);
    server.mock(|when, then| {
        when.method(GET).path("/images/11");
        then.status(200).json_body(record_json(&record));
    });
    let original = png_bytes(200, 100)?;
    let fetch = server.mock(|when, then| {
        when.method(GET)
            .path(format!("/static/originals/{}", record.filename))
            .query_param_exists("t");
        then.status(200).header("content-type", "image/png").body(original.clone());
    });
    let replace = server.mock(|when, then| {
        when.method(PUT)
            .path("/images/11/content")
            .header_exists("content-type")
            .body_includes("image/jpeg");
        then.status(200).json_body(serde_json::json!({"status": "ok"}));
    });

    let mut session = EditorSession::open(&api, 11, Some((100.0, 50.0))).await?;
    fetch.assert();
    assert!(session.save(&api).await.expect_err("no crop").is_validation());
    replace.assert_hits(0);

    session.set_aspect(AspectRatio::Square);
    session.set_filter(120, 80)?;
    let rendered = session.render()?;
    assert_eq!(rendered.dimensions(), (90, 90));

    assert_eq!(session.save(&api).await?, Route::ImageDetail { id: 11 });
    replace.assert();
    Ok(())
}

#[tokio::test]
async fn empty_selection_is_rejected_before_any_request() -> Result<()> {
    let server = MockServer::start_async().await;
    let (api, config) = authed_client(&server)?;
    let upload = server.mock(|when, then| {
        when.any_request();
        then.status(500);
    });

    let mut session = UploadSession::new(&config);
    let err = session.submit(&api).await.expect_err("no file");
    assert!(err.is_validation());
    assert!(session.log().is_empty());
    assert!(!session.is_busy());

    let dir = tempfile::tempdir()?;
    let empty = dir.path().join("empty.png");
    std::fs::write(&empty, b"")?;
    session.select_file(&empty)?;
    assert!(session.submit(&api).await.expect_err("empty file").is_validation());

    upload.assert_hits(0);
    Ok(())
}

#[tokio::test]
async fn upload_streams_progress_lines_into_the_log() -> Result<()> {
    let server = MockServer::start_async().await;
    let (api, config) = authed_client(&server)?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("harbour.png");
    write_png(&path, 16, 16)?;

    let mut progress = ProgressServer::start(
        vec!["saved".to_string(), "tagging".to_string(), "done".to_string()],
        Duration::from_millis(20),
    )
    .await?;

    let mut session = UploadSession::with_client_id(&config, "1700000000123");
    let channel_url = Url::parse(&progress.url("/ws/1700000000123"))?;
    session.attach_channel(ProgressChannel::connect(&channel_url, Duration::from_secs(2)).await?);
    assert_eq!(progress.requested_path().await?, "/ws/1700000000123");

    let upload = server.mock(|when, then| {
        when.method(POST)
            .path("/upload/")
            .header("authorization", "Bearer tok")
            .body_includes("name=\"client_id\"")
            .body_includes("1700000000123")
            .body_includes("name=\"description\"")
            .body_includes("harbour at dawn")
            .body_includes("filename=\"harbour.png\"");
        then.status(200)
            .delay(Duration::from_millis(300))
            .json_body(record_json(&image_record(21)));
    });

    session.description = "harbour at dawn".to_string();
    session.select_file(&path)?;
    let mut echoed = Vec::new();
    let record = session
        .submit_with(&api, |line| echoed.push(line.to_string()))
        .await?;
    upload.assert();
    progress.finish().await?;

    assert_eq!(record.id, 21);
    let lines = session.log().to_vec();
    assert_eq!(
        lines,
        vec![LINE_OPENING_CHANNEL, LINE_PREPARING_REQUEST, "saved", "tagging", "done"]
    );
    assert_eq!(echoed, lines);
    assert!(!session.has_channel());
    assert_eq!(api.navigator().current(), Route::Gallery);
    Ok(())
}

#[tokio::test]
async fn upload_proceeds_when_progress_channel_is_unavailable() -> Result<()> {
    let server = MockServer::start_async().await;
    let (api, config) = authed_client(&server)?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("a.png");
    write_png(&path, 8, 8)?;

    let failing = server.mock(|when, then| {
        when.method(POST).path("/upload/");
        then.status(400)
            .json_body(serde_json::json!({"detail": "processing failed"}));
    });

    let mut session = UploadSession::with_client_id(&config, "42");
    session.select_file(&path)?;
    let err = session.submit(&api).await.expect_err("backend rejected");
    failing.assert();
    assert!(matches!(err, ClientError::Api { .. }));
    assert!(!session.is_busy());

    let lines = session.log().to_vec();
    assert_eq!(lines[0], LINE_OPENING_CHANNEL);
    assert_eq!(lines[1], LINE_PREPARING_REQUEST);
    assert_eq!(lines[2], LINE_CHANNEL_UNAVAILABLE);
    assert!(lines[3].contains("processing failed"));
    assert_eq!(api.navigator().current(), Route::Gallery);
    Ok(())
}
