//! Command handlers grouped by page.

pub(crate) mod auth;
pub(crate) mod editor;
pub(crate) mod images;
pub(crate) mod slideshow;
pub(crate) mod upload;

#[cfg(test)]
pub(crate) fn test_context(
    server: &httpmock::MockServer,
    dir: &std::path::Path,
) -> anyhow::Result<crate::client::AppContext> {
    let config = cloudgallery_test_support::fixtures::config_for(
        &server.base_url(),
        &dir.join("session.json"),
    )?;
    crate::client::AppContext::from_config(config, "test-trace")
        .map_err(|err| anyhow::anyhow!(err.display_message()))
}
