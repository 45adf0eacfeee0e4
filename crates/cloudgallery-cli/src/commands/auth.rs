use anyhow::anyhow;
use cloudgallery_client::auth::{self, LoginForm, RegisterForm};

use crate::cli::{LoginArgs, OutputFormat, RegisterArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::render_profile;

pub(crate) async fn handle_login(ctx: &AppContext, args: LoginArgs) -> CliResult<()> {
    let password = resolve_password(args.password)?;
    let mut form = LoginForm::new(args.username, password);
    form.submit(&ctx.api).await?;
    println!("Logged in as {}", form.username.trim());
    Ok(())
}

pub(crate) async fn handle_register(
    ctx: &AppContext,
    args: RegisterArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let password = resolve_password(args.password)?;
    let mut form = RegisterForm::new(args.username, args.email, password);
    let profile = form.submit(&ctx.api).await?;
    render_profile(&profile, output)?;
    if matches!(output, OutputFormat::Table) {
        println!("Run `cloudgallery login {}` to sign in.", profile.username);
    }
    Ok(())
}

pub(crate) fn handle_logout(ctx: &AppContext) -> CliResult<()> {
    let was_authenticated = ctx.api.session().is_authenticated();
    auth::logout(ctx.api.session(), ctx.api.navigator())?;
    if was_authenticated {
        println!("Logged out");
    } else {
        println!("No session was stored");
    }
    Ok(())
}

pub(crate) fn handle_whoami(ctx: &AppContext) -> CliResult<()> {
    if ctx.api.session().is_authenticated() {
        println!(
            "Session stored in {} for {}",
            ctx.config.session_file.display(),
            ctx.api.endpoint().http_base()
        );
        Ok(())
    } else {
        Err(CliError::validation(
            "not logged in; run `cloudgallery login` first",
        ))
    }
}

fn resolve_password(provided: Option<String>) -> CliResult<String> {
    if let Some(password) = provided {
        return Ok(password);
    }
    rpassword::prompt_password("Password: ")
        .map_err(|err| CliError::failure(anyhow!("failed to read password: {err}")))
}
