//! Auth command handlers: sign in/up, password change, session file.

use std::io::IsTerminal;

use dialoguer::Input;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use stationflow_core::User;

use crate::cli::{AuthArgs, AuthCommand, GlobalOpts};
use crate::config::{self, Profile};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

fn prompt_secret(label: &str) -> Result<SecretString, CliError> {
    let secret = rpassword::prompt_password(label).map_err(util::prompt_err)?;
    if secret.is_empty() {
        return Err(CliError::validation("password", "cannot be empty"));
    }
    Ok(SecretString::from(secret))
}

/// Profile settings for the active profile, or empty ones when the
/// backend came from `--api-url` alone.
fn active_profile(ctx: &Context) -> Profile {
    config::load_config_or_default()
        .profiles
        .get(&ctx.profile)
        .cloned()
        .unwrap_or_default()
}

fn resolve_login(ctx: &Context, username: Option<String>) -> Result<(String, SecretString), CliError> {
    let profile = active_profile(ctx);
    let interactive = std::io::stdin().is_terminal();

    let username = match username {
        Some(u) => u,
        None => match stationflow_config::resolve_username(&profile, &ctx.profile) {
            Ok(u) => u,
            Err(_) if interactive => Input::new()
                .with_prompt("Username")
                .interact_text()
                .map_err(util::prompt_err)?,
            Err(e) => return Err(e.into()),
        },
    };

    let password = match stationflow_config::resolve_password(&profile, &ctx.profile) {
        Ok(pw) => pw,
        Err(_) if interactive => prompt_secret("Password: ")?,
        Err(e) => return Err(e.into()),
    };
    Ok((username, password))
}

fn user_detail(user: &User) -> String {
    format!(
        "User:   {}\nEmail:  {}\nRole:   {}\nID:     {}",
        user.username, user.email, user.role, user.id
    )
}

pub async fn handle(ctx: &Context, args: AuthArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let client = &ctx.client;

    match args.command {
        AuthCommand::Login { username } => {
            let (username, password) = resolve_login(ctx, username)?;
            let session = client.sign_in(&username, &password).await?;
            ctx.sessions.save(&session)?;
            debug!(path = %ctx.sessions.path().display(), "session stored");
            let role = if session.is_admin() { " (admin)" } else { "" };
            output::success(
                global,
                &format!("Signed in as {}{role} on profile '{}'", session.user.username, ctx.profile),
            );
            Ok(())
        }

        AuthCommand::Signup {
            username,
            email,
            captcha_token,
        } => {
            let password = prompt_secret("Password: ")?;
            let again = prompt_secret("Repeat password: ")?;
            if password.expose_secret() != again.expose_secret() {
                return Err(CliError::validation("password", "the passwords do not match"));
            }
            let message = client.sign_up(&username, &email, &password, &captcha_token).await?;
            output::success(
                global,
                if message.is_empty() {
                    "Account created; sign in with: stationflow auth login"
                } else {
                    &message
                },
            );
            Ok(())
        }

        AuthCommand::Passwd => {
            let current = prompt_secret("Current password: ")?;
            let new = prompt_secret("New password: ")?;
            let message = client.change_password(&current, &new).await?;
            output::success(global, if message.is_empty() { "Password changed" } else { &message });
            Ok(())
        }

        AuthCommand::Logout => {
            client.sign_out();
            ctx.sessions.clear()?;
            output::success(global, &format!("Signed out of profile '{}'", ctx.profile));
            Ok(())
        }

        AuthCommand::Whoami => {
            let session = client.session().ok_or_else(|| CliError::NotSignedIn {
                action: "show the current user".into(),
            })?;
            let out = output::render_single(global.output, &session.user, user_detail, |u| {
                u.username.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
