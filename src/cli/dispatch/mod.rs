use crate::{
    auth::DeploymentMode,
    cli::{
        actions::{Action, server::Args},
        commands::{ARG_DSN, ARG_PORT, auth},
    },
};
use anyhow::{Context, Result, anyhow};
use secrecy::SecretString;
use std::time::Duration;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(1337);
    let dsn = matches.get_one::<String>(ARG_DSN).cloned();

    let jwt_secret = matches
        .get_one::<String>(auth::ARG_JWT_SECRET)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --jwt-secret")?;
    let refresh_secret = matches
        .get_one::<String>(auth::ARG_REFRESH_SECRET)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --refresh-secret")?;

    let jwt_expires = matches
        .get_one::<Duration>(auth::ARG_JWT_EXPIRES)
        .copied()
        .context("missing required argument: --jwt-expires")?;
    let refresh_token_expires = matches
        .get_one::<Duration>(auth::ARG_REFRESH_TOKEN_EXPIRES)
        .copied()
        .context("missing required argument: --refresh-token-expires")?;

    let deployment_mode = matches
        .get_one::<String>(auth::ARG_DEPLOYMENT_MODE)
        .map_or(Ok(DeploymentMode::default()), |mode| {
            mode.parse::<DeploymentMode>()
        })
        .map_err(|err| anyhow!(err))?;

    let client_url_local = matches
        .get_one::<String>(auth::ARG_CLIENT_URL_LOCAL)
        .cloned()
        .context("missing required argument: --client-url-local")?;
    let client_url_prod = matches.get_one::<String>(auth::ARG_CLIENT_URL_PROD).cloned();
    if deployment_mode == DeploymentMode::Production && client_url_prod.is_none() {
        return Err(anyhow!("missing required argument: --client-url-prod"));
    }

    let identity_bridge_url = matches
        .get_one::<String>(auth::ARG_IDENTITY_BRIDGE_URL)
        .cloned();

    Ok(Action::Server(Args {
        port,
        dsn,
        jwt_secret,
        refresh_secret,
        jwt_expires,
        refresh_token_expires,
        deployment_mode,
        client_url_local,
        client_url_prod,
        identity_bridge_url,
    }))
}
