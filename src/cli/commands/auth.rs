use clap::{Arg, Command, builder::ValueParser};
use std::time::Duration;

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_JWT_EXPIRES: &str = "jwt-expires";
pub const ARG_REFRESH_SECRET: &str = "refresh-secret";
pub const ARG_REFRESH_TOKEN_EXPIRES: &str = "refresh-token-expires";
pub const ARG_DEPLOYMENT_MODE: &str = "deployment-mode";
pub const ARG_CLIENT_URL_LOCAL: &str = "client-url-local";
pub const ARG_CLIENT_URL_PROD: &str = "client-url-prod";
pub const ARG_IDENTITY_BRIDGE_URL: &str = "identity-bridge-url";

/// Parse `90`, `90s`, `15m`, `1h` or `14d` into a non-zero duration.
///
/// # Errors
/// Returns a message when the number or unit is invalid, or the value is zero.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (digits, unit) = input.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration: {input}"))?;
    let multiplier = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return Err(format!("invalid duration unit in {input}, use s, m, h or d")),
    };

    let seconds = value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("duration too large: {input}"))?;
    if seconds == 0 {
        return Err("duration must be greater than zero".to_string());
    }
    Ok(Duration::from_secs(seconds))
}

#[must_use]
pub fn validator_duration() -> ValueParser {
    ValueParser::from(parse_duration)
}

pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    with_frontend_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Secret used to sign access tokens")
                .env("PASSAGE_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_JWT_EXPIRES)
                .long(ARG_JWT_EXPIRES)
                .help("Access token lifetime, e.g. 3600, 90m, 1h")
                .env("PASSAGE_JWT_EXPIRES")
                .default_value("1h")
                .value_parser(validator_duration()),
        )
        .arg(
            Arg::new(ARG_REFRESH_SECRET)
                .long(ARG_REFRESH_SECRET)
                .help("Secret used to sign refresh tokens; must differ from --jwt-secret")
                .env("PASSAGE_REFRESH_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_EXPIRES)
                .long(ARG_REFRESH_TOKEN_EXPIRES)
                .help("Refresh token and cookie lifetime, e.g. 14d")
                .env("PASSAGE_REFRESH_TOKEN_EXPIRES")
                .default_value("14d")
                .value_parser(validator_duration()),
        )
}

fn with_frontend_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DEPLOYMENT_MODE)
                .long(ARG_DEPLOYMENT_MODE)
                .help("Deployment mode: development or production")
                .long_help(
                    "Deployment mode. Production marks the refresh cookie Secure and binds it to --client-url-prod; development uses --client-url-local.",
                )
                .env("PASSAGE_DEPLOYMENT_MODE")
                .default_value("production"),
        )
        .arg(
            Arg::new(ARG_CLIENT_URL_LOCAL)
                .long(ARG_CLIENT_URL_LOCAL)
                .help("Frontend URL used in development mode")
                .env("PASSAGE_CLIENT_URL_LOCAL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new(ARG_CLIENT_URL_PROD)
                .long(ARG_CLIENT_URL_PROD)
                .help("Frontend URL used in production mode")
                .env("PASSAGE_CLIENT_URL_PROD"),
        )
        .arg(
            Arg::new(ARG_IDENTITY_BRIDGE_URL)
                .long(ARG_IDENTITY_BRIDGE_URL)
                .help("Identity bridge base URL for third-party provider callbacks")
                .env("PASSAGE_IDENTITY_BRIDGE_URL"),
        )
}
