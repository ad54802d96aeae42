//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use crate::rate_limit::RateLimitConfig;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "Quillpost", about = "Blog API with JWT access/refresh authentication")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "quillpost.db")]
    pub database: String,

    /// Path to file containing the access token secret. Prefer the JWT_SECRET env var
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Path to file containing the refresh token secret. Prefer the JWT_REFRESH_SECRET env var
    #[arg(long)]
    pub jwt_refresh_secret_file: Option<String>,

    /// Disable new user signups
    #[arg(long)]
    pub no_signup: bool,

    /// Login attempts allowed per minute per IP (0 disables the limit)
    #[arg(long, default_value = "10")]
    pub login_rate_limit: u32,

    /// Signups allowed per minute per IP (0 disables the limit)
    #[arg(long, default_value = "3")]
    pub signup_rate_limit: u32,

    /// Allowed CORS origin (repeatable). Any origin is allowed when omitted
    #[arg(long = "cors-origin")]
    pub cors_origins: Vec<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
/// The filter comes from `RUST_LOG`, defaulting to `info`.
pub fn init_logging(format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

/// Load a JWT secret from an environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_secret(env_var: &str, secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var(env_var) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_var) };
        secret
    } else if let Some(path) = secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            env = %env_var,
            "JWT secret is required. Set the environment variable (recommended) or pass a secret file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            env = %env_var,
            "JWT secret is shorter than {} characters. Use a longer secret", MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Load both secrets and make sure they differ.
pub fn load_jwt_secrets(args: &Args) -> Option<(String, String)> {
    let access = load_secret("JWT_SECRET", args.jwt_secret_file.as_deref())?;
    let refresh = load_secret("JWT_REFRESH_SECRET", args.jwt_refresh_secret_file.as_deref())?;

    if access == refresh {
        error!("JWT_SECRET and JWT_REFRESH_SECRET must be different");
        return None;
    }

    Some((access, refresh))
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, secrets: (String, String)) -> ServerConfig {
    let (access, refresh) = secrets;
    ServerConfig {
        db,
        jwt_secret: access.into_bytes(),
        jwt_refresh_secret: refresh.into_bytes(),
        no_signup: args.no_signup,
        rate_limits: RateLimitConfig::per_minute(args.login_rate_limit, args.signup_rate_limit),
        cors_origins: args.cors_origins.clone(),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["quillpost"]);
        assert_eq!(args.port, 3000);
        assert_eq!(args.login_rate_limit, 10);
        assert_eq!(args.signup_rate_limit, 3);
        assert!(args.cors_origins.is_empty());
    }

    #[test]
    fn test_repeatable_cors_origin() {
        let args = Args::parse_from([
            "quillpost",
            "--cors-origin",
            "http://localhost:5173",
            "--cors-origin",
            "https://blog.example.com",
        ]);
        assert_eq!(args.cors_origins.len(), 2);
    }

    #[test]
    fn test_secret_from_file() {
        let path = std::env::temp_dir().join(format!("quillpost-secret-{}", std::process::id()));
        std::fs::write(&path, "  a-file-based-secret-that-is-long-enough  \n").unwrap();

        let secret = load_secret("QUILLPOST_TEST_UNSET_SECRET", path.to_str());
        std::fs::remove_file(&path).ok();

        assert_eq!(secret.as_deref(), Some("a-file-based-secret-that-is-long-enough"));
    }

    #[test]
    fn test_short_secret_rejected() {
        let path = std::env::temp_dir().join(format!("quillpost-short-{}", std::process::id()));
        std::fs::write(&path, "short").unwrap();

        let secret = load_secret("QUILLPOST_TEST_UNSET_SECRET_2", path.to_str());
        std::fs::remove_file(&path).ok();

        assert!(secret.is_none());
    }
}
