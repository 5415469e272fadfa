/// Default timeout for the outbound spreadsheet webhook.
const DEFAULT_SHEETS_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Spreadsheet web-app URL. `None` disables lead forwarding.
    pub sheets_web_app_url: Option<String>,
    /// Shared key sent with every forwarded row.
    pub sheets_secret_key: String,
    pub sheets_timeout_secs: u64,
    /// Bearer token accepted as the admin principal. `None` locks the admin routes.
    pub admin_api_token: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .or_else(|_| std::env::var("DB_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DATABASE_URL or DB_URL environment variable required")
                })
                .and_then(|url| validate_database_url(&url).map(|_| url))?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            sheets_web_app_url: optional_var("GOOGLE_SHEETS_WEB_APP_URL")
                .map(|url| validate_sheets_url(&url).map(|_| url))
                .transpose()?,
            sheets_secret_key: optional_var("GOOGLE_SHEETS_SECRET_KEY").unwrap_or_default(),
            sheets_timeout_secs: optional_var("SHEETS_TIMEOUT_SECS")
                .map(|raw| {
                    raw.parse::<u64>().map_err(|_| {
                        anyhow::anyhow!("SHEETS_TIMEOUT_SECS must be a whole number of seconds")
                    })
                })
                .transpose()?
                .unwrap_or(DEFAULT_SHEETS_TIMEOUT_SECS),
            admin_api_token: optional_var("ADMIN_API_TOKEN"),
        };

        // Log successful configuration load (without sensitive values)
        tracing::debug!("Database URL: {}...", url_prefix(&config.database_url));
        if config.sheets_web_app_url.is_some() {
            tracing::info!("Lead sheet forwarding enabled");
        } else {
            tracing::info!("Lead sheet forwarding disabled (no web app URL)");
        }
        if config.admin_api_token.is_none() {
            tracing::warn!("ADMIN_API_TOKEN not set - admin lead routes will reject every request");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

/// Reads an environment variable, treating blank values as absent.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// First 20 characters, enough to tell which database is in use.
fn url_prefix(url: &str) -> String {
    url.chars().take(20).collect()
}

fn validate_database_url(url: &str) -> anyhow::Result<()> {
    if url.trim().is_empty() {
        anyhow::bail!("DATABASE_URL cannot be empty");
    }
    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
    }
    Ok(())
}

fn validate_sheets_url(raw: &str) -> anyhow::Result<()> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| anyhow::anyhow!("GOOGLE_SHEETS_WEB_APP_URL is not a valid URL: {}", e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("GOOGLE_SHEETS_WEB_APP_URL must start with http:// or https://");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_url_requires_postgres_scheme() {
        assert!(validate_database_url("postgres://localhost/leads").is_ok());
        assert!(validate_database_url("postgresql://localhost/leads").is_ok());
        assert!(validate_database_url("mysql://localhost/leads").is_err());
        assert!(validate_database_url("  ").is_err());
    }

    #[test]
    fn url_prefix_respects_char_boundaries() {
        assert_eq!(url_prefix("postgres://üüüüüüüüüü@db"), "postgres://üüüüüüüüü");
        assert_eq!(url_prefix("postgres://a"), "postgres://a");
    }

    #[test]
    fn sheets_url_must_be_http() {
        assert!(validate_sheets_url("https://script.google.com/macros/s/abc/exec").is_ok());
        assert!(validate_sheets_url("ftp://example.com/sheet").is_err());
        assert!(validate_sheets_url("not a url").is_err());
    }
}
