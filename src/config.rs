use std::env;

/// Deployment environment. Production hides transport error details from clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// Ordering between answering the client and completing the send.
///
/// `Synchronous` reports the real delivery outcome to the caller.
/// `FireAndForget` acknowledges receipt first; delivery failures only reach the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPolicy {
    Synchronous,
    FireAndForget,
}

impl DispatchPolicy {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sync" | "synchronous" => Ok(DispatchPolicy::Synchronous),
            "background" | "fire-and-forget" | "async" => Ok(DispatchPolicy::FireAndForget),
            other => Err(ConfigError::InvalidDispatchPolicy(other.to_string())),
        }
    }
}

/// Which mail transport to build at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    Smtp {
        host: String,
        port: u16,
        username: String,
        password: String,
    },
    Resend {
        api_key: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub environment: Environment,
    pub dispatch_policy: DispatchPolicy,
    pub transport: TransportConfig,
    pub mail_from: String,
    pub mail_receiver: String,
    pub subject_prefix: String,
    pub json_logs: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let transport = match env::var("MAIL_TRANSPORT")
            .unwrap_or_else(|_| "smtp".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "smtp" => TransportConfig::Smtp {
                host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
                port: env::var("SMTP_PORT")
                    .unwrap_or_else(|_| "587".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidSmtpPort)?,
                username: required("EMAIL_USER")?,
                password: required("EMAIL_PASS")?,
            },
            "resend" => TransportConfig::Resend {
                api_key: required("RESEND_API_KEY")?,
            },
            other => return Err(ConfigError::UnknownTransport(other.to_string())),
        };

        let mail_from = match env::var("MAIL_FROM").ok().filter(|v| !v.trim().is_empty()) {
            Some(from) => from,
            None => match &transport {
                TransportConfig::Smtp { username, .. } => username.clone(),
                TransportConfig::Resend { .. } => return Err(ConfigError::Missing("MAIL_FROM")),
            },
        };

        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            environment: Environment::parse(
                &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            ),
            dispatch_policy: DispatchPolicy::parse(
                &env::var("DISPATCH_POLICY").unwrap_or_else(|_| "sync".to_string()),
            )?,
            transport,
            mail_from,
            mail_receiver: required("EMAIL_RECEIVER")?,
            subject_prefix: env::var("MAIL_SUBJECT_PREFIX")
                .unwrap_or_else(|_| "Richiesta rivenditore Sobrio30".to_string()),
            json_logs: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server port")]
    InvalidPort,
    #[error("Invalid SMTP port")]
    InvalidSmtpPort,
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("Unknown mail transport: {0} (expected smtp or resend)")]
    UnknownTransport(String),
    #[error("Unknown dispatch policy: {0} (expected sync or background)")]
    InvalidDispatchPolicy(String),
}
