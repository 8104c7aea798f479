//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use secrecy::SecretString;
use serde::Deserialize;
use service::infra::notifier::Relay;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// [PayPal] billing configuration.
    ///
    /// [PayPal]: https://developer.paypal.com
    pub paypal: PayPal,

    /// Notifier configuration.
    pub notifier: Notifier,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Service configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// [JWT] secret.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[default("secret".to_owned())]
    pub jwt_secret: String,

    /// Lifetimes of issued tokens.
    pub ttl: Ttl,
}

impl From<Service> for service::Config {
    fn from(value: Service) -> Self {
        let Service {
            jwt_secret,
            ttl:
                Ttl {
                    session,
                    invitation,
                    password_reset,
                },
        } = value;
        Self {
            jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(
                jwt_secret.as_bytes(),
            ),
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                jwt_secret.as_bytes(),
            ),
            ttl: service::Ttl {
                session,
                invitation,
                password_reset,
            },
        }
    }
}

/// Lifetimes of issued tokens.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Ttl {
    /// Lifetime of a user session.
    #[default(time::Duration::from_secs(30 * 60))]
    #[serde(with = "humantime_serde")]
    pub session: time::Duration,

    /// Lifetime of a tenant invitation.
    #[default(time::Duration::from_secs(24 * 60 * 60))]
    #[serde(with = "humantime_serde")]
    pub invitation: time::Duration,

    /// Lifetime of a password reset token.
    #[default(time::Duration::from_secs(60 * 60))]
    #[serde(with = "humantime_serde")]
    pub password_reset: time::Duration,
}

/// [PayPal] configuration.
///
/// [PayPal]: https://developer.paypal.com/docs/api/subscriptions/v1
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct PayPal {
    /// Base URL of the REST API.
    #[default("https://api-m.sandbox.paypal.com".to_owned())]
    pub api_url: String,

    /// OAuth client ID.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: String,

    /// ID of the per-unit billing plan.
    pub plan_id: String,

    /// URL the payer is redirected to after approval.
    #[default("http://localhost:3000/billing/success".to_owned())]
    pub return_url: String,

    /// URL the payer is redirected to after cancelling the approval.
    #[default("http://localhost:3000/billing/cancel".to_owned())]
    pub cancel_url: String,

    /// ID of the webhook registered at [PayPal].
    ///
    /// Webhook deliveries are rejected if omitted.
    ///
    /// [PayPal]: https://developer.paypal.com/api/rest/webhooks
    pub webhook_id: String,
}

impl From<PayPal> for service::infra::billing::Config {
    fn from(value: PayPal) -> Self {
        let PayPal {
            api_url,
            client_id,
            client_secret,
            plan_id,
            return_url,
            cancel_url,
            webhook_id,
        } = value;

        Self {
            api_url,
            client_id,
            client_secret: SecretString::from(client_secret),
            plan_id,
            return_url,
            cancel_url,
            webhook_id,
        }
    }
}

/// Notifier configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Notifier {
    /// URL of the mail relay to post notices to.
    ///
    /// Notices are only logged if omitted.
    pub relay_url: Option<String>,

    /// Bearer token authorizing at the mail relay.
    pub relay_token: Option<String>,
}

impl From<Notifier> for service::infra::Notifier {
    fn from(value: Notifier) -> Self {
        let Notifier {
            relay_url,
            relay_token,
        } = value;

        match relay_url {
            Some(url) => Self::Relay(Relay::new(
                url,
                relay_token.map(SecretString::from),
            )),
            None => Self::Log,
        }
    }
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use super::{Notifier, Service};

    #[test]
    fn token_lifetimes_default() {
        let cfg = service::Config::from(Service::default());

        assert_eq!(cfg.ttl.session, Duration::from_secs(30 * 60));
        assert_eq!(cfg.ttl.invitation, Duration::from_secs(24 * 60 * 60));
        assert_eq!(cfg.ttl.password_reset, Duration::from_secs(60 * 60));
    }

    #[test]
    fn notifier_logs_without_relay() {
        let notifier = service::infra::Notifier::from(Notifier::default());

        assert!(matches!(notifier, service::infra::Notifier::Log));
    }

    #[test]
    fn notifier_posts_to_relay() {
        let notifier = service::infra::Notifier::from(Notifier {
            relay_url: Some("http://relay.local/notices".to_owned()),
            relay_token: None,
        });

        assert!(matches!(notifier, service::infra::Notifier::Relay(_)));
    }
}
