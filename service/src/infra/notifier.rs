//! [`Notifier`] delivering [`Notice`]s to people.

use common::Handler;
use derive_more::{Display, Error as StdError, From};
use secrecy::{ExposeSecret as _, SecretString};
use serde_json::json;
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::{Meldung, Tenant, User};
use crate::domain::{
    meldung, property, tenant,
    user::{self, password_reset},
};

/// Something a person should be told about.
#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    /// Change of a [`Meldung`] relevant to the recipient.
    Report {
        /// ID of the [`User`] to be notified.
        recipient_id: user::Id,

        /// Short title of this [`Notice`].
        title: String,

        /// Human-readable text of this [`Notice`].
        message: String,

        /// ID of the [`Meldung`] this [`Notice`] is about.
        meldung_id: meldung::Id,
    },

    /// Invitation of a future [`Tenant`].
    Invitation {
        /// Email of the invited person.
        email: user::Email,

        /// Name of the invited person.
        name: user::Name,

        /// [`tenant::InvitationToken`] activating the account.
        token: tenant::InvitationToken,

        /// Name of the property the person is invited into, if resolved.
        property: Option<property::Name>,
    },

    /// Password reset requested by a [`User`].
    PasswordReset {
        /// Email of the [`User`].
        email: user::Email,

        /// [`password_reset::Token`] to reset the password with.
        token: password_reset::Token,
    },
}

impl Notice {
    /// Returns the kind of this [`Notice`] as a wire name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Report { .. } => "report",
            Self::Invitation { .. } => "invitation",
            Self::PasswordReset { .. } => "password_reset",
        }
    }

    /// Renders this [`Notice`] as a JSON payload.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Report {
                recipient_id,
                title,
                message,
                meldung_id,
            } => json!({
                "kind": self.kind(),
                "recipientId": recipient_id,
                "title": title,
                "message": message,
                "meldungId": meldung_id,
            }),
            Self::Invitation {
                email,
                name,
                token,
                property,
            } => json!({
                "kind": self.kind(),
                "email": email.to_string(),
                "name": name.to_string(),
                "token": token.to_string(),
                "property": property.as_ref().map(ToString::to_string),
            }),
            Self::PasswordReset { email, token } => json!({
                "kind": self.kind(),
                "email": email.to_string(),
                "token": token.to_string(),
            }),
        }
    }
}

/// Delivery channel of [`Notice`]s.
#[derive(Clone, Debug)]
pub enum Notifier {
    /// Only logs [`Notice`]s.
    Log,

    /// Posts [`Notice`]s to a mail [`Relay`].
    Relay(Relay),
}

/// HTTP mail relay accepting [`Notice`]s as JSON.
#[derive(Clone, Debug)]
pub struct Relay {
    /// HTTP client to post with.
    client: reqwest::Client,

    /// URL to post [`Notice`]s to.
    url: String,

    /// Bearer token authorizing at the relay.
    token: Option<SecretString>,
}

impl Relay {
    /// Creates a new [`Relay`] posting to the provided `url`.
    #[must_use]
    pub fn new(url: impl Into<String>, token: Option<SecretString>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            token,
        }
    }
}

impl Handler<Notice> for Notifier {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(&self, notice: Notice) -> Result<Self::Ok, Self::Err> {
        match self {
            Self::Log => {
                log::info!(
                    kind = notice.kind(),
                    "notice: {}",
                    notice.to_json(),
                );
                Ok(())
            }
            Self::Relay(relay) => {
                let mut req =
                    relay.client.post(&relay.url).json(&notice.to_json());
                if let Some(token) = &relay.token {
                    req = req.bearer_auth(token.expose_secret());
                }
                _ = req
                    .send()
                    .await
                    .map_err(tracerr::from_and_wrap!(=> Error))?
                    .error_for_status()
                    .map_err(tracerr::from_and_wrap!(=> Error))?;
                Ok(())
            }
        }
    }
}

/// [`Notifier`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// Mail relay request failed.
    #[display("Mail relay request failed: {_0}")]
    Relay(reqwest::Error),
}

#[cfg(test)]
mod spec {
    use crate::domain::{meldung, user};

    use super::Notice;

    #[test]
    fn report_payload() {
        let (recipient_id, meldung_id) = (user::Id::new(), meldung::Id::new());
        let json = Notice::Report {
            recipient_id,
            title: "Arbeit erledigt".into(),
            message: "Bitte bestätigen".into(),
            meldung_id,
        }
        .to_json();

        assert_eq!(json["kind"], "report");
        assert_eq!(json["recipientId"], recipient_id.to_string());
        assert_eq!(json["meldungId"], meldung_id.to_string());
    }
}
