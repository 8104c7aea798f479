//! Billing provider integration.

use common::Handler;
use derive_more::{Display, Error as StdError, From};
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::{user::Subscription, User};
use crate::domain::user::{self, subscription};

/// Billing provider.
pub use common::Handler as Billing;

/// Operation of creating a new [`Subscription`] at the billing provider.
#[derive(Clone, Debug)]
pub struct CreateSubscription {
    /// ID of the paying landlord [`User`].
    pub user_id: user::Id,

    /// Email of the paying landlord [`User`].
    pub email: user::Email,

    /// Number of units to pay for.
    pub quantity: subscription::Quantity,
}

/// Created [`Subscription`] awaiting approval by the payer.
#[derive(Clone, Debug, PartialEq)]
pub struct Approval {
    /// ID of the created [`Subscription`] at the billing provider.
    pub subscription_id: subscription::ProviderId,

    /// URL the payer approves the [`Subscription`] at.
    pub approval_url: String,
}

/// Operation of changing the quantity of an existing [`Subscription`].
#[derive(Clone, Debug)]
pub struct ReviseSubscription {
    /// ID of the [`Subscription`] at the billing provider.
    pub subscription_id: subscription::ProviderId,

    /// New number of units to pay for.
    pub quantity: subscription::Quantity,
}

/// Operation of checking that a [`Webhook`] delivery originates from the
/// billing provider.
#[derive(Clone, Debug)]
pub struct VerifyWebhook {
    /// Signature the delivery came with.
    pub signature: WebhookSignature,

    /// Delivered event exactly as received.
    pub event: serde_json::Value,
}

/// Transmission headers [PayPal] signs every [`Webhook`] delivery with.
///
/// [PayPal]: https://developer.paypal.com/api/rest/webhooks/rest
#[derive(Clone, Debug, Default)]
pub struct WebhookSignature {
    /// `PAYPAL-TRANSMISSION-ID` header.
    pub transmission_id: String,

    /// `PAYPAL-TRANSMISSION-TIME` header.
    pub transmission_time: String,

    /// `PAYPAL-TRANSMISSION-SIG` header.
    pub transmission_sig: String,

    /// `PAYPAL-CERT-URL` header.
    pub cert_url: String,

    /// `PAYPAL-AUTH-ALGO` header.
    pub auth_algo: String,
}

impl WebhookSignature {
    /// Collects a [`WebhookSignature`] with the provided `header` lookup by
    /// lowercase header name.
    ///
    /// Missing headers are left empty.
    #[must_use]
    pub fn from_headers<'h>(
        header: impl Fn(&str) -> Option<&'h str>,
    ) -> Self {
        let get = |name: &str| header(name).unwrap_or_default().to_owned();
        Self {
            transmission_id: get("paypal-transmission-id"),
            transmission_time: get("paypal-transmission-time"),
            transmission_sig: get("paypal-transmission-sig"),
            cert_url: get("paypal-cert-url"),
            auth_algo: get("paypal-auth-algo"),
        }
    }

    /// Indicates whether all the headers are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [
            &self.transmission_id,
            &self.transmission_time,
            &self.transmission_sig,
            &self.cert_url,
            &self.auth_algo,
        ]
        .iter()
        .all(|h| !h.trim().is_empty())
    }
}

/// [PayPal] subscriptions configuration.
///
/// [PayPal]: https://developer.paypal.com/docs/api/subscriptions/v1
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the [PayPal] REST API.
    ///
    /// [PayPal]: https://developer.paypal.com/docs/api/subscriptions/v1
    pub api_url: String,

    /// OAuth client ID.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: SecretString,

    /// ID of the per-unit billing plan.
    pub plan_id: String,

    /// URL the payer is redirected to after approval.
    pub return_url: String,

    /// URL the payer is redirected to after cancelling the approval.
    pub cancel_url: String,

    /// ID of the webhook registered at [PayPal] to verify deliveries
    /// against.
    ///
    /// [PayPal]: https://developer.paypal.com/api/rest/webhooks
    pub webhook_id: String,
}

/// [PayPal] subscriptions client.
///
/// [PayPal]: https://developer.paypal.com/docs/api/subscriptions/v1
#[derive(Clone, Debug)]
pub struct PayPal {
    /// HTTP client to call the API with.
    client: reqwest::Client,

    /// [`Config`] of this [`PayPal`] client.
    config: Config,
}

impl PayPal {
    /// Creates a new [`PayPal`] client with the provided [`Config`].
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Obtains a fresh OAuth access token.
    async fn access_token(&self) -> Result<String, Traced<Error>> {
        /// Response of the OAuth token endpoint.
        #[derive(Deserialize)]
        struct Token {
            /// Issued access token.
            access_token: String,
        }

        let token = self
            .client
            .post(format!("{}/v1/oauth2/token", self.config.api_url))
            .basic_auth(
                &self.config.client_id,
                Some(self.config.client_secret.expose_secret()),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?
            .error_for_status()
            .map_err(tracerr::from_and_wrap!(=> Error))?
            .json::<Token>()
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        Ok(token.access_token)
    }
}

impl Handler<CreateSubscription> for PayPal {
    type Ok = Approval;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        op: CreateSubscription,
    ) -> Result<Self::Ok, Self::Err> {
        /// Link returned along with a created subscription.
        #[derive(Deserialize)]
        struct Link {
            /// URL of this link.
            href: String,

            /// Relation of this link.
            rel: String,
        }

        /// Response of the subscription creation endpoint.
        #[derive(Deserialize)]
        struct Created {
            /// ID of the created subscription.
            id: String,

            /// HATEOAS links of the created subscription.
            links: Vec<Link>,
        }

        let token = self.access_token().await?;
        let created = self
            .client
            .post(format!("{}/v1/billing/subscriptions", self.config.api_url))
            .bearer_auth(token)
            .json(&json!({
                "plan_id": self.config.plan_id,
                "quantity": op.quantity.max(1).to_string(),
                "custom_id": op.user_id,
                "subscriber": { "email_address": op.email.to_string() },
                "application_context": {
                    "return_url": self.config.return_url,
                    "cancel_url": self.config.cancel_url,
                },
            }))
            .send()
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?
            .error_for_status()
            .map_err(tracerr::from_and_wrap!(=> Error))?
            .json::<Created>()
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        let subscription_id = subscription::ProviderId::new(created.id)
            .ok_or(Error::MalformedResponse("empty subscription ID"))
            .map_err(tracerr::wrap!())?;
        let approval_url = created
            .links
            .into_iter()
            .find_map(|l| (l.rel == "approve").then_some(l.href))
            .ok_or(Error::MalformedResponse("no `approve` link"))
            .map_err(tracerr::wrap!())?;

        log::debug!(
            "created PayPal subscription `{subscription_id}` for \
             `User(id: {})`",
            op.user_id,
        );

        Ok(Approval {
            subscription_id,
            approval_url,
        })
    }
}

impl Handler<ReviseSubscription> for PayPal {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        op: ReviseSubscription,
    ) -> Result<Self::Ok, Self::Err> {
        let token = self.access_token().await?;
        _ = self
            .client
            .post(format!(
                "{}/v1/billing/subscriptions/{}/revise",
                self.config.api_url, op.subscription_id,
            ))
            .bearer_auth(token)
            .json(&json!({
                "plan_id": self.config.plan_id,
                "quantity": op.quantity.max(1).to_string(),
            }))
            .send()
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?
            .error_for_status()
            .map_err(tracerr::from_and_wrap!(=> Error))?;
        Ok(())
    }
}

impl Handler<VerifyWebhook> for PayPal {
    type Ok = bool;
    type Err = Traced<Error>;

    async fn execute(&self, op: VerifyWebhook) -> Result<Self::Ok, Self::Err> {
        /// Response of the signature verification endpoint.
        #[derive(Deserialize)]
        struct Verification {
            /// `SUCCESS` or `FAILURE`.
            verification_status: String,
        }

        if self.config.webhook_id.is_empty() {
            log::warn!("PayPal webhook ID is not configured, rejecting event");
            return Ok(false);
        }

        let VerifyWebhook { signature, event } = op;
        let token = self.access_token().await?;
        let verification = self
            .client
            .post(format!(
                "{}/v1/notifications/verify-webhook-signature",
                self.config.api_url,
            ))
            .bearer_auth(token)
            .json(&json!({
                "auth_algo": signature.auth_algo,
                "cert_url": signature.cert_url,
                "transmission_id": signature.transmission_id,
                "transmission_sig": signature.transmission_sig,
                "transmission_time": signature.transmission_time,
                "webhook_id": self.config.webhook_id,
                "webhook_event": event,
            }))
            .send()
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?
            .error_for_status()
            .map_err(tracerr::from_and_wrap!(=> Error))?
            .json::<Verification>()
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        Ok(verification.verification_status == "SUCCESS")
    }
}

/// Webhook event delivered by [PayPal].
///
/// [PayPal]: https://developer.paypal.com/api/rest/webhooks
#[derive(Clone, Debug, Deserialize)]
pub struct Webhook {
    /// Type of the event (e.g. `BILLING.SUBSCRIPTION.ACTIVATED`).
    pub event_type: String,

    /// Resource the event is about.
    pub resource: WebhookResource,
}

/// Resource of a [`Webhook`] event.
#[derive(Clone, Debug, Deserialize)]
pub struct WebhookResource {
    /// ID of the resource.
    ///
    /// Payment events carry the subscription ID in `billing_agreement_id`
    /// instead.
    pub id: Option<String>,

    /// ID of the subscription a payment belongs to.
    pub billing_agreement_id: Option<String>,
}

impl Webhook {
    /// Interprets this [`Webhook`] as a [`subscription::Event`].
    ///
    /// [`None`] is returned for events not affecting a [`Subscription`]
    /// status.
    #[must_use]
    pub fn event(
        &self,
    ) -> Option<(subscription::ProviderId, subscription::Event)> {
        use subscription::Event as Ev;

        let (event, id) = match self.event_type.as_str() {
            "BILLING.SUBSCRIPTION.ACTIVATED" => {
                (Ev::Activated, self.resource.id.as_ref())
            }
            "BILLING.SUBSCRIPTION.CANCELLED" => {
                (Ev::Cancelled, self.resource.id.as_ref())
            }
            "BILLING.SUBSCRIPTION.PAYMENT.FAILED" => {
                (Ev::PaymentDenied, self.resource.id.as_ref())
            }
            "PAYMENT.SALE.DENIED" => (
                Ev::PaymentDenied,
                self.resource.billing_agreement_id.as_ref(),
            ),
            _ => return None,
        };
        Some((subscription::ProviderId::new(id?.clone())?, event))
    }
}

/// Billing provider error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// HTTP request to the provider failed.
    #[display("Billing provider request failed: {_0}")]
    Http(reqwest::Error),

    /// Provider responded with something unexpected.
    #[display("Malformed billing provider response: {_0}")]
    #[from(ignore)]
    MalformedResponse(#[error(not(source))] &'static str),
}

#[cfg(test)]
pub(crate) mod spec {
    use std::sync::Arc;

    use common::Handler;
    use parking_lot::Mutex;
    use tracerr::Traced;

    use crate::domain::user::subscription;

    use super::{
        Approval, CreateSubscription, Error, ReviseSubscription,
        VerifyWebhook, Webhook, WebhookSignature,
    };

    /// Billing provider recording every operation it receives.
    #[derive(Clone, Debug, Default)]
    pub(crate) struct Recording {
        /// Quantities of created subscriptions.
        pub(crate) created: Arc<Mutex<Vec<subscription::Quantity>>>,

        /// Revisions of existing subscriptions.
        pub(crate) revised: Arc<
            Mutex<Vec<(subscription::ProviderId, subscription::Quantity)>>,
        >,

        /// Indicator whether webhook deliveries fail verification.
        pub(crate) forged: Arc<Mutex<bool>>,
    }

    /// Returns a complete [`WebhookSignature`].
    pub(crate) fn signature() -> WebhookSignature {
        WebhookSignature::from_headers(|name| {
            Some(match name {
                "paypal-transmission-time" => "2026-10-19T10:00:00Z",
                "paypal-cert-url" => "https://api.paypal.com/v1/cert.pem",
                "paypal-auth-algo" => "SHA256withRSA",
                _ => "69cd13f0-d67a-11e5-baa3-778b53f4ae55",
            })
        })
    }

    impl Handler<CreateSubscription> for Recording {
        type Ok = Approval;
        type Err = Traced<Error>;

        async fn execute(
            &self,
            op: CreateSubscription,
        ) -> Result<Self::Ok, Self::Err> {
            self.created.lock().push(op.quantity);
            Ok(Approval {
                subscription_id: subscription::ProviderId::new(format!(
                    "I-{}",
                    op.user_id,
                ))
                .unwrap(),
                approval_url: "https://paypal.test/approve".into(),
            })
        }
    }

    impl Handler<ReviseSubscription> for Recording {
        type Ok = ();
        type Err = Traced<Error>;

        async fn execute(
            &self,
            op: ReviseSubscription,
        ) -> Result<Self::Ok, Self::Err> {
            self.revised.lock().push((op.subscription_id, op.quantity));
            Ok(())
        }
    }

    impl Handler<VerifyWebhook> for Recording {
        type Ok = bool;
        type Err = Traced<Error>;

        async fn execute(
            &self,
            _: VerifyWebhook,
        ) -> Result<Self::Ok, Self::Err> {
            Ok(!*self.forged.lock())
        }
    }

    fn webhook(json: &str) -> Webhook {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn maps_subscription_events() {
        let (id, event) = webhook(
            r#"{"event_type": "BILLING.SUBSCRIPTION.ACTIVATED",
                "resource": {"id": "I-BW452GLLEP1G"}}"#,
        )
        .event()
        .unwrap();
        assert_eq!(id.as_ref(), "I-BW452GLLEP1G");
        assert_eq!(event, subscription::Event::Activated);

        let (id, event) = webhook(
            r#"{"event_type": "PAYMENT.SALE.DENIED",
                "resource": {"id": "5O190127TN364715T",
                             "billing_agreement_id": "I-BW452GLLEP1G"}}"#,
        )
        .event()
        .unwrap();
        assert_eq!(id.as_ref(), "I-BW452GLLEP1G");
        assert_eq!(event, subscription::Event::PaymentDenied);
    }

    #[test]
    fn collects_signature_headers() {
        assert!(signature().is_complete());

        let partial = WebhookSignature::from_headers(|name| {
            (name == "paypal-transmission-id").then_some("abc")
        });
        assert_eq!(partial.transmission_id, "abc");
        assert!(!partial.is_complete());
    }

    #[test]
    fn ignores_unrelated_events() {
        assert!(webhook(
            r#"{"event_type": "CHECKOUT.ORDER.APPROVED",
                "resource": {"id": "5O190127TN364715T"}}"#,
        )
        .event()
        .is_none());
        assert!(webhook(
            r#"{"event_type": "BILLING.SUBSCRIPTION.CANCELLED",
                "resource": {}}"#,
        )
        .event()
        .is_none());
    }
}
