//! Application provides API for interacting with the [`Service`].

#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod api;
pub mod args;
pub mod config;
mod context;
pub mod error;

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Path,
    response::{IntoResponse, Response},
    Extension, Json,
};
use derive_more::Debug;
use juniper::{http::GraphQLBatchResponse, DefaultScalarValue, ScalarValue};
use juniper_axum::extract::JuniperRequest;
use service::{command, domain, infra::billing, Command as _};
use tracing as log;
// Used in binary.
use axum_client_ip as _;
use futures as _;
use refinery as _;
use tower_http as _;
use tracing_subscriber as _;

pub use self::{
    args::Args,
    config::Config,
    context::{Context, Session},
    error::{AsError, Error},
};

/// [`Service`] with filled infrastructure dependencies.
///
/// [`Service`]: service::Service
pub type Service = service::Service<
    service::infra::Postgres,
    service::infra::billing::PayPal,
>;

/// [`juniper`] GraphQL response.
#[derive(Debug)]
pub struct JuniperResponse<S = DefaultScalarValue>
where
    S: ScalarValue,
{
    /// Status code of the response.
    pub status_code: http::StatusCode,

    /// Underlying GraphQL response.
    #[debug(skip)]
    pub response: GraphQLBatchResponse<S>,
}

impl<S> IntoResponse for JuniperResponse<S>
where
    S: ScalarValue,
{
    fn into_response(self) -> Response {
        let Self {
            status_code,
            response,
        } = self;

        if response.is_ok() {
            Json(response).into_response()
        } else {
            (status_code, Json(response)).into_response()
        }
    }
}

/// GraphQL API handler.
pub async fn graphql(
    Extension(schema): Extension<Arc<api::Schema>>,
    context: Context,
    JuniperRequest(gql_request): JuniperRequest,
) -> JuniperResponse {
    JuniperResponse {
        status_code: context.error_status_code(),
        response: gql_request.execute(&*schema, &context).await,
    }
}

/// Handler exporting the thread of a [`domain::Meldung`] as a PDF document.
///
/// # Errors
///
/// Errors if the request is not authorized, the [`domain::Meldung`] does not
/// exist or is not accessible by the current [`Session`].
pub async fn export_meldung(
    context: Context,
    Path(meldung_id): Path<domain::meldung::Id>,
) -> Result<Response, Error> {
    let session = context.current_session().await?;

    let pdf = context
        .service()
        .execute(command::ExportMeldungThread {
            user_id: session.user_id.into(),
            role: session.role,
            meldung_id,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok((
        [
            (http::header::CONTENT_TYPE, "application/pdf".to_owned()),
            (
                http::header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"meldung-{meldung_id}.pdf\""),
            ),
        ],
        pdf,
    )
        .into_response())
}

/// Handler of the [PayPal] webhook events.
///
/// Deliveries are verified with [PayPal] first. Events not affecting a
/// subscription status are acknowledged and ignored.
///
/// # Errors
///
/// Errors if the delivery is not signed by [PayPal], is malformed, or refers
/// to an unknown subscription.
///
/// [PayPal]: https://developer.paypal.com/api/rest/webhooks
pub async fn paypal_webhook(
    Extension(service): Extension<Service>,
    headers: http::HeaderMap,
    payload: Bytes,
) -> Result<http::StatusCode, Error> {
    let signature = billing::WebhookSignature::from_headers(|name| {
        headers.get(name).and_then(|v| v.to_str().ok())
    });

    let applied = service
        .execute(command::ApplyBillingEvent {
            signature,
            payload: payload.to_vec(),
        })
        .await
        .map_err(AsError::into_error)?;
    if let Some(subscription) = applied {
        log::debug!(
            "applied billing webhook to `Subscription(id: {})`",
            subscription.id,
        );
    }

    Ok(http::StatusCode::OK)
}

impl AsError for command::export_meldung_thread::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "MELDUNG_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Meldung` with the specified ID does not exist"]
                NotExists,

                #[code = "MELDUNG_FORBIDDEN"]
                #[status = FORBIDDEN]
                #[message = "`Meldung` with the specified ID is not \
                             accessible"]
                Forbidden,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::MeldungNotExists(_) => Error::NotExists.into(),
            Self::Forbidden(_) => Error::Forbidden.into(),
        })
    }
}

impl AsError for command::apply_billing_event::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "SUBSCRIPTION_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "Subscription with the specified ID does not \
                             exist"]
                NotExists,

                #[code = "WEBHOOK_UNVERIFIED"]
                #[status = UNAUTHORIZED]
                #[message = "Webhook delivery is not signed by the billing \
                             provider"]
                Unverified,

                #[code = "WEBHOOK_MALFORMED"]
                #[status = BAD_REQUEST]
                #[message = "Webhook delivery is not a billing event"]
                Malformed,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::Billing(e) => return e.try_as_error(),
            Self::Unverified => Error::Unverified.into(),
            Self::Malformed(_) => Error::Malformed.into(),
            Self::SubscriptionNotExists(_) => Error::NotExists.into(),
        })
    }
}
