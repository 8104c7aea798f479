//! Billing [`Subscription`] definitions.

use common::DateTime;
use derive_more::From;
use juniper::{graphql_object, GraphQLEnum, GraphQLObject};
use service::{domain::user::subscription, infra::billing};

use crate::Context;

/// Billing subscription of a landlord, priced per managed unit.
#[derive(Clone, Debug, From)]
pub struct Subscription(subscription::Subscription);

/// Billing subscription of a landlord, priced per managed unit.
#[graphql_object(name = "BillingSubscription", context = Context)]
impl Subscription {
    /// ID of this `BillingSubscription` at the billing provider.
    pub fn provider_id(&self) -> String {
        self.0.id.to_string()
    }

    /// Current status of this `BillingSubscription`.
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// Number of units this `BillingSubscription` is paid for.
    pub fn quantity(&self) -> i32 {
        i32::try_from(self.0.quantity).unwrap_or(i32::MAX)
    }

    /// `DateTime` when this `BillingSubscription` was last changed.
    pub fn updated_at(&self) -> DateTime {
        self.0.updated_at.coerce()
    }
}

/// Created `BillingSubscription` awaiting approval by the payer.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(name = "BillingApproval")]
pub struct Approval {
    /// ID of the created `BillingSubscription` at the billing provider.
    pub provider_id: String,

    /// URL the payer approves the `BillingSubscription` at.
    pub approval_url: String,
}

impl From<billing::Approval> for Approval {
    fn from(approval: billing::Approval) -> Self {
        let billing::Approval {
            subscription_id,
            approval_url,
        } = approval;
        Self {
            provider_id: subscription_id.to_string(),
            approval_url,
        }
    }
}

/// Status of a `BillingSubscription`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "BillingSubscriptionStatus")]
pub enum Status {
    /// Created, awaiting approval by the payer.
    ApprovalPending,

    /// Approved and billed.
    Active,

    /// Cancelled by the payer or the provider.
    Cancelled,

    /// Last payment was denied.
    PaymentDenied,
}

impl From<subscription::Status> for Status {
    fn from(status: subscription::Status) -> Self {
        use subscription::Status as S;
        match status {
            S::ApprovalPending => Self::ApprovalPending,
            S::Active => Self::Active,
            S::Cancelled => Self::Cancelled,
            S::PaymentDenied => Self::PaymentDenied,
        }
    }
}
