//! [`Subscription`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit::Modification, DateTimeOf};
use derive_more::{AsRef, Display};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};

#[cfg(doc)]
use crate::domain::User;

/// Billing subscription of a landlord [`User`], tied to the number of units
/// the landlord manages.
#[derive(Clone, Debug, PartialEq)]
pub struct Subscription {
    /// [`ProviderId`] of this [`Subscription`].
    pub id: ProviderId,

    /// Current [`Status`] of this [`Subscription`].
    pub status: Status,

    /// Number of units this [`Subscription`] is paid for.
    pub quantity: Quantity,

    /// [`DateTime`] when this [`Subscription`] was last changed.
    pub updated_at: ModificationDateTime,
}

/// ID of a [`Subscription`] assigned by the billing provider.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct ProviderId(String);

impl ProviderId {
    /// Creates a new [`ProviderId`] if the given `id` is not blank.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        (!id.trim().is_empty() && id.len() <= 128).then_some(Self(id))
    }
}

/// Number of units a [`Subscription`] is paid for.
pub type Quantity = u32;

define_kind! {
    #[doc = "Status of a [`Subscription`]."]
    enum Status {
        #[doc = "Created, awaiting approval by the payer."]
        ApprovalPending = 1,

        #[doc = "Approved and billed."]
        Active = 2,

        #[doc = "Cancelled by the payer or the provider."]
        Cancelled = 3,

        #[doc = "Last payment was denied."]
        PaymentDenied = 4,
    }
}

define_kind! {
    #[doc = "Billing provider event changing a [`Subscription`] [`Status`]."]
    enum Event {
        #[doc = "Subscription was approved and activated."]
        Activated = 1,

        #[doc = "Subscription was cancelled."]
        Cancelled = 2,

        #[doc = "Payment for the subscription was denied."]
        PaymentDenied = 3,
    }
}

impl Event {
    /// Returns the [`Status`] a [`Subscription`] gets on this [`Event`].
    #[must_use]
    pub const fn status(self) -> Status {
        match self {
            Self::Activated => Status::Active,
            Self::Cancelled => Status::Cancelled,
            Self::PaymentDenied => Status::PaymentDenied,
        }
    }
}

/// [`DateTime`] when a [`Subscription`] was modified.
pub type ModificationDateTime = DateTimeOf<(Subscription, Modification)>;

#[cfg(test)]
mod spec {
    use super::{Event, Status};

    #[test]
    fn events_map_to_statuses() {
        assert_eq!(Event::Activated.status(), Status::Active);
        assert_eq!(Event::Cancelled.status(), Status::Cancelled);
        assert_eq!(Event::PaymentDenied.status(), Status::PaymentDenied);
        assert_eq!(Status::ApprovalPending.to_string(), "APPROVAL_PENDING");
    }
}
