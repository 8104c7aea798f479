//! [`Notification`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    Context,
};

/// A notice published by a landlord for the residents of a `Property`.
#[derive(Clone, Debug, From)]
pub struct Notification(domain::Notification);

/// A notice published by a landlord for the residents of a `Property`.
#[graphql_object(context = Context)]
impl Notification {
    /// Unique identifier of this `Notification`.
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// ID of the `Property` this `Notification` is published for.
    pub fn property_id(&self) -> api::property::Id {
        self.0.property_id.into()
    }

    /// Kind of this `Notification`.
    pub fn kind(&self) -> Kind {
        self.0.kind.into()
    }

    /// Priority of this `Notification`.
    pub fn priority(&self) -> Priority {
        self.0.priority.into()
    }

    /// Title of this `Notification`.
    pub fn title(&self) -> Title {
        self.0.title.clone().into()
    }

    /// Text of this `Notification`.
    pub fn message(&self) -> Text {
        self.0.message.clone().into()
    }

    /// Landlord who published this `Notification`.
    pub fn creator(&self) -> api::User {
        #[expect(
            unsafe_code,
            reason = "`Notification` loaded from repository guarantees \
                      creator existence"
        )]
        unsafe {
            api::User::new_unchecked(self.0.creator_id)
        }
    }

    /// ID of the `Meldung` this `Notification` relates to, if any.
    pub fn meldung_id(&self) -> Option<api::meldung::Id> {
        self.0.meldung_id.map(Into::into)
    }

    /// Indicator whether the current `User` has read this `Notification`.
    pub async fn is_read(&self, ctx: &Context) -> bool {
        let Ok(Some(session)) = ctx.try_current_session().await else {
            return false;
        };
        let my_id = domain::user::Id::from(session.user_id);
        self.0.read_by.iter().any(|r| r.user_id == my_id)
    }

    /// `DateTime` when this `Notification` was published.
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

/// Unique identifier of a `Notification`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::notification::Id)]
#[into(domain::notification::Id)]
#[graphql(name = "NotificationId", transparent)]
pub struct Id(Uuid);

/// Title of a `Notification`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "NotificationTitle",
    with = scalar::Via::<domain::notification::Title>,
)]
pub struct Title(domain::notification::Title);

/// Text of a `Notification`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "NotificationText",
    with = scalar::Via::<domain::notification::Text>,
)]
pub struct Text(domain::notification::Text);

/// Kind of a `Notification`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "NotificationKind")]
pub enum Kind {
    /// Planned maintenance works.
    Maintenance,

    /// General announcement.
    Announcement,

    /// Event in the `Property`.
    Event,

    /// Emergency requiring immediate attention.
    Emergency,
}

impl From<domain::notification::Kind> for Kind {
    fn from(kind: domain::notification::Kind) -> Self {
        use domain::notification::Kind as K;
        match kind {
            K::Maintenance => Self::Maintenance,
            K::Announcement => Self::Announcement,
            K::Event => Self::Event,
            K::Emergency => Self::Emergency,
        }
    }
}

impl From<Kind> for domain::notification::Kind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Maintenance => Self::Maintenance,
            Kind::Announcement => Self::Announcement,
            Kind::Event => Self::Event,
            Kind::Emergency => Self::Emergency,
        }
    }
}

/// Priority of a `Notification`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "NotificationPriority")]
pub enum Priority {
    /// Informational.
    Low,

    /// Regular.
    Medium,

    /// Important.
    High,

    /// Must be read immediately.
    Urgent,
}

impl From<domain::notification::Priority> for Priority {
    fn from(priority: domain::notification::Priority) -> Self {
        use domain::notification::Priority as P;
        match priority {
            P::Low => Self::Low,
            P::Medium => Self::Medium,
            P::High => Self::High,
            P::Urgent => Self::Urgent,
        }
    }
}

impl From<Priority> for domain::notification::Priority {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => Self::Low,
            Priority::Medium => Self::Medium,
            Priority::High => Self::High,
            Priority::Urgent => Self::Urgent,
        }
    }
}
