//! [`Meldung`]-related definitions.

use common::{DateTime, Money};
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{domain, query, read, Query as _};
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    AsError, Context, Error,
};

/// A maintenance report filed by a tenant against their `Unit`.
#[derive(Clone, Debug, From)]
pub struct Meldung(domain::Meldung);

/// A maintenance report filed by a tenant against their `Unit`.
#[graphql_object(context = Context)]
impl Meldung {
    /// Unique identifier of this `Meldung`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Meldung.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// `Unit` this `Meldung` is filed against.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Meldung.unit",
            meldung.id = %self.0.id,
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn unit(
        &self,
        ctx: &Context,
    ) -> Result<Option<api::Unit>, Error> {
        ctx.service()
            .execute(query::unit::ById::by(self.0.unit_id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|u| u.map(Into::into))
    }

    /// Tenant who filed this `Meldung`.
    pub fn reporter(&self) -> api::User {
        #[expect(
            unsafe_code,
            reason = "`Meldung` loaded from repository guarantees reporter \
                      existence"
        )]
        unsafe {
            api::User::new_unchecked(self.0.reporter_id)
        }
    }

    /// Craftsman assigned to this `Meldung`.
    pub fn assignee(&self) -> Option<api::User> {
        self.0.assigned_to.map(|id| {
            #[expect(
                unsafe_code,
                reason = "`Meldung` loaded from repository guarantees \
                          assignee existence"
            )]
            unsafe {
                api::User::new_unchecked(id)
            }
        })
    }

    /// Title of this `Meldung`.
    pub fn title(&self) -> Title {
        self.0.title.clone().into()
    }

    /// Description of this `Meldung`.
    pub fn description(&self) -> Description {
        self.0.description.clone().into()
    }

    /// Current status of this `Meldung`.
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// Priority of this `Meldung`.
    pub fn priority(&self) -> Priority {
        self.0.priority.into()
    }

    /// Notes left on this `Meldung`, in the order they were written.
    pub fn notes(&self) -> Vec<Note> {
        self.0.notes.iter().cloned().map(Into::into).collect()
    }

    /// URLs of the images attached to this `Meldung`.
    pub fn images(&self) -> Vec<ImageUrl> {
        self.0.images.iter().cloned().map(Into::into).collect()
    }

    /// Estimated cost of resolving this `Meldung`.
    pub fn estimated_cost(&self) -> Option<Money> {
        self.0.estimated_cost
    }

    /// Actual cost of resolving this `Meldung`.
    pub fn actual_cost(&self) -> Option<Money> {
        self.0.actual_cost
    }

    /// `DateTime` of the appointment with the craftsman.
    pub fn scheduled_for(&self) -> Option<DateTime> {
        self.0.scheduled_for.map(|dt| dt.coerce())
    }

    /// `DateTime` when this `Meldung` was filed.
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// `DateTime` when this `Meldung` was last changed.
    pub fn updated_at(&self) -> DateTime {
        self.0.updated_at.coerce()
    }

    /// `DateTime` when this `Meldung` was completed.
    pub fn completed_at(&self) -> Option<DateTime> {
        self.0.completed_at.map(|dt| dt.coerce())
    }
}

/// [`Meldung`] along with its `Message`s.
#[derive(Clone, Debug, From)]
pub struct Thread(read::meldung::Thread);

/// `Meldung` along with its `Message`s.
#[graphql_object(name = "MeldungThread", context = Context)]
impl Thread {
    /// The `Meldung` the `Message`s are about.
    pub fn meldung(&self) -> Meldung {
        self.0.meldung.clone().into()
    }

    /// `Message`s in the order they were sent.
    pub fn messages(&self) -> Vec<api::Message> {
        self.0.messages.iter().cloned().map(Into::into).collect()
    }
}

/// Note left on a [`Meldung`].
#[derive(Clone, Debug, From)]
pub struct Note(domain::meldung::Note);

/// Note left on a `Meldung`.
#[graphql_object(name = "MeldungNote", context = Context)]
impl Note {
    /// Text of this `MeldungNote`.
    pub fn text(&self) -> NoteText {
        self.0.text.clone().into()
    }

    /// `User` who wrote this `MeldungNote`.
    pub fn author(&self) -> api::User {
        #[expect(
            unsafe_code,
            reason = "`Note` loaded from repository guarantees author \
                      existence"
        )]
        unsafe {
            api::User::new_unchecked(self.0.author_id)
        }
    }

    /// `DateTime` when this `MeldungNote` was written.
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

/// Unique identifier of a `Meldung`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::meldung::Id)]
#[into(domain::meldung::Id)]
#[graphql(name = "MeldungId", transparent)]
pub struct Id(Uuid);

/// Title of a `Meldung`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "MeldungTitle",
    with = scalar::Via::<domain::meldung::Title>,
)]
pub struct Title(domain::meldung::Title);

/// Description of a `Meldung`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "MeldungDescription",
    with = scalar::Via::<domain::meldung::Description>,
)]
pub struct Description(domain::meldung::Description);

/// Text of a `MeldungNote`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "MeldungNoteText",
    with = scalar::Via::<domain::meldung::NoteText>,
)]
pub struct NoteText(domain::meldung::NoteText);

/// URL of an image attached to a `Meldung`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "MeldungImageUrl",
    with = scalar::Via::<domain::meldung::ImageUrl>,
)]
pub struct ImageUrl(domain::meldung::ImageUrl);

/// Status of a `Meldung`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "MeldungStatus")]
pub enum Status {
    /// Filed, nobody works on it yet.
    Offen,

    /// A craftsman works on it.
    InBearbeitung,

    /// The craftsman reported the work as done.
    HandwerkerErledigt,

    /// The tenant confirmed the work as done.
    Abgeschlossen,

    /// Cancelled by the landlord.
    Storniert,
}

impl From<domain::meldung::Status> for Status {
    fn from(status: domain::meldung::Status) -> Self {
        use domain::meldung::Status as S;
        match status {
            S::Offen => Self::Offen,
            S::InBearbeitung => Self::InBearbeitung,
            S::HandwerkerErledigt => Self::HandwerkerErledigt,
            S::Abgeschlossen => Self::Abgeschlossen,
            S::Storniert => Self::Storniert,
        }
    }
}

impl From<Status> for domain::meldung::Status {
    fn from(status: Status) -> Self {
        match status {
            Status::Offen => Self::Offen,
            Status::InBearbeitung => Self::InBearbeitung,
            Status::HandwerkerErledigt => Self::HandwerkerErledigt,
            Status::Abgeschlossen => Self::Abgeschlossen,
            Status::Storniert => Self::Storniert,
        }
    }
}

/// Priority of a `Meldung`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "MeldungPriority")]
pub enum Priority {
    /// Can wait.
    Niedrig,

    /// Regular.
    Mittel,

    /// Should be handled soon.
    Hoch,

    /// Must be handled immediately.
    Dringend,
}

impl From<domain::meldung::Priority> for Priority {
    fn from(priority: domain::meldung::Priority) -> Self {
        use domain::meldung::Priority as P;
        match priority {
            P::Niedrig => Self::Niedrig,
            P::Mittel => Self::Mittel,
            P::Hoch => Self::Hoch,
            P::Dringend => Self::Dringend,
        }
    }
}

impl From<Priority> for domain::meldung::Priority {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Niedrig => Self::Niedrig,
            Priority::Mittel => Self::Mittel,
            Priority::Hoch => Self::Hoch,
            Priority::Dringend => Self::Dringend,
        }
    }
}
