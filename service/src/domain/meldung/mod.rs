//! [`Meldung`] (maintenance report) definitions.

pub mod status;

#[cfg(doc)]
use common::DateTime;
use common::{
    define_kind,
    unit::{Appointment, Completion, Creation, Modification},
    DateTimeOf, Money,
};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::{Unit, User};
use crate::domain::{unit, user};

pub use self::status::{InvalidTransition, Status};

/// Maintenance report filed by a tenant against their [`Unit`].
#[derive(Clone, Debug, PartialEq)]
pub struct Meldung {
    /// ID of this [`Meldung`].
    pub id: Id,

    /// ID of the [`Unit`] this [`Meldung`] is about.
    pub unit_id: unit::Id,

    /// ID of the tenant [`User`] who filed this [`Meldung`].
    pub reporter_id: user::Id,

    /// ID of the craftsman [`User`] working on this [`Meldung`].
    pub assigned_to: Option<user::Id>,

    /// [`Title`] of this [`Meldung`].
    pub title: Title,

    /// [`Description`] of this [`Meldung`].
    pub description: Description,

    /// Current [`Status`] of this [`Meldung`].
    pub status: Status,

    /// [`Priority`] of this [`Meldung`].
    pub priority: Priority,

    /// Append-only history of [`Note`]s.
    pub notes: Vec<Note>,

    /// Images attached by the reporter.
    pub images: Vec<ImageUrl>,

    /// Estimated cost of the repair.
    pub estimated_cost: Option<Money>,

    /// Actual cost of the repair.
    pub actual_cost: Option<Money>,

    /// [`DateTime`] of the planned craftsman visit.
    pub scheduled_for: Option<AppointmentDateTime>,

    /// [`DateTime`] when this [`Meldung`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Meldung`] was last modified.
    pub updated_at: ModificationDateTime,

    /// [`DateTime`] when this [`Meldung`] first became
    /// [`Status::Abgeschlossen`].
    pub completed_at: Option<CompletionDateTime>,
}

impl Meldung {
    /// Moves this [`Meldung`] into the provided [`Status`], without checking
    /// the transition rules.
    ///
    /// `completed_at` is set on the first entrance into
    /// [`Status::Abgeschlossen`] and kept forever after.
    pub fn apply_status(&mut self, status: Status) {
        let now = ModificationDateTime::now();
        self.status = status;
        self.updated_at = now;
        if status == Status::Abgeschlossen && self.completed_at.is_none() {
            self.completed_at = Some(now.coerce());
        }
    }

    /// Assigns the provided craftsman [`User`] to this [`Meldung`] and puts
    /// it into [`Status::InBearbeitung`].
    ///
    /// # Errors
    ///
    /// With [`InvalidTransition`] if this [`Meldung`] is in a terminal
    /// [`Status`] already.
    pub fn assign(
        &mut self,
        craftsman_id: user::Id,
    ) -> Result<(), InvalidTransition> {
        if self.status.is_terminal() {
            return Err(InvalidTransition {
                from: self.status,
                to: Status::InBearbeitung,
            });
        }
        self.assigned_to = Some(craftsman_id);
        self.apply_status(Status::InBearbeitung);
        Ok(())
    }

    /// Appends the provided [`Note`].
    pub fn add_note(&mut self, note: Note) {
        self.updated_at = ModificationDateTime::now();
        self.notes.push(note);
    }

    /// Indicates whether the provided [`User`] is a direct participant of
    /// this [`Meldung`] (its reporter or assignee).
    #[must_use]
    pub fn involves(&self, user_id: user::Id) -> bool {
        self.reporter_id == user_id || self.assigned_to == Some(user_id)
    }
}

/// Entry of the [`Meldung`] audit trail.
#[derive(Clone, Debug, PartialEq)]
pub struct Note {
    /// [`NoteText`] of this [`Note`].
    pub text: NoteText,

    /// ID of the [`User`] who wrote this [`Note`].
    pub author_id: user::Id,

    /// Server [`DateTime`] when this [`Note`] was written.
    pub created_at: NoteDateTime,
}

impl Note {
    /// Creates a new [`Note`] written right now.
    #[must_use]
    pub fn new(text: NoteText, author_id: user::Id) -> Self {
        Self {
            text,
            author_id,
            created_at: NoteDateTime::now(),
        }
    }
}

/// ID of a [`Meldung`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Title of a [`Meldung`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Title(String);

impl Title {
    /// Creates a new [`Title`] if the given `title` is valid.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Option<Self> {
        let title = title.into();
        (title.trim() == title && !title.is_empty() && title.len() <= 200)
            .then_some(Self(title))
    }
}

impl FromStr for Title {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Title`")
    }
}

/// Description of a [`Meldung`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Description(String);

impl Description {
    /// Creates a new [`Description`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        (!text.trim().is_empty() && text.len() <= 5000).then_some(Self(text))
    }
}

impl FromStr for Description {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Description`")
    }
}

/// Text of a [`Note`], never blank.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct NoteText(String);

impl NoteText {
    /// Creates a new [`NoteText`] if the given `text` is not blank.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        (!text.trim().is_empty() && text.len() <= 5000).then_some(Self(text))
    }
}

impl FromStr for NoteText {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `NoteText`")
    }
}

/// HTTP(S) URL of an image attached to a [`Meldung`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct ImageUrl(String);

impl ImageUrl {
    /// Creates a new [`ImageUrl`] if the given `url` is an HTTP(S) one.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Option<Self> {
        let url = url.into();
        ((url.starts_with("https://") || url.starts_with("http://"))
            && !url.contains(char::is_whitespace)
            && url.len() <= 2048)
            .then_some(Self(url))
    }
}

impl FromStr for ImageUrl {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `ImageUrl`")
    }
}

define_kind! {
    #[doc = "Urgency of a [`Meldung`]."]
    #[serialize_all = "lowercase"]
    enum Priority {
        #[doc = "Can wait."]
        Niedrig = 1,

        #[doc = "Regular repair."]
        Mittel = 2,

        #[doc = "Should be handled soon."]
        Hoch = 3,

        #[doc = "Damage spreads or safety is at risk."]
        Dringend = 4,
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Mittel
    }
}

/// [`DateTime`] when a [`Meldung`] was created.
pub type CreationDateTime = DateTimeOf<(Meldung, Creation)>;

/// [`DateTime`] when a [`Meldung`] was modified.
pub type ModificationDateTime = DateTimeOf<(Meldung, Modification)>;

/// [`DateTime`] when a [`Meldung`] was completed.
pub type CompletionDateTime = DateTimeOf<(Meldung, Completion)>;

/// [`DateTime`] of a craftsman visit planned for a [`Meldung`].
pub type AppointmentDateTime = DateTimeOf<(Meldung, Appointment)>;

/// [`DateTime`] when a [`Note`] was written.
pub type NoteDateTime = DateTimeOf<(Note, Creation)>;

#[cfg(test)]
pub(crate) mod spec {
    use common::DateTime;

    use crate::domain::{unit, user};

    use super::{
        Description, Id, InvalidTransition, Meldung, Note, NoteText,
        Priority, Status, Title,
    };

    pub(crate) fn filed(unit_id: unit::Id, reporter_id: user::Id) -> Meldung {
        Meldung {
            id: Id::new(),
            unit_id,
            reporter_id,
            assigned_to: None,
            title: Title::new("Heizung fällt aus").unwrap(),
            description: Description::new("Seit gestern kalt.").unwrap(),
            status: Status::INITIAL,
            priority: Priority::default(),
            notes: vec![],
            images: vec![],
            estimated_cost: None,
            actual_cost: None,
            scheduled_for: None,
            created_at: DateTime::now().coerce(),
            updated_at: DateTime::now().coerce(),
            completed_at: None,
        }
    }

    #[test]
    fn completed_at_is_set_once() {
        let mut m = filed(unit::Id::new(), user::Id::new());
        m.apply_status(Status::InBearbeitung);
        m.apply_status(Status::HandwerkerErledigt);
        assert_eq!(m.completed_at, None);

        m.apply_status(Status::Abgeschlossen);
        let completed_at = m.completed_at;
        assert!(completed_at.is_some());

        std::thread::sleep(std::time::Duration::from_millis(2));
        m.apply_status(Status::Abgeschlossen);
        m.apply_status(Status::InBearbeitung);
        m.apply_status(Status::Abgeschlossen);
        assert_eq!(m.completed_at, completed_at);
    }

    #[test]
    fn assignment_forces_in_progress() {
        let craftsman = user::Id::new();
        for from in [
            Status::Offen,
            Status::InBearbeitung,
            Status::HandwerkerErledigt,
        ] {
            let mut m = filed(unit::Id::new(), user::Id::new());
            m.status = from;

            m.assign(craftsman).unwrap();

            assert_eq!(m.status, Status::InBearbeitung);
            assert_eq!(m.assigned_to, Some(craftsman));
        }
    }

    #[test]
    fn assignment_rejects_terminal() {
        for from in [Status::Abgeschlossen, Status::Storniert] {
            let mut m = filed(unit::Id::new(), user::Id::new());
            m.status = from;

            assert_eq!(
                m.assign(user::Id::new()),
                Err(InvalidTransition {
                    from,
                    to: Status::InBearbeitung,
                }),
            );
            assert_eq!(m.assigned_to, None);
        }
    }

    #[test]
    fn notes_are_appended() {
        let mut m = filed(unit::Id::new(), user::Id::new());
        let author = user::Id::new();
        m.add_note(Note::new(NoteText::new("Termin Montag").unwrap(), author));
        let text = NoteText::new("Ventil getauscht").unwrap();
        m.add_note(Note::new(text, author));

        assert_eq!(
            m.notes.iter().map(|n| n.text.to_string()).collect::<Vec<_>>(),
            ["Termin Montag", "Ventil getauscht"],
        );
        assert!(NoteText::new("   ").is_none());
    }

    #[test]
    fn default_priority() {
        assert_eq!(Priority::default(), Priority::Mittel);
        assert_eq!(Priority::Dringend.to_string(), "dringend");
    }
}
