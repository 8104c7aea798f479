//! [`Notification`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit::Creation, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::{Meldung, Property, User};
use crate::domain::{meldung, message::Receipt, property, user};

/// Announcement posted by a landlord to everyone living in a [`Property`].
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    /// ID of this [`Notification`].
    pub id: Id,

    /// ID of the [`Property`] this [`Notification`] is posted to.
    pub property_id: property::Id,

    /// [`Kind`] of this [`Notification`].
    pub kind: Kind,

    /// [`Priority`] of this [`Notification`].
    pub priority: Priority,

    /// [`Title`] of this [`Notification`].
    pub title: Title,

    /// [`Text`] of this [`Notification`].
    pub message: Text,

    /// ID of the [`User`] who posted this [`Notification`].
    pub creator_id: user::Id,

    /// ID of the [`Meldung`] this [`Notification`] relates to.
    pub meldung_id: Option<meldung::Id>,

    /// Read receipts of this [`Notification`], one per [`User`].
    pub read_by: Vec<Receipt>,

    /// [`DateTime`] when this [`Notification`] was posted.
    pub created_at: CreationDateTime,
}

impl Notification {
    /// Records that the provided [`User`] has read this [`Notification`].
    ///
    /// Returns `false` if the [`User`] has read it already.
    pub fn mark_read(&mut self, user_id: user::Id) -> bool {
        if self.read_by.iter().any(|r| r.user_id == user_id) {
            return false;
        }
        self.read_by.push(Receipt::new(user_id));
        true
    }
}

define_kind! {
    #[doc = "Kind of a [`Notification`]."]
    enum Kind {
        #[doc = "Planned maintenance works."]
        Maintenance = 1,

        #[doc = "General announcement."]
        Announcement = 2,

        #[doc = "Event in the [`Property`]."]
        Event = 3,

        #[doc = "Emergency requiring immediate attention."]
        Emergency = 4,
    }
}

define_kind! {
    #[doc = "Priority of a [`Notification`]."]
    enum Priority {
        #[doc = "Informational."]
        Low = 1,

        #[doc = "Regular."]
        Medium = 2,

        #[doc = "Important."]
        High = 3,

        #[doc = "Must be read immediately."]
        Urgent = 4,
    }
}

/// ID of a [`Notification`].
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

/// Title of a [`Notification`].
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

/// Body text of a [`Notification`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Text(String);

impl Text {
    /// Creates a new [`Text`] if the given `text` is not blank.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        (!text.trim().is_empty() && text.len() <= 5000).then_some(Self(text))
    }
}

impl FromStr for Text {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Text`")
    }
}

/// [`DateTime`] when a [`Notification`] was posted.
pub type CreationDateTime = DateTimeOf<(Notification, Creation)>;

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::domain::{property, user};

    use super::{Id, Kind, Notification, Priority, Text, Title};

    #[test]
    fn read_receipt_once_per_user() {
        let reader = user::Id::new();
        let mut n = Notification {
            id: Id::new(),
            property_id: property::Id::new(),
            kind: Kind::Maintenance,
            priority: Priority::High,
            title: Title::new("Wasser abgestellt").unwrap(),
            message: Text::new("Am Dienstag 8-12 Uhr.").unwrap(),
            creator_id: user::Id::new(),
            meldung_id: None,
            read_by: vec![],
            created_at: DateTime::now().coerce(),
        };

        assert!(n.mark_read(reader));
        assert!(!n.mark_read(reader));
        assert_eq!(n.read_by.len(), 1);
    }

    #[test]
    fn wire_names() {
        assert_eq!(Kind::Emergency.to_string(), "EMERGENCY");
        assert_eq!("URGENT".parse::<Priority>().unwrap(), Priority::Urgent);
    }
}
