//! [`Message`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{
    unit::{Creation, Reading},
    DateTimeOf,
};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::{Meldung, User};
use crate::domain::{meldung, user};

/// Message exchanged in a thread of a [`Meldung`].
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// ID of this [`Message`].
    pub id: Id,

    /// ID of the [`Meldung`] this [`Message`] belongs to.
    pub meldung_id: meldung::Id,

    /// [`Sender`] of this [`Message`].
    pub sender: Sender,

    /// [`Receiver`] of this [`Message`].
    pub receiver: Receiver,

    /// [`Content`] of this [`Message`].
    pub content: Content,

    /// [`Attachment`]s of this [`Message`].
    pub attachments: Vec<Attachment>,

    /// Read receipts of this [`Message`], one per [`User`].
    pub read_by: Vec<Receipt>,

    /// [`DateTime`] when this [`Message`] was sent.
    pub created_at: CreationDateTime,
}

impl Message {
    /// Records that the provided [`User`] has read this [`Message`].
    ///
    /// Returns `false` if the [`User`] has read it already, leaving the
    /// existing [`Receipt`] untouched.
    pub fn mark_read(&mut self, user_id: user::Id) -> bool {
        if self.read_by.iter().any(|r| r.user_id == user_id) {
            return false;
        }
        self.read_by.push(Receipt::new(user_id));
        true
    }
}

/// Author of a [`Message`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Sender {
    /// ID of the sending [`User`].
    pub user_id: user::Id,

    /// [`user::Role`] the [`User`] had when sending.
    pub role: user::Role,
}

/// Addressee of a [`Message`].
///
/// A [`Receiver`] without a `user_id` addresses everyone having the `role` in
/// the thread.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Receiver {
    /// [`user::Role`] of the addressee.
    pub role: user::Role,

    /// ID of the addressed [`User`], if a concrete one.
    pub user_id: Option<user::Id>,
}

/// Reference to a file attached to a [`Message`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Attachment {
    /// Original file name.
    pub name: String,

    /// URL the file is stored under.
    pub url: String,

    /// MIME type of the file.
    pub mime: String,
}

impl Attachment {
    /// Indicates whether this [`Attachment`] is an image.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime
            .get(..6)
            .is_some_and(|p| p.eq_ignore_ascii_case("image/"))
    }
}

/// Record of a [`User`] having read something.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Receipt {
    /// ID of the reading [`User`].
    pub user_id: user::Id,

    /// [`DateTime`] of the first reading.
    #[serde(with = "common::datetime::serde::unix_timestamp")]
    pub read_at: ReadingDateTime,
}

impl Receipt {
    /// Creates a new [`Receipt`] of the provided [`User`] reading right now.
    #[must_use]
    pub fn new(user_id: user::Id) -> Self {
        Self {
            user_id,
            read_at: ReadingDateTime::now(),
        }
    }
}

/// ID of a [`Message`].
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

/// Text of a [`Message`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Content(String);

impl Content {
    /// Creates a new [`Content`] if the given `text` is not blank.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        (!text.trim().is_empty() && text.len() <= 10_000).then_some(Self(text))
    }
}

impl FromStr for Content {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Content`")
    }
}

/// [`DateTime`] when a [`Message`] was sent.
pub type CreationDateTime = DateTimeOf<(Message, Creation)>;

/// [`DateTime`] when something was read.
pub type ReadingDateTime = DateTimeOf<(Receipt, Reading)>;

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::domain::{meldung, user};

    use super::{Attachment, Content, Id, Message, Receiver, Sender};

    #[test]
    fn read_receipt_once_per_user() {
        let (tenant, craftsman) = (user::Id::new(), user::Id::new());
        let mut msg = Message {
            id: Id::new(),
            meldung_id: meldung::Id::new(),
            sender: Sender {
                user_id: tenant,
                role: user::Role::Tenant,
            },
            receiver: Receiver {
                role: user::Role::Craftsman,
                user_id: None,
            },
            content: Content::new("Wann kommen Sie?").unwrap(),
            attachments: vec![],
            read_by: vec![],
            created_at: DateTime::now().coerce(),
        };

        assert!(msg.mark_read(craftsman));
        let first = msg.read_by[0];
        assert!(!msg.mark_read(craftsman));
        assert!(msg.mark_read(tenant));

        assert_eq!(msg.read_by.len(), 2);
        assert_eq!(msg.read_by[0], first);
    }

    #[test]
    fn detects_images() {
        let attachment = |mime: &str| Attachment {
            name: "file".into(),
            url: "https://files.example.org/file".into(),
            mime: mime.into(),
        };

        assert!(attachment("image/jpeg").is_image());
        assert!(attachment("IMAGE/PNG").is_image());
        assert!(!attachment("application/pdf").is_image());
        assert!(!attachment("img").is_image());
    }

    #[test]
    fn content_is_not_blank() {
        assert!(Content::new(" \n").is_none());
        assert!(Content::new("Danke!").is_some());
    }
}
