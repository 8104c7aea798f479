//! [`Message`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{
    graphql_object, GraphQLInputObject, GraphQLObject, GraphQLScalar,
};
use service::domain;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    Context,
};

/// A message in a `Meldung` thread.
#[derive(Clone, Debug, From)]
pub struct Message(domain::Message);

/// A message in a `Meldung` thread.
#[graphql_object(context = Context)]
impl Message {
    /// Unique identifier of this `Message`.
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// ID of the `Meldung` this `Message` belongs to.
    pub fn meldung_id(&self) -> api::meldung::Id {
        self.0.meldung_id.into()
    }

    /// `User` who sent this `Message`.
    pub fn sender(&self) -> api::User {
        #[expect(
            unsafe_code,
            reason = "`Message` loaded from repository guarantees sender \
                      existence"
        )]
        unsafe {
            api::User::new_unchecked(self.0.sender.user_id)
        }
    }

    /// Role the sender had when sending this `Message`.
    pub fn sender_role(&self) -> api::user::Role {
        self.0.sender.role.into()
    }

    /// Role this `Message` is addressed to.
    pub fn receiver_role(&self) -> api::user::Role {
        self.0.receiver.role.into()
    }

    /// Concrete `User` this `Message` is addressed to, if any.
    pub fn receiver(&self) -> Option<api::User> {
        self.0.receiver.user_id.map(|id| {
            #[expect(
                unsafe_code,
                reason = "`Message` loaded from repository guarantees \
                          receiver existence"
            )]
            unsafe {
                api::User::new_unchecked(id)
            }
        })
    }

    /// Text of this `Message`.
    pub fn content(&self) -> Content {
        self.0.content.clone().into()
    }

    /// Files attached to this `Message`.
    pub fn attachments(&self) -> Vec<Attachment> {
        self.0.attachments.iter().cloned().map(Into::into).collect()
    }

    /// IDs of the `User`s who have read this `Message`.
    pub fn read_by(&self) -> Vec<api::user::Id> {
        self.0.read_by.iter().map(|r| r.user_id.into()).collect()
    }

    /// `DateTime` when this `Message` was sent.
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

/// Unique identifier of a `Message`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::message::Id)]
#[into(domain::message::Id)]
#[graphql(name = "MessageId", transparent)]
pub struct Id(Uuid);

/// Text of a `Message`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "MessageContent",
    with = scalar::Via::<domain::message::Content>,
)]
pub struct Content(domain::message::Content);

/// File attached to a `Message`.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(name = "MessageAttachment")]
pub struct Attachment {
    /// Original file name.
    pub name: String,

    /// URL the file is stored under.
    pub url: String,

    /// MIME type of the file.
    pub mime: String,

    /// Indicator whether the file is an image.
    pub is_image: bool,
}

impl From<domain::message::Attachment> for Attachment {
    fn from(attachment: domain::message::Attachment) -> Self {
        let is_image = attachment.is_image();
        let domain::message::Attachment { name, url, mime } = attachment;
        Self {
            name,
            url,
            mime,
            is_image,
        }
    }
}

/// File to attach to a new `Message`.
#[derive(Clone, Debug, GraphQLInputObject)]
#[graphql(name = "MessageAttachmentInput")]
pub struct AttachmentInput {
    /// Original file name.
    pub name: String,

    /// URL the file is stored under.
    pub url: String,

    /// MIME type of the file.
    pub mime: String,
}

impl From<AttachmentInput> for domain::message::Attachment {
    fn from(input: AttachmentInput) -> Self {
        let AttachmentInput { name, url, mime } = input;
        Self { name, url, mime }
    }
}
