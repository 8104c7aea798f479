//! [`Command`] for posting a [`Message`] into a [`Meldung`] thread.

use common::operations::{By, Commit, Insert, Select, Transact, Transacted};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::Meldung;
use crate::{
    domain::{
        meldung,
        message::{self, Attachment, Receiver, Sender},
        user, Message,
    },
    infra::{database, Database, Notice},
    read, Service,
};

use super::Command;

/// [`Command`] for posting a [`Message`] into the thread of a [`Meldung`]
/// accessible by the sender.
///
/// A concrete receiver [`User`] is notified once the [`Message`] is stored.
///
/// [`User`]: crate::domain::User
#[derive(Clone, Debug)]
pub struct SendMessage {
    /// ID of the [`User`] sending the [`Message`].
    ///
    /// [`User`]: crate::domain::User
    pub sender_id: user::Id,

    /// [`user::Role`] of the sender.
    pub role: user::Role,

    /// ID of the [`Meldung`] the [`Message`] is about.
    pub meldung_id: meldung::Id,

    /// [`Receiver`] of the [`Message`].
    pub receiver: Receiver,

    /// [`message::Content`] of the [`Message`].
    pub content: message::Content,

    /// [`Attachment`]s of the [`Message`].
    pub attachments: Vec<Attachment>,
}

impl<Db, Bill> Command<SendMessage> for Service<Db, Bill>
where
    Db: Database<
            Select<By<read::meldung::Chain, meldung::Id>>,
            Ok = read::meldung::Chain,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Insert<Message>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Message;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: SendMessage) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SendMessage {
            sender_id,
            role,
            meldung_id,
            receiver,
            content,
            attachments,
        } = cmd;

        let chain = self
            .database()
            .execute(Select(By::new(meldung_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let Some(meldung) = chain.meldung.as_ref() else {
            return Err(tracerr::new!(E::MeldungNotExists(meldung_id)));
        };
        if !chain.grants(sender_id, role) {
            return Err(tracerr::new!(E::Forbidden(meldung_id)));
        }
        let title = meldung.title.clone();

        let message = Message {
            id: message::Id::new(),
            meldung_id,
            sender: Sender {
                user_id: sender_id,
                role,
            },
            receiver,
            content,
            attachments,
            read_by: vec![],
            created_at: message::CreationDateTime::now(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(message.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        if let Some(recipient_id) =
            receiver.user_id.filter(|id| *id != sender_id)
        {
            self.outbox().dispatch(Notice::Report {
                recipient_id,
                title: "Neue Nachricht".into(),
                message: format!("Neue Nachricht zu \"{title}\"."),
                meldung_id,
            });
        }

        Ok(message)
    }
}

/// Error of [`SendMessage`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Meldung`] doesn't exist.
    #[display("`Meldung(id: {_0})` does not exist")]
    #[from(ignore)]
    MeldungNotExists(#[error(not(source))] meldung::Id),

    /// Sender has no access to the [`Meldung`].
    #[display("`Meldung(id: {_0})` is not accessible")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] meldung::Id),
}
