//! [`Command`] for marking a [`Message`] as read.

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{Meldung, User};
use crate::{
    domain::{meldung, message, user, Message},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for marking a [`Message`] as read by a [`User`] having access
/// to its [`Meldung`].
///
/// Marking a [`Message`] twice keeps the first read receipt.
#[derive(Clone, Copy, Debug)]
pub struct MarkMessageRead {
    /// ID of the [`User`] who read the [`Message`].
    pub user_id: user::Id,

    /// [`user::Role`] of the [`User`].
    pub role: user::Role,

    /// ID of the read [`Message`].
    pub message_id: message::Id,
}

impl<Db, Bill> Command<MarkMessageRead> for Service<Db, Bill>
where
    Db: Database<
            Select<By<Option<Message>, message::Id>>,
            Ok = Option<Message>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<read::meldung::Chain, meldung::Id>>,
            Ok = read::meldung::Chain,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Message, message::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Message>, message::Id>>,
            Ok = Option<Message>,
            Err = Traced<database::Error>,
        > + Database<Update<Message>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Message;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: MarkMessageRead,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let MarkMessageRead {
            user_id,
            role,
            message_id,
        } = cmd;

        let meldung_id = self
            .database()
            .execute(Select(By::<Option<Message>, _>::new(message_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::MessageNotExists(message_id))
            .map_err(tracerr::wrap!())?
            .meldung_id;
        let granted = self
            .database()
            .execute(Select(By::<read::meldung::Chain, _>::new(meldung_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .grants(user_id, role);
        if !granted {
            return Err(tracerr::new!(E::Forbidden(message_id)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `Message`.
        tx.execute(Lock(By::new(message_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut message = tx
            .execute(Select(By::<Option<Message>, _>::new(message_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::MessageNotExists(message_id))
            .map_err(tracerr::wrap!())?;
        if message.mark_read(user_id) {
            tx.execute(Update(message.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
        }

        Ok(message)
    }
}

/// Error of [`MarkMessageRead`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Message`] doesn't exist.
    #[display("`Message(id: {_0})` does not exist")]
    #[from(ignore)]
    MessageNotExists(#[error(not(source))] message::Id),

    /// [`User`] has no access to the [`Meldung`] of the [`Message`].
    #[display("`Message(id: {_0})` is not accessible")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] message::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::SendMessage,
        domain::{
            meldung,
            message::{self, Receiver},
            property, unit, user,
        },
        infra::Notice,
        spec::service,
        Command as _,
    };

    use super::{ExecutionError, MarkMessageRead};

    #[tokio::test]
    async fn thread_participants_exchange_messages() {
        let (svc, mut inbox) = service();
        let owner = user::spec::with_role(user::Role::Landlord);
        let property = property::spec::owned_by(owner.id);
        let unit = unit::spec::vacant(property.id);
        let (reporter, craftsman) = (user::Id::new(), user::Id::new());
        let mut meldung = meldung::spec::filed(unit.id, reporter);
        meldung.assigned_to = Some(craftsman);
        svc.database().put(owner);
        svc.database().put(property);
        svc.database().put(unit);
        svc.database().put(meldung.clone());

        let sent = svc
            .execute(SendMessage {
                sender_id: reporter,
                role: user::Role::Tenant,
                meldung_id: meldung.id,
                receiver: Receiver {
                    role: user::Role::Craftsman,
                    user_id: Some(craftsman),
                },
                content: message::Content::new("Wann kommen Sie?").unwrap(),
                attachments: vec![],
            })
            .await
            .unwrap();
        let [Notice::Report { recipient_id, .. }] =
            <[Notice; 1]>::try_from(inbox.drain()).unwrap()
        else {
            panic!("expected a single report notice");
        };
        assert_eq!(recipient_id, craftsman);

        for _ in 0..2 {
            let read = svc
                .execute(MarkMessageRead {
                    user_id: craftsman,
                    role: user::Role::Craftsman,
                    message_id: sent.id,
                })
                .await
                .unwrap();
            assert_eq!(read.read_by.len(), 1);
        }

        let err = svc
            .execute(MarkMessageRead {
                user_id: user::Id::new(),
                role: user::Role::Tenant,
                message_id: sent.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Forbidden(_)));
    }
}
