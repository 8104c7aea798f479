//! [`Command`] for appending a [`Note`] to a [`Meldung`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        meldung::{self, Note},
        user, Meldung,
    },
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for appending a [`Note`] to the audit trail of a [`Meldung`]
/// accessible by the author.
#[derive(Clone, Debug)]
pub struct AddMeldungNote {
    /// ID of the [`User`] writing the [`Note`].
    ///
    /// [`User`]: crate::domain::User
    pub user_id: user::Id,

    /// [`user::Role`] of the [`User`] writing the [`Note`].
    ///
    /// [`User`]: crate::domain::User
    pub role: user::Role,

    /// ID of the [`Meldung`] to append the [`Note`] to.
    pub meldung_id: meldung::Id,

    /// [`meldung::NoteText`] of the [`Note`].
    pub text: meldung::NoteText,
}

impl<Db, Bill> Command<AddMeldungNote> for Service<Db, Bill>
where
    Db: Database<
            Select<By<read::meldung::Chain, meldung::Id>>,
            Ok = read::meldung::Chain,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Meldung, meldung::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Meldung>, meldung::Id>>,
            Ok = Option<Meldung>,
            Err = Traced<database::Error>,
        > + Database<Update<Meldung>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Meldung;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AddMeldungNote,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AddMeldungNote {
            user_id,
            role,
            meldung_id,
            text,
        } = cmd;

        let chain = self
            .database()
            .execute(Select(By::new(meldung_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if chain.meldung.is_none() {
            return Err(tracerr::new!(E::MeldungNotExists(meldung_id)));
        }
        if !chain.grants(user_id, role) {
            return Err(tracerr::new!(E::Forbidden(meldung_id)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `Meldung`.
        tx.execute(Lock(By::new(meldung_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut meldung = tx
            .execute(Select(By::<Option<Meldung>, _>::new(meldung_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::MeldungNotExists(meldung_id))
            .map_err(tracerr::wrap!())?;
        meldung.add_note(Note::new(text, user_id));
        tx.execute(Update(meldung.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(meldung)
    }
}

/// Error of [`AddMeldungNote`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Meldung`] doesn't exist.
    #[display("`Meldung(id: {_0})` does not exist")]
    #[from(ignore)]
    MeldungNotExists(#[error(not(source))] meldung::Id),

    /// Author has no access to the [`Meldung`].
    #[display("`Meldung(id: {_0})` is not accessible")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] meldung::Id),
}
