//! [`Command`] for assigning a craftsman to a [`Meldung`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        meldung::{self, InvalidTransition},
        user, Meldung, User,
    },
    infra::{database, Database, Notice},
    Service,
};

use super::Command;

/// [`Command`] for assigning a craftsman [`User`] to a [`Meldung`], putting
/// it into [`meldung::Status::InBearbeitung`].
///
/// The assigned craftsman is notified once the assignment is committed.
#[derive(Clone, Copy, Debug)]
pub struct AssignMeldung {
    /// ID of the [`User`] assigning.
    pub user_id: user::Id,

    /// [`user::Role`] of the [`User`] assigning.
    pub role: user::Role,

    /// ID of the [`Meldung`] to be assigned.
    pub meldung_id: meldung::Id,

    /// ID of the craftsman [`User`] to assign.
    pub craftsman_id: user::Id,
}

impl<Db, Bill> Command<AssignMeldung> for Service<Db, Bill>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
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
        cmd: AssignMeldung,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AssignMeldung {
            user_id,
            role,
            meldung_id,
            craftsman_id,
        } = cmd;

        if role != user::Role::Landlord {
            return Err(tracerr::new!(E::Forbidden(user_id)));
        }
        let is_craftsman = self
            .database()
            .execute(Select(By::new(craftsman_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .is_some_and(|u| u.role() == user::Role::Craftsman);
        if !is_craftsman {
            return Err(tracerr::new!(E::NotCraftsman(craftsman_id)));
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
        meldung
            .assign(craftsman_id)
            .map_err(tracerr::from_and_wrap!(=> E))?;
        tx.execute(Update(meldung.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        self.outbox().dispatch(Notice::Report {
            recipient_id: craftsman_id,
            title: "Neuer Auftrag".into(),
            message: format!("Ihnen wurde \"{}\" zugewiesen.", meldung.title),
            meldung_id,
        });

        Ok(meldung)
    }
}

/// Error of [`AssignMeldung`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] is not allowed to assign.
    #[display("`User(id: {_0})` is not allowed to assign craftsmen")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] user::Id),

    /// Assignee is not a craftsman [`User`].
    #[display("`User(id: {_0})` is not a craftsman")]
    #[from(ignore)]
    NotCraftsman(#[error(not(source))] user::Id),

    /// [`Meldung`] doesn't exist.
    #[display("`Meldung(id: {_0})` does not exist")]
    #[from(ignore)]
    MeldungNotExists(#[error(not(source))] meldung::Id),

    /// [`Meldung`] is closed already.
    #[display("Cannot assign: {_0}")]
    InvalidTransition(InvalidTransition),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{meldung, unit, user},
        infra::Notice,
        spec::service,
        Command as _,
    };

    use super::{AssignMeldung, ExecutionError};

    #[tokio::test]
    async fn assigns_and_notifies_craftsman() {
        let (svc, mut inbox) = service();
        let craftsman = user::spec::with_role(user::Role::Craftsman);
        let meldung = meldung::spec::filed(unit::Id::new(), user::Id::new());
        svc.database().put(craftsman.clone());
        svc.database().put(meldung.clone());

        let assigned = svc
            .execute(AssignMeldung {
                user_id: user::Id::new(),
                role: user::Role::Landlord,
                meldung_id: meldung.id,
                craftsman_id: craftsman.id,
            })
            .await
            .unwrap();

        assert_eq!(assigned.status, meldung::Status::InBearbeitung);
        assert_eq!(assigned.assigned_to, Some(craftsman.id));
        assert_eq!(svc.database().committed().meldungen[&meldung.id], assigned);
        let [Notice::Report { recipient_id, .. }] =
            <[Notice; 1]>::try_from(inbox.drain()).unwrap()
        else {
            panic!("expected a single report notice");
        };
        assert_eq!(recipient_id, craftsman.id);
    }

    #[tokio::test]
    async fn rejects_non_craftsman_assignee() {
        let (svc, _) = service();
        let tenant = user::spec::with_role(user::Role::Tenant);
        let meldung = meldung::spec::filed(unit::Id::new(), tenant.id);
        svc.database().put(tenant.clone());
        svc.database().put(meldung.clone());

        let err = svc
            .execute(AssignMeldung {
                user_id: user::Id::new(),
                role: user::Role::Landlord,
                meldung_id: meldung.id,
                craftsman_id: tenant.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotCraftsman(_)));
    }

    #[tokio::test]
    async fn only_landlords_assign() {
        let (svc, _) = service();
        let craftsman = user::spec::with_role(user::Role::Craftsman);
        let meldung = meldung::spec::filed(unit::Id::new(), user::Id::new());
        svc.database().put(craftsman.clone());
        svc.database().put(meldung.clone());

        let err = svc
            .execute(AssignMeldung {
                user_id: craftsman.id,
                role: user::Role::Craftsman,
                meldung_id: meldung.id,
                craftsman_id: craftsman.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::Forbidden(_)));
        assert_eq!(svc.database().committed().meldungen[&meldung.id], meldung);
    }

    #[tokio::test]
    async fn rejects_closed_meldung() {
        let (svc, mut inbox) = service();
        let craftsman = user::spec::with_role(user::Role::Craftsman);
        let mut meldung =
            meldung::spec::filed(unit::Id::new(), user::Id::new());
        meldung.status = meldung::Status::Storniert;
        svc.database().put(craftsman.clone());
        svc.database().put(meldung.clone());

        let err = svc
            .execute(AssignMeldung {
                user_id: user::Id::new(),
                role: user::Role::Landlord,
                meldung_id: meldung.id,
                craftsman_id: craftsman.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::InvalidTransition(_)));
        assert!(inbox.drain().is_empty());
    }
}
