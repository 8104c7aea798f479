//! [`Command`] for moving a [`Meldung`] through its workflow.

use common::{
    operations::{
        By, Commit, Insert, Lock, Select, Transact, Transacted, Update,
    },
    Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        meldung::{self, InvalidTransition, Note},
        notification, user, Meldung, Notification,
    },
    infra::{database, Database, Notice},
    read, Service,
};

use super::Command;

/// [`Command`] for changing the [`meldung::Status`] of a [`Meldung`] on
/// behalf of a [`User`].
///
/// A craftsman may only move the [`Meldung`]s assigned to them, and a tenant
/// only the ones they have filed. Entering
/// [`meldung::Status::HandwerkerErledigt`] notifies the owner of the
/// [`Property`] once committed.
///
/// [`Property`]: crate::domain::Property
/// [`User`]: crate::domain::User
#[derive(Clone, Debug)]
pub struct UpdateMeldungStatus {
    /// ID of the [`User`] changing the status.
    ///
    /// [`User`]: crate::domain::User
    pub user_id: user::Id,

    /// [`user::Role`] of the [`User`] changing the status.
    ///
    /// [`User`]: crate::domain::User
    pub role: user::Role,

    /// ID of the [`Meldung`] to change.
    pub meldung_id: meldung::Id,

    /// Desired [`meldung::Status`].
    pub status: meldung::Status,

    /// Remarks appended as a [`Note`] along with the change.
    pub note: Option<meldung::NoteText>,

    /// Actual cost of the repair, reported on completion.
    pub actual_cost: Option<Money>,
}

impl<Db, Bill> Command<UpdateMeldungStatus> for Service<Db, Bill>
where
    Db: Database<
            Select<By<read::meldung::Chain, meldung::Id>>,
            Ok = read::meldung::Chain,
            Err = Traced<database::Error>,
        > + Database<
            Insert<Notification>,
            Ok = (),
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
        cmd: UpdateMeldungStatus,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateMeldungStatus {
            user_id,
            role,
            meldung_id,
            status,
            note,
            actual_cost,
        } = cmd;

        if actual_cost.is_some_and(|c| c.is_negative()) {
            return Err(tracerr::new!(E::NegativeCost));
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
        let permitted = match role {
            user::Role::Craftsman => meldung.assigned_to == Some(user_id),
            user::Role::Tenant => meldung.reporter_id == user_id,
            user::Role::Landlord => true,
        };
        if !permitted {
            return Err(tracerr::new!(E::Forbidden(meldung_id)));
        }

        let status = meldung
            .status
            .transition(role, status)
            .map_err(tracerr::from_and_wrap!(=> E))?;
        meldung.apply_status(status);
        if let Some(text) = note {
            meldung.add_note(Note::new(text, user_id));
        }
        if actual_cost.is_some() {
            meldung.actual_cost = actual_cost;
        }
        tx.execute(Update(meldung.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        if status == meldung::Status::HandwerkerErledigt {
            self.notify_owner(&meldung, user_id).await;
        }

        Ok(meldung)
    }
}

impl<Db, Bill> Service<Db, Bill>
where
    Db: Database<
            Select<By<read::meldung::Chain, meldung::Id>>,
            Ok = read::meldung::Chain,
            Err = Traced<database::Error>,
        > + Database<
            Insert<Notification>,
            Ok = (),
            Err = Traced<database::Error>,
        >,
{
    /// Tells the owner of the [`Property`] that the work on the provided
    /// [`Meldung`] is done, by a [`Notification`] on the [`Property`] and a
    /// [`Notice`].
    ///
    /// Never fails, as the [`Meldung`] is changed already.
    ///
    /// [`Property`]: crate::domain::Property
    async fn notify_owner(&self, meldung: &Meldung, craftsman_id: user::Id) {
        let property = match self
            .database()
            .execute(Select(By::<read::meldung::Chain, _>::new(meldung.id)))
            .await
        {
            Ok(chain) => chain.property,
            Err(e) => {
                log::warn!(
                    "failed to resolve owner of `Meldung(id: {})`: {e}",
                    meldung.id,
                );
                return;
            }
        };
        let Some(property) = property else {
            log::warn!("`Meldung(id: {})` has no owner to notify", meldung.id);
            return;
        };

        let message = format!(
            "Der Handwerker hat \"{}\" als erledigt gemeldet.",
            meldung.title,
        );
        let notification = notification::Title::new(DONE_TITLE)
            .zip(notification::Text::new(message.clone()))
            .map(|(title, text)| Notification {
                id: notification::Id::new(),
                property_id: property.id,
                kind: notification::Kind::Maintenance,
                priority: notification::Priority::Medium,
                title,
                message: text,
                creator_id: craftsman_id,
                meldung_id: Some(meldung.id),
                read_by: vec![],
                created_at: notification::CreationDateTime::now(),
            });
        if let Some(notification) = notification {
            let id = notification.id;
            if let Err(e) =
                self.database().execute(Insert(notification)).await
            {
                log::warn!(
                    "failed to store `Notification(id: {id})` about \
                     `Meldung(id: {})`: {e}",
                    meldung.id,
                );
            }
        }

        self.outbox().dispatch(Notice::Report {
            recipient_id: property.owner_id,
            title: DONE_TITLE.into(),
            message,
            meldung_id: meldung.id,
        });
    }
}

/// Title of what the owner is told once the work is done.
const DONE_TITLE: &str = "Meldung erledigt";

/// Error of [`UpdateMeldungStatus`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Meldung`] doesn't exist.
    #[display("`Meldung(id: {_0})` does not exist")]
    #[from(ignore)]
    MeldungNotExists(#[error(not(source))] meldung::Id),

    /// [`Meldung`] is neither assigned to nor filed by the craftsman or
    /// tenant.
    #[display("`Meldung(id: {_0})` cannot be changed by the `User`")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] meldung::Id),

    /// Transition is not allowed for the [`user::Role`].
    #[display("{_0}")]
    InvalidTransition(InvalidTransition),

    /// Reported cost is negative.
    #[display("Cost cannot be negative")]
    NegativeCost,
}

#[cfg(test)]
mod spec {
    use common::Money;

    use crate::{
        domain::{meldung, notification, property, unit, user, Meldung},
        infra::Notice,
        spec::{service, TestService},
        task, Command as _,
    };

    use super::{ExecutionError, UpdateMeldungStatus};

    struct Fixture {
        svc: TestService,
        inbox: task::Inbox,
        meldung: Meldung,
        owner: user::Id,
        property: property::Id,
        craftsman: user::Id,
    }

    fn fixture(status: meldung::Status) -> Fixture {
        let (svc, inbox) = service();
        let owner = user::spec::with_role(user::Role::Landlord);
        let property = property::spec::owned_by(owner.id);
        let unit = unit::spec::vacant(property.id);
        let craftsman = user::Id::new();
        let mut meldung = meldung::spec::filed(unit.id, user::Id::new());
        meldung.assigned_to = Some(craftsman);
        meldung.status = status;
        let property_id = property.id;
        svc.database().put(owner.clone());
        svc.database().put(property);
        svc.database().put(unit);
        svc.database().put(meldung.clone());
        Fixture {
            svc,
            inbox,
            meldung,
            owner: owner.id,
            property: property_id,
            craftsman,
        }
    }

    fn update(
        user_id: user::Id,
        role: user::Role,
        meldung: &Meldung,
        status: meldung::Status,
    ) -> UpdateMeldungStatus {
        UpdateMeldungStatus {
            user_id,
            role,
            meldung_id: meldung.id,
            status,
            note: None,
            actual_cost: None,
        }
    }

    #[tokio::test]
    async fn done_work_notifies_owner() {
        let mut f = fixture(meldung::Status::InBearbeitung);
        let mut cmd = update(
            f.craftsman,
            user::Role::Craftsman,
            &f.meldung,
            meldung::Status::HandwerkerErledigt,
        );
        cmd.note = meldung::NoteText::new("Ventil getauscht");
        cmd.actual_cost = Some("120.50EUR".parse::<Money>().unwrap());

        let meldung = f.svc.execute(cmd).await.unwrap();

        assert_eq!(meldung.status, meldung::Status::HandwerkerErledigt);
        assert_eq!(meldung.notes.len(), 1);
        assert_eq!(meldung.notes[0].author_id, f.craftsman);
        assert_eq!(meldung.actual_cost.unwrap().to_string(), "120.5EUR");
        let [Notice::Report {
            recipient_id,
            meldung_id,
            ..
        }] = <[Notice; 1]>::try_from(f.inbox.drain()).unwrap()
        else {
            panic!("expected a single report notice");
        };
        assert_eq!(recipient_id, f.owner);
        assert_eq!(meldung_id, f.meldung.id);

        let stored = f.svc.database().committed().notifications;
        let [notification] = stored.values().collect::<Vec<_>>()[..] else {
            panic!("expected a single stored notification");
        };
        assert_eq!(notification.property_id, f.property);
        assert_eq!(notification.kind, notification::Kind::Maintenance);
        assert_eq!(notification.meldung_id, Some(f.meldung.id));
        assert_eq!(notification.creator_id, f.craftsman);
        assert!(notification.read_by.is_empty());
    }

    #[tokio::test]
    async fn unstored_notification_keeps_transition() {
        let mut f = fixture(meldung::Status::InBearbeitung);
        f.svc.database().fail_on("Insert<Notification>");

        let meldung = f
            .svc
            .execute(update(
                f.craftsman,
                user::Role::Craftsman,
                &f.meldung,
                meldung::Status::HandwerkerErledigt,
            ))
            .await
            .unwrap();

        assert_eq!(meldung.status, meldung::Status::HandwerkerErledigt);
        let state = f.svc.database().committed();
        assert_eq!(state.meldungen[&f.meldung.id], meldung);
        assert!(state.notifications.is_empty());
        assert_eq!(f.inbox.drain().len(), 1);
    }

    #[tokio::test]
    async fn foreign_craftsman_is_forbidden() {
        let f = fixture(meldung::Status::InBearbeitung);

        let err = f
            .svc
            .execute(update(
                user::Id::new(),
                user::Role::Craftsman,
                &f.meldung,
                meldung::Status::HandwerkerErledigt,
            ))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::Forbidden(_)));
    }

    #[tokio::test]
    async fn craftsman_cannot_skip_steps() {
        let f = fixture(meldung::Status::Offen);

        let err = f
            .svc
            .execute(update(
                f.craftsman,
                user::Role::Craftsman,
                &f.meldung,
                meldung::Status::HandwerkerErledigt,
            ))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::InvalidTransition(_)));
        let stored = &f.svc.database().committed().meldungen[&f.meldung.id];
        assert_eq!(stored, &f.meldung);
    }

    #[tokio::test]
    async fn tenant_confirms_completion() {
        let mut f = fixture(meldung::Status::HandwerkerErledigt);

        let meldung = f
            .svc
            .execute(update(
                f.meldung.reporter_id,
                user::Role::Tenant,
                &f.meldung,
                meldung::Status::Abgeschlossen,
            ))
            .await
            .unwrap();

        assert_eq!(meldung.status, meldung::Status::Abgeschlossen);
        assert!(meldung.completed_at.is_some());
        assert!(f.inbox.drain().is_empty());
    }

    #[tokio::test]
    async fn landlord_cancels_from_any_state() {
        for from in [meldung::Status::Offen, meldung::Status::Abgeschlossen] {
            let f = fixture(from);

            let meldung = f
                .svc
                .execute(update(
                    f.owner,
                    user::Role::Landlord,
                    &f.meldung,
                    meldung::Status::Storniert,
                ))
                .await
                .unwrap();

            assert_eq!(meldung.status, meldung::Status::Storniert);
        }
    }
}
