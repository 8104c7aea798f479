//! [`Command`] for filing a new [`Meldung`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::Unit;
use crate::{
    domain::{meldung, user, Meldung, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for filing a new [`Meldung`] by a tenant [`User`] against the
/// [`Unit`] the tenant lives in.
#[derive(Clone, Debug)]
pub struct CreateMeldung {
    /// ID of the tenant [`User`] filing the [`Meldung`].
    pub reporter_id: user::Id,

    /// [`meldung::Title`] of the new [`Meldung`].
    pub title: meldung::Title,

    /// [`meldung::Description`] of the new [`Meldung`].
    pub description: meldung::Description,

    /// [`meldung::Priority`] of the new [`Meldung`].
    pub priority: meldung::Priority,

    /// Images attached to the new [`Meldung`].
    pub images: Vec<meldung::ImageUrl>,

    /// Estimated cost of the repair, if known.
    pub estimated_cost: Option<Money>,
}

impl<Db, Bill> Command<CreateMeldung> for Service<Db, Bill>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Insert<Meldung>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Meldung;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateMeldung,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateMeldung {
            reporter_id,
            title,
            description,
            priority,
            images,
            estimated_cost,
        } = cmd;

        if estimated_cost.is_some_and(|c| c.is_negative()) {
            return Err(tracerr::new!(E::NegativeCost));
        }

        let reporter = self
            .database()
            .execute(Select(By::new(reporter_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(reporter_id))
            .map_err(tracerr::wrap!())?;
        if reporter.role() != user::Role::Tenant {
            return Err(tracerr::new!(E::NotTenant(reporter_id)));
        }
        let unit_id = reporter
            .assigned_unit()
            .ok_or(E::NoUnit(reporter_id))
            .map_err(tracerr::wrap!())?;

        let now = DateTime::now();
        let meldung = Meldung {
            id: meldung::Id::new(),
            unit_id,
            reporter_id,
            assigned_to: None,
            title,
            description,
            status: meldung::Status::INITIAL,
            priority,
            notes: vec![],
            images,
            estimated_cost,
            actual_cost: None,
            scheduled_for: None,
            created_at: now.coerce(),
            updated_at: now.coerce(),
            completed_at: None,
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(meldung.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(meldung)
    }
}

/// Error of [`CreateMeldung`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),

    /// [`User`] is not a tenant.
    #[display("`User(id: {_0})` is not a tenant")]
    #[from(ignore)]
    NotTenant(#[error(not(source))] user::Id),

    /// Tenant [`User`] doesn't live in any [`Unit`].
    #[display("`User(id: {_0})` has no `Unit` assigned")]
    #[from(ignore)]
    NoUnit(#[error(not(source))] user::Id),

    /// Estimated cost is negative.
    #[display("Estimated cost cannot be negative")]
    NegativeCost,
}
