//! [`Query`] collection related to [`Unit`]s.

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{property, unit, Unit},
    infra::{database, Database},
    read, Query, Service,
};

use super::DatabaseQuery;

/// Queries a [`Unit`] by its [`unit::Id`].
pub type ById = DatabaseQuery<By<Option<Unit>, unit::Id>>;

/// Queries all the [`Unit`]s of a [`Property`], ordered by their labels.
///
/// [`Property`]: crate::domain::Property
pub type List = DatabaseQuery<By<Vec<Unit>, property::Id>>;

/// [`Query`] checking whether a [`Unit`] is occupied, either by its status
/// or by a current tenant.
#[derive(Clone, Copy, Debug)]
pub struct IsOccupied {
    /// ID of the [`Unit`] to check.
    pub unit_id: unit::Id,
}

impl<Db, Bill> Query<IsOccupied> for Service<Db, Bill>
where
    Db: Database<
        Select<By<Option<Unit>, unit::Id>>,
        Ok = Option<Unit>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = read::unit::IsOccupied;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        IsOccupied { unit_id }: IsOccupied,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let unit = self
            .database()
            .execute(Select(By::<Option<Unit>, _>::new(unit_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UnitNotExists(unit_id))
            .map_err(tracerr::wrap!())?;

        Ok(read::unit::IsOccupied(unit.is_occupied()))
    }
}

/// Error of [`IsOccupied`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Unit`] doesn't exist.
    #[display("`Unit(id: {_0})` does not exist")]
    #[from(ignore)]
    UnitNotExists(#[error(not(source))] unit::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{property, unit, user},
        spec::service,
        Query as _,
    };

    use super::{ExecutionError, IsOccupied};

    #[tokio::test]
    async fn occupied_by_tenant_or_status() {
        let (svc, _) = service();
        let property = property::spec::owned_by(user::Id::new());
        let vacant = unit::spec::vacant(property.id);
        let mut inhabited = unit::spec::vacant(property.id);
        inhabited.current_tenant = Some(user::Id::new());
        let mut flagged = unit::spec::vacant(property.id);
        flagged.status = unit::Status::Occupied;
        for u in [&vacant, &inhabited, &flagged] {
            svc.database().put(u.clone());
        }

        let cases = [(vacant, false), (inhabited, true), (flagged, true)];
        for (u, expected) in cases {
            let occupied = svc
                .execute(IsOccupied { unit_id: u.id })
                .await
                .unwrap();
            assert_eq!(occupied, expected, "`Unit(label: {})`", u.label);
        }

        let err = svc
            .execute(IsOccupied {
                unit_id: unit::Id::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::UnitNotExists(_)));
    }
}
