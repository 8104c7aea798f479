//! [`Command`] for creating a new [`Unit`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{property, unit, user, Property, Unit},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new vacant [`Unit`] in a [`Property`].
#[derive(Clone, Debug)]
pub struct CreateUnit {
    /// ID of the landlord creating the [`Unit`].
    pub landlord_id: user::Id,

    /// ID of the [`Property`] the [`Unit`] is created in.
    pub property_id: property::Id,

    /// Label of the new [`Unit`].
    pub label: unit::Label,

    /// Floor of the new [`Unit`].
    pub floor: Option<unit::Floor>,

    /// Area of the new [`Unit`].
    pub area: Option<unit::Area>,

    /// Monthly rent of the new [`Unit`].
    pub rent: Option<Money>,
}

impl<Db, Bill> Command<CreateUnit> for Service<Db, Bill>
where
    Db: Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<Unit>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Unit;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateUnit) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUnit {
            landlord_id,
            property_id,
            label,
            floor,
            area,
            rent,
        } = cmd;

        let property = self
            .database()
            .execute(Select(By::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(property_id))
            .map_err(tracerr::wrap!())?;
        if property.owner_id != landlord_id {
            return Err(tracerr::new!(E::NotOwner(property_id)));
        }
        if rent.is_some_and(|r| r.is_negative()) {
            return Err(tracerr::new!(E::NegativeRent));
        }

        let unit = Unit {
            id: unit::Id::new(),
            property_id,
            label,
            floor,
            area,
            rent,
            status: unit::Status::Vacant,
            current_tenant: None,
            pending_tenant: None,
            lease_start: None,
            created_at: DateTime::now().coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(unit.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(unit)
    }
}

/// Error of [`CreateUnit`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Property`] doesn't exist.
    #[display("`Property(id: {_0})` does not exist")]
    #[from(ignore)]
    PropertyNotExists(#[error(not(source))] property::Id),

    /// [`Property`] is owned by someone else.
    #[display("`Property(id: {_0})` is not owned by the landlord")]
    #[from(ignore)]
    NotOwner(#[error(not(source))] property::Id),

    /// Rent is negative.
    #[display("Rent cannot be negative")]
    NegativeRent,
}

#[cfg(test)]
mod spec {
    use crate::{
        command::create_tenant::spec::fixture,
        domain::{unit, user},
        Command as _,
    };

    use super::{CreateUnit, ExecutionError};

    #[tokio::test]
    async fn creates_vacant_unit() {
        let (svc, _, property, _) = fixture();

        let created = svc
            .execute(CreateUnit {
                landlord_id: property.owner_id,
                property_id: property.id,
                label: unit::Label::new("WE 2").unwrap(),
                floor: Some(-1),
                area: None,
                rent: Some("750EUR".parse().unwrap()),
            })
            .await
            .unwrap();

        let stored = &svc.database().committed().units[&created.id];
        assert_eq!(stored.status, unit::Status::Vacant);
        assert_eq!(stored.floor, Some(-1));
        assert_eq!(stored.current_tenant, None);
    }

    #[tokio::test]
    async fn rejects_negative_rent() {
        let (svc, _, property, _) = fixture();

        let err = svc
            .execute(CreateUnit {
                landlord_id: property.owner_id,
                property_id: property.id,
                label: unit::Label::new("WE 2").unwrap(),
                floor: None,
                area: None,
                rent: Some("-10EUR".parse().unwrap()),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NegativeRent));
    }

    #[tokio::test]
    async fn rejects_foreign_property() {
        let (svc, _, property, _) = fixture();

        let err = svc
            .execute(CreateUnit {
                landlord_id: user::Id::new(),
                property_id: property.id,
                label: unit::Label::new("WE 2").unwrap(),
                floor: None,
                area: None,
                rent: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotOwner(_)));
    }
}
