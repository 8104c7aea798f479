//! [`Property`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        property::{self, Address},
        user, Property,
    },
    infra::{
        database::{
            self,
            postgres::{Connection, Postgres},
        },
        Database,
    },
};

/// Decodes a [`Property`] from a `properties` [`Row`].
fn from_row(row: &Row) -> Property {
    Property {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        address: Address {
            street: row.get("street"),
            zip_code: row.get("zip_code"),
            city: row.get("city"),
        },
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Property>, property::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Property>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Property>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id, owner_id, name, \
                   street, zip_code, city, \
                   created_at \
            FROM properties \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Property>, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Property>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Property>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let owner_id = by.into_inner();

        const SQL: &str = "\
            SELECT id, owner_id, name, \
                   street, zip_code, city, \
                   created_at \
            FROM properties \
            WHERE owner_id = $1::UUID \
            ORDER BY created_at ASC";
        Ok(self
            .query(SQL, &[&owner_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Property>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(property): Insert<Property>,
    ) -> Result<Self::Ok, Self::Err> {
        let Property {
            id,
            owner_id,
            name,
            address,
            created_at,
        } = property;

        const SQL: &str = "\
            INSERT INTO properties (\
                id, owner_id, name, \
                street, zip_code, city, \
                created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::VARCHAR, \
                $4::VARCHAR, $5::VARCHAR, $6::VARCHAR, \
                $7::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &owner_id,
                &name,
                &address.street,
                &address.zip_code,
                &address.city,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<property::TotalUnits, property::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = property::TotalUnits;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<property::TotalUnits, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT COUNT(*) AS count \
            FROM units \
            WHERE property_id = $1::UUID";
        let row = self
            .query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?;
        Ok(row.first().map(super::count).unwrap_or_default().into())
    }
}
