//! [`Notification`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select, Update};
use postgres_types::Json;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{message::Receipt, notification, property, Notification},
    infra::{
        database::{
            self,
            postgres::{Connection, Postgres},
        },
        Database,
    },
};

/// Columns of the `notifications` table, in the order [`from_row()`]
/// expects.
const COLUMNS: &str = "\
    id, property_id, kind, priority, title, message, \
    creator_id, meldung_id, read_by, created_at";

/// Decodes a [`Notification`] from a `notifications` [`Row`].
fn from_row(row: &Row) -> Notification {
    let Json(read_by) = row.get::<_, Json<Vec<Receipt>>>("read_by");
    Notification {
        id: row.get("id"),
        property_id: row.get("property_id"),
        kind: row.get("kind"),
        priority: row.get("priority"),
        title: row.get("title"),
        message: row.get("message"),
        creator_id: row.get("creator_id"),
        meldung_id: row.get("meldung_id"),
        read_by,
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Notification>, notification::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Notification>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Notification>, notification::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} FROM notifications WHERE id = $1::UUID",
        );
        Ok(self
            .query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Notification>, property::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Notification>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Notification>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let property_id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM notifications \
             WHERE property_id = $1::UUID \
             ORDER BY created_at DESC",
        );
        Ok(self
            .query(sql.as_str(), &[&property_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Notification>> for Postgres<C>
where
    C: Connection,
    Self:
        Database<Update<Notification>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(notification): Insert<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(notification))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Notification>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(notification): Update<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        let Notification {
            id,
            property_id,
            kind,
            priority,
            title,
            message,
            creator_id,
            meldung_id,
            read_by,
            created_at,
        } = notification;

        const SQL: &str = "\
            INSERT INTO notifications (\
                id, property_id, kind, priority, title, message, \
                creator_id, meldung_id, read_by, created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::INT2, $4::INT2, \
                $5::VARCHAR, $6::TEXT, \
                $7::UUID, $8::UUID, $9::JSONB, $10::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET read_by = EXCLUDED.read_by";
        self.exec(
            SQL,
            &[
                &id,
                &property_id,
                &kind,
                &priority,
                &title,
                &message,
                &creator_id,
                &meldung_id,
                &Json(&read_by),
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Notification, notification::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Notification, notification::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO notifications_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
