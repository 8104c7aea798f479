//! [`Meldung`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Insert, Lock, Select, Update};
use itertools::Itertools as _;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        meldung::{self, status, Note},
        property, unit, user, Meldung, Property, Unit, User,
    },
    infra::{
        database::{
            self,
            postgres::{Connection, Postgres},
        },
        Database,
    },
    read,
};

/// Columns of the `meldungen` table, in the order [`from_row()`] expects.
const COLUMNS: &str = "\
    m.id, m.unit_id, m.reporter_id, m.assigned_to, \
    m.title, m.description, m.status, m.priority, m.images, \
    m.estimated_cost, m.actual_cost, m.scheduled_for, \
    m.created_at, m.updated_at, m.completed_at";

/// Decodes a [`Meldung`] without its [`Note`]s from a `meldungen` [`Row`].
fn from_row(row: &Row) -> Meldung {
    let raw_status = row.get::<_, &str>("status");
    let status = status::normalize(raw_status).unwrap_or_else(|e| {
        tracing::warn!(
            status = raw_status,
            "unknown `Meldung` status, treating as `{}`: {e}",
            meldung::Status::INITIAL,
        );
        meldung::Status::INITIAL
    });

    Meldung {
        id: row.get("id"),
        unit_id: row.get("unit_id"),
        reporter_id: row.get("reporter_id"),
        assigned_to: row.get("assigned_to"),
        title: row.get("title"),
        description: row.get("description"),
        status,
        priority: row.get("priority"),
        notes: vec![],
        images: row.get("images"),
        estimated_cost: row.get("estimated_cost"),
        actual_cost: row.get("actual_cost"),
        scheduled_for: row.get("scheduled_for"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        completed_at: row.get("completed_at"),
    }
}

impl<C: Connection> Postgres<C> {
    /// Loads [`Note`]s of the provided [`Meldung`]s, in the order they were
    /// written.
    async fn notes_of(
        &self,
        ids: Vec<meldung::Id>,
    ) -> Result<HashMap<meldung::Id, Vec<Note>>, Traced<database::Error>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT meldung_id, text, author_id, created_at \
            FROM meldung_notes \
            WHERE meldung_id = ANY($1::UUID[]) \
            ORDER BY meldung_id, position ASC";
        Ok(self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| {
                (
                    row.get::<_, meldung::Id>("meldung_id"),
                    Note {
                        text: row.get("text"),
                        author_id: row.get("author_id"),
                        created_at: row.get("created_at"),
                    },
                )
            })
            .into_group_map())
    }
}

impl<C> Database<Select<By<Option<Meldung>, meldung::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Meldung>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Meldung>, meldung::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM meldungen AS m \
             WHERE m.id = $1::UUID",
        );
        let Some(mut meldung) = self
            .query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row)
        else {
            return Ok(None);
        };
        meldung.notes = self
            .notes_of(vec![id])
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id)
            .unwrap_or_default();
        Ok(Some(meldung))
    }
}

impl<C> Database<Select<By<Vec<Meldung>, read::meldung::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Meldung>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Meldung>, read::meldung::list::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        use read::meldung::list::Selector as S;

        let (filter, user_id) = match by.into_inner() {
            S::Reporter(id) => ("m.reporter_id = $1::UUID", id),
            S::Assignee(id) => ("m.assigned_to = $1::UUID", id),
            S::Owner(id) => ("p.owner_id = $1::UUID", id),
        };
        let sql = format!(
            "SELECT {COLUMNS} \
             FROM meldungen AS m \
             LEFT JOIN units AS u ON u.id = m.unit_id \
             LEFT JOIN properties AS p ON p.id = u.property_id \
             WHERE {filter} \
             ORDER BY m.created_at DESC",
        );
        let mut meldungen = self
            .query(sql.as_str(), &[&user_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect::<Vec<_>>();

        let mut notes = self
            .notes_of(meldungen.iter().map(|m| m.id).collect())
            .await
            .map_err(tracerr::wrap!())?;
        for m in &mut meldungen {
            m.notes = notes.remove(&m.id).unwrap_or_default();
        }
        Ok(meldungen)
    }
}

impl<C> Database<Select<By<read::meldung::Chain, meldung::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
            Select<By<Option<Meldung>, meldung::Id>>,
            Ok = Option<Meldung>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Unit>, unit::Id>>,
            Ok = Option<Unit>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = read::meldung::Chain;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::meldung::Chain, meldung::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut chain = read::meldung::Chain::default();

        chain.meldung = self
            .execute(Select(By::<Option<Meldung>, _>::new(by.into_inner())))
            .await
            .map_err(tracerr::wrap!())?;
        let Some(unit_id) = chain.meldung.as_ref().map(|m| m.unit_id) else {
            return Ok(chain);
        };

        chain.unit = self
            .execute(Select(By::<Option<Unit>, _>::new(unit_id)))
            .await
            .map_err(tracerr::wrap!())?;
        let Some(property_id) = chain.unit.as_ref().map(|u| u.property_id)
        else {
            return Ok(chain);
        };

        chain.property = self
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::wrap!())?;
        let Some(owner_id) = chain.property.as_ref().map(|p| p.owner_id)
        else {
            return Ok(chain);
        };

        chain.owner = self
            .execute(Select(By::<Option<User>, _>::new(owner_id)))
            .await
            .map_err(tracerr::wrap!())?;
        Ok(chain)
    }
}

impl<C> Database<Insert<Meldung>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Meldung>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(meldung): Insert<Meldung>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(meldung)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Meldung>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(meldung): Update<Meldung>,
    ) -> Result<Self::Ok, Self::Err> {
        let Meldung {
            id,
            unit_id,
            reporter_id,
            assigned_to,
            title,
            description,
            status,
            priority,
            notes,
            images,
            estimated_cost,
            actual_cost,
            scheduled_for,
            created_at,
            updated_at,
            completed_at,
        } = meldung;

        const SQL: &str = "\
            INSERT INTO meldungen (\
                id, unit_id, reporter_id, assigned_to, \
                title, description, status, priority, images, \
                estimated_cost, actual_cost, scheduled_for, \
                created_at, updated_at, completed_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::UUID, \
                $5::VARCHAR, $6::TEXT, $7::VARCHAR, $8::INT2, $9::TEXT[], \
                $10::VARCHAR, $11::VARCHAR, $12::TIMESTAMPTZ, \
                $13::TIMESTAMPTZ, $14::TIMESTAMPTZ, $15::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET assigned_to = EXCLUDED.assigned_to, \
                title = EXCLUDED.title, \
                description = EXCLUDED.description, \
                status = EXCLUDED.status, \
                priority = EXCLUDED.priority, \
                images = EXCLUDED.images, \
                estimated_cost = EXCLUDED.estimated_cost, \
                actual_cost = EXCLUDED.actual_cost, \
                scheduled_for = EXCLUDED.scheduled_for, \
                updated_at = EXCLUDED.updated_at, \
                completed_at = EXCLUDED.completed_at";
        self.exec(
            SQL,
            &[
                &id,
                &unit_id,
                &reporter_id,
                &assigned_to,
                &title,
                &description,
                &status.to_string(),
                &priority,
                &images,
                &estimated_cost,
                &actual_cost,
                &scheduled_for,
                &created_at,
                &updated_at,
                &completed_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())?;

        // Notes are append-only, so the already stored positions are kept.
        const NOTE_SQL: &str = "\
            INSERT INTO meldung_notes (\
                meldung_id, position, text, author_id, created_at\
            ) \
            VALUES ($1::UUID, $2::INT4, $3::TEXT, $4::UUID, $5::TIMESTAMPTZ) \
            ON CONFLICT (meldung_id, position) DO NOTHING";
        for (position, note) in (0_i32..).zip(&notes) {
            self.exec(
                NOTE_SQL,
                &[
                    &id,
                    &position,
                    &note.text,
                    &note.author_id,
                    &note.created_at,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?;
        }
        Ok(())
    }
}

impl<C> Database<Lock<By<Meldung, meldung::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Meldung, meldung::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO meldungen_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
