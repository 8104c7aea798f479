//! [`Message`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select, Update};
use postgres_types::Json;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        meldung,
        message::{self, Attachment, Receipt, Receiver, Sender},
        Message,
    },
    infra::{
        database::{
            self,
            postgres::{Connection, Postgres},
        },
        Database,
    },
};

/// Columns of the `messages` table, in the order [`from_row()`] expects.
const COLUMNS: &str = "\
    id, meldung_id, sender_id, sender_role, receiver_role, receiver_id, \
    content, attachments, read_by, created_at";

/// Decodes a [`Message`] from a `messages` [`Row`].
fn from_row(row: &Row) -> Message {
    let Json(attachments) = row.get::<_, Json<Vec<Attachment>>>("attachments");
    let Json(read_by) = row.get::<_, Json<Vec<Receipt>>>("read_by");
    Message {
        id: row.get("id"),
        meldung_id: row.get("meldung_id"),
        sender: Sender {
            user_id: row.get("sender_id"),
            role: row.get("sender_role"),
        },
        receiver: Receiver {
            role: row.get("receiver_role"),
            user_id: row.get("receiver_id"),
        },
        content: row.get("content"),
        attachments,
        read_by,
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Message>, message::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Message>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Message>, message::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!("SELECT {COLUMNS} FROM messages WHERE id = $1::UUID");
        Ok(self
            .query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Message>, meldung::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Message>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Message>, meldung::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let meldung_id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM messages \
             WHERE meldung_id = $1::UUID \
             ORDER BY created_at ASC",
        );
        Ok(self
            .query(sql.as_str(), &[&meldung_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Message>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Message>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(message): Insert<Message>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(message)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Message>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(message): Update<Message>,
    ) -> Result<Self::Ok, Self::Err> {
        let Message {
            id,
            meldung_id,
            sender,
            receiver,
            content,
            attachments,
            read_by,
            created_at,
        } = message;

        const SQL: &str = "\
            INSERT INTO messages (\
                id, meldung_id, sender_id, sender_role, \
                receiver_role, receiver_id, \
                content, attachments, read_by, created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::INT2, \
                $5::INT2, $6::UUID, \
                $7::TEXT, $8::JSONB, $9::JSONB, $10::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET read_by = EXCLUDED.read_by";
        self.exec(
            SQL,
            &[
                &id,
                &meldung_id,
                &sender.user_id,
                &sender.role,
                &receiver.role,
                &receiver.user_id,
                &content,
                &Json(&attachments),
                &Json(&read_by),
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Message, message::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Message, message::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO messages_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
