//! [`Command`] for exporting a [`Meldung`] thread as a PDF document.

use std::collections::HashMap;

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use itertools::Itertools as _;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{meldung, message, user, Meldung, Message, User},
    infra::{
        database,
        document::{Document, Jpeg},
        image::Fetch,
        Database,
    },
    read, Service,
};

use super::Command;

/// [`Command`] for rendering the thread of a [`Meldung`] into a paginated PDF
/// document.
///
/// Image [`Attachment`]s are downloaded and embedded, other
/// [`Attachment`]s are left out.
///
/// [`Attachment`]: crate::domain::message::Attachment
#[derive(Clone, Copy, Debug)]
pub struct ExportMeldungThread {
    /// ID of the [`User`] requesting the export.
    pub user_id: user::Id,

    /// [`user::Role`] of the requesting [`User`].
    pub role: user::Role,

    /// ID of the [`Meldung`] to export.
    pub meldung_id: meldung::Id,
}

impl<Db, Bill> Command<ExportMeldungThread> for Service<Db, Bill>
where
    Db: Database<
            Select<By<read::meldung::Chain, meldung::Id>>,
            Ok = read::meldung::Chain,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Message>, meldung::Id>>,
            Ok = Vec<Message>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<user::Id, User>, Vec<user::Id>>>,
            Ok = HashMap<user::Id, User>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Vec<u8>;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ExportMeldungThread,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ExportMeldungThread {
            user_id,
            role,
            meldung_id,
        } = cmd;

        let chain = self
            .database()
            .execute(Select(By::<read::meldung::Chain, _>::new(meldung_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if chain.meldung.is_none() {
            return Err(tracerr::new!(E::MeldungNotExists(meldung_id)));
        }
        if !chain.grants(user_id, role) {
            return Err(tracerr::new!(E::Forbidden(meldung_id)));
        }
        let read::meldung::Chain {
            meldung: Some(meldung),
            unit,
            property,
            ..
        } = chain
        else {
            return Err(tracerr::new!(E::MeldungNotExists(meldung_id)));
        };

        let messages = self
            .database()
            .execute(Select(By::<Vec<Message>, _>::new(meldung_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let users = self
            .database()
            .execute(Select(By::<HashMap<_, User>, _>::new(
                messages
                    .iter()
                    .map(|m| m.sender.user_id)
                    .chain([meldung.reporter_id])
                    .unique()
                    .collect::<Vec<_>>(),
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let name_of = |id: &user::Id| {
            users
                .get(id)
                .map_or_else(|| "Unbekannt".to_owned(), |u| u.name.to_string())
        };

        let mut doc = Document::new();
        render_header(
            &mut doc,
            &meldung,
            &name_of(&meldung.reporter_id),
            unit.as_ref().map(|u| u.label.to_string()),
            property.as_ref().map(|p| p.address.to_string()),
        );
        for msg in &messages {
            _ = doc
                .gap()
                .label(format!(
                    "{} ({}), {}",
                    name_of(&msg.sender.user_id),
                    msg.sender.role,
                    msg.created_at,
                ))
                .paragraph(&msg.content);
            for image in msg.attachments.iter().filter(|a| a.is_image()) {
                self.embed_image(&mut doc, image).await;
            }
        }

        log::debug!(
            "exported `Meldung(id: {meldung_id})` with {} messages into {} \
             pages",
            messages.len(),
            doc.pages(),
        );

        Ok(doc.render())
    }
}

impl<Db, Bill> Service<Db, Bill> {
    /// Downloads and embeds the provided image [`Attachment`] into the
    /// [`Document`], falling back to its URL if it cannot be embedded.
    ///
    /// [`Attachment`]: message::Attachment
    async fn embed_image(
        &self,
        doc: &mut Document,
        image: &message::Attachment,
    ) {
        _ = doc.label(format!("Bild: {}", image.name));
        let data = match self.images().execute(Fetch(image.url.clone())).await
        {
            Ok(data) => data,
            Err(e) => {
                log::warn!("failed to download image `{}`: {e}", image.url);
                _ = doc.paragraph(format!("<{}>", image.url));
                return;
            }
        };
        if let Some(jpeg) = Jpeg::parse(data) {
            _ = doc.image(jpeg);
        } else {
            log::debug!("image `{}` is not a JPEG", image.url);
            _ = doc.paragraph(format!("<{}>", image.url));
        }
    }
}

/// Renders the title block of the exported [`Meldung`].
fn render_header(
    doc: &mut Document,
    meldung: &Meldung,
    reporter: &str,
    unit: Option<String>,
    address: Option<String>,
) {
    _ = doc
        .heading(&meldung.title)
        .label(format!("Status: {}", meldung.status))
        .label(format!("Gemeldet von: {reporter}, {}", meldung.created_at));
    if let Some(unit) = unit {
        _ = doc.label(format!("Einheit: {unit}"));
    }
    if let Some(address) = address {
        _ = doc.label(format!("Adresse: {address}"));
    }
    _ = doc.gap().paragraph(&meldung.description);
}

/// Error of [`ExportMeldungThread`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Meldung`] doesn't exist.
    #[display("`Meldung(id: {_0})` does not exist")]
    #[from(ignore)]
    MeldungNotExists(#[error(not(source))] meldung::Id),

    /// [`User`] may not access the [`Meldung`] thread.
    #[display("`Meldung(id: {_0})` thread is not accessible")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] meldung::Id),
}

#[cfg(test)]
mod spec {
    use std::{collections::HashMap, sync::Arc};

    use crate::{
        command::SendMessage,
        domain::{
            meldung,
            message::{self, Attachment, Receiver},
            property, unit, user,
        },
        infra::{document, Images},
        spec::service,
        Command as _,
    };

    use super::{ExecutionError, ExportMeldungThread};

    #[tokio::test]
    async fn renders_thread_with_images_only() {
        let (mut svc, _) = service();
        svc.images = Images::Fixed(Arc::new(HashMap::from([(
            "https://files.example.org/heizung.jpg".to_owned(),
            document::spec::jpeg(320, 240),
        )])));
        let owner = user::spec::with_role(user::Role::Landlord);
        let reporter = user::spec::with_role(user::Role::Tenant);
        let property = property::spec::owned_by(owner.id);
        let unit = unit::spec::vacant(property.id);
        let meldung = meldung::spec::filed(unit.id, reporter.id);
        svc.database().put(owner.clone());
        svc.database().put(reporter.clone());
        svc.database().put(property);
        svc.database().put(unit);
        svc.database().put(meldung.clone());

        let attachment = |name: &str, mime: &str| Attachment {
            name: name.into(),
            url: format!("https://files.example.org/{name}"),
            mime: mime.into(),
        };
        _ = svc
            .execute(SendMessage {
                sender_id: reporter.id,
                role: user::Role::Tenant,
                meldung_id: meldung.id,
                receiver: Receiver {
                    role: user::Role::Landlord,
                    user_id: Some(owner.id),
                },
                content: message::Content::new("Siehe Fotos.").unwrap(),
                attachments: vec![
                    attachment("heizung.jpg", "image/jpeg"),
                    attachment("vertrag.pdf", "application/pdf"),
                    attachment("zaehler.jpg", "image/jpeg"),
                ],
            })
            .await
            .unwrap();

        let pdf = svc
            .execute(ExportMeldungThread {
                user_id: owner.id,
                role: user::Role::Landlord,
                meldung_id: meldung.id,
            })
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&pdf);

        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.contains("(Siehe Fotos.) Tj"));
        assert!(text.contains("/Subtype /Image /Width 320 /Height 240"));
        assert!(text.contains("/Im1 Do"));
        assert!(!text.contains("/Im2"));
        assert!(text.contains("(Bild: heizung.jpg) Tj"));
        assert!(!text.contains("<https://files.example.org/heizung.jpg>"));
        assert!(text.contains("(<https://files.example.org/zaehler.jpg>) Tj"));
        assert!(!text.contains("vertrag.pdf"));
    }

    #[tokio::test]
    async fn outsiders_cannot_export() {
        let (svc, _) = service();
        let owner = user::spec::with_role(user::Role::Landlord);
        let property = property::spec::owned_by(owner.id);
        let unit = unit::spec::vacant(property.id);
        let meldung = meldung::spec::filed(unit.id, user::Id::new());
        svc.database().put(owner);
        svc.database().put(property);
        svc.database().put(unit);
        svc.database().put(meldung.clone());

        let err = svc
            .execute(ExportMeldungThread {
                user_id: user::Id::new(),
                role: user::Role::Craftsman,
                meldung_id: meldung.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Forbidden(_)));

        let err = svc
            .execute(ExportMeldungThread {
                user_id: user::Id::new(),
                role: user::Role::Tenant,
                meldung_id: meldung::Id::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::MeldungNotExists(_)));
    }
}
