//! GraphQL [`Mutation`]s definitions.

use common::{DateTime, Money};
use juniper::graphql_object;
use service::{command, domain, Command as _};

use crate::{api, define_error, AsError, Context, Error, Session};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";

    /// Creates a new [`Session`] for the [`domain::User`] with the provided
    /// ID and makes it current.
    async fn start_session(
        user_id: domain::user::Id,
        ctx: &Context,
    ) -> Result<api::user::session::CreateResult, Error> {
        let output = ctx
            .service()
            .execute(command::CreateUserSession::ByUserId(user_id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        ctx.set_current_session(Session {
            user_id: output.user.id.into(),
            role: output.user.role(),
            token: output.token.clone(),
            expires_at: output.expires_at.coerce(),
        })
        .await;

        Ok(output.into())
    }

    /// Returns the current [`Session`] if it belongs to a landlord.
    async fn landlord_session(ctx: &Context) -> Result<Session, Error> {
        let session = ctx.current_session().await?;
        if session.role == domain::user::Role::Landlord {
            Ok(session)
        } else {
            Err(api::PrivilegeError::Landlord.into()).map_err(ctx.error())
        }
    }
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Registers a new `User` and starts a `Session` for it.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `EMAIL_OCCUPIED` - provided `UserEmail` is used by another `User`;
    /// - `MISSING_SPECIALIZATION` - a craftsman must provide a
    ///                              `UserSpecialization`;
    /// - `INVALID_RATING` - provided rating is out of `0..=5` range.
    #[tracing::instrument(
        skip_all,
        fields(
            email = %email,
            gql.name = "createUser",
            name = %name,
            otel.name = Self::SPAN_NAME,
            phone = ?phone,
            role = ?role,
        ),
    )]
    pub async fn create_user(
        name: api::user::Name,
        email: api::user::Email,
        password: api::user::Password,
        phone: Option<api::user::Phone>,
        role: api::user::Role,
        specialization: Option<api::user::Specialization>,
        rating: Option<f64>,
        ctx: &Context,
    ) -> Result<api::user::session::CreateResult, Error> {
        use domain::user::{Profile, Rating};

        let profile = match role {
            api::user::Role::Vermieter => Profile::Landlord {
                subscription: None,
            },
            api::user::Role::Mieter => Profile::Tenant {
                assigned_unit: None,
            },
            api::user::Role::Handwerker => {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "out of range values are rejected by `Rating`"
                )]
                let rating = match rating {
                    Some(r) => Rating::new(r as f32)
                        .ok_or_else(|| UserInputError::Rating.into())
                        .map_err(ctx.error())?,
                    None => Rating::MIN,
                };
                Profile::Craftsman {
                    specialization: specialization
                        .ok_or_else(|| UserInputError::Specialization.into())
                        .map_err(ctx.error())?
                        .into(),
                    rating,
                }
            }
        };

        let user = ctx
            .service()
            .execute(command::CreateUser {
                name: name.into(),
                email: email.into(),
                password: secrecy::SecretBox::init_with(move || {
                    password.into()
                }),
                phone: phone.map(Into::into),
                profile,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        Self::start_session(user.id, ctx).await
    }

    /// Creates a new `UserSession` with the provided credentials.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `WRONG_CREDENTIALS` - provided credentials does not match any `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            email = %email,
            gql.name = "createUserSession",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn create_user_session(
        email: api::user::Email,
        password: api::user::Password,
        ctx: &Context,
    ) -> Result<api::user::session::CreateResult, Error> {
        let output = ctx
            .service()
            .execute(command::CreateUserSession::ByCredentials {
                email: email.into(),
                password: secrecy::SecretBox::init_with(move || {
                    password.into()
                }),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        ctx.set_current_session(Session {
            user_id: output.user.id.into(),
            role: output.user.role(),
            token: output.token.clone(),
            expires_at: output.expires_at.coerce(),
        })
        .await;

        Ok(output.into())
    }

    /// Updates the `User`'s password to the provided one.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `WRONG_PASSWORD` - provided `old_password` does not match the current
    ///                      `User` password.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "updateUserPassword",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn update_user_password(
        new_password: api::user::Password,
        old_password: api::user::Password,
        ctx: &Context,
    ) -> Result<api::User, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::UpdateUserPassword {
                user_id: my_id.into(),
                new_password: secrecy::SecretBox::init_with(move || {
                    new_password.into()
                }),
                old_password: secrecy::SecretBox::init_with(move || {
                    old_password.into()
                }),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Requests a password reset for the `User` with the provided email.
    ///
    /// Always succeeds, so the existence of `User`s is not revealed.
    #[tracing::instrument(
        skip_all,
        fields(
            email = %email,
            gql.name = "requestPasswordReset",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn request_password_reset(
        email: api::user::Email,
        ctx: &Context,
    ) -> Result<bool, Error> {
        ctx.service()
            .execute(command::RequestPasswordReset {
                email: email.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|()| true)
    }

    /// Sets a new password of a `User` by redeeming a password reset token.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_OR_EXPIRED_TOKEN` - provided token is unknown or expired.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "resetPassword",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn reset_password(
        token: api::user::password_reset::Token,
        new_password: api::user::Password,
        ctx: &Context,
    ) -> Result<api::User, Error> {
        ctx.service()
            .execute(command::ResetPassword {
                token: token.into(),
                new_password: secrecy::SecretBox::init_with(move || {
                    new_password.into()
                }),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Creates a new `Property` owned by the current `User`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_LANDLORD` - the current `User` is not a landlord.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createProperty",
            name = %name,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn create_property(
        name: api::property::Name,
        address: api::property::AddressInput,
        ctx: &Context,
    ) -> Result<api::Property, Error> {
        let my_id = Self::landlord_session(ctx).await?.user_id;

        ctx.service()
            .execute(command::CreateProperty {
                owner_id: my_id.into(),
                name: name.into(),
                address: address.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Creates a new `Unit` in the `Property` owned by the current `User`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PROPERTY_NOT_EXISTS` - the `Property` does not exist;
    /// - `NOT_PROPERTY_OWNER` - the `Property` is owned by another `User`;
    /// - `INVALID_FLOOR` - provided floor is out of range;
    /// - `NEGATIVE_AMOUNT` - provided rent is negative.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createUnit",
            label = %label,
            otel.name = Self::SPAN_NAME,
            property_id = %property_id,
        ),
    )]
    pub async fn create_unit(
        property_id: api::property::Id,
        label: api::unit::Label,
        floor: Option<i32>,
        area: Option<api::unit::Area>,
        rent: Option<Money>,
        ctx: &Context,
    ) -> Result<api::Unit, Error> {
        let my_id = Self::landlord_session(ctx).await?.user_id;
        let floor = floor
            .map(domain::unit::Floor::try_from)
            .transpose()
            .map_err(|_| UnitInputError::Floor.into())
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::CreateUnit {
                landlord_id: my_id.into(),
                property_id: property_id.into(),
                label: label.into(),
                floor,
                area: area.map(Into::into),
                rent,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Imports `Unit`s into the `Property` owned by the current `User`.
    ///
    /// Every row must have a `label` cell and may have `floor`, `area`,
    /// `rent` and `status` cells. Malformed rows are skipped.
    ///
    /// Returns the number of created `Unit`s.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PROPERTY_NOT_EXISTS` - the `Property` does not exist;
    /// - `NOT_PROPERTY_OWNER` - the `Property` is owned by another `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "importUnits",
            otel.name = Self::SPAN_NAME,
            property_id = %property_id,
            rows = rows.len(),
        ),
    )]
    pub async fn import_units(
        property_id: api::property::Id,
        rows: Vec<Vec<api::unit::ImportCell>>,
        ctx: &Context,
    ) -> Result<i32, Error> {
        let my_id = Self::landlord_session(ctx).await?.user_id;

        let created = ctx
            .service()
            .execute(command::ImportUnits {
                landlord_id: my_id.into(),
                property_id: property_id.into(),
                rows: api::unit::import_rows(rows),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;
        i32::try_from(created)
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }

    /// Invites a new tenant into a vacant `Unit` of the `Property` owned by
    /// the current `User`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PROPERTY_NOT_EXISTS` - the `Property` does not exist;
    /// - `NOT_PROPERTY_OWNER` - the `Property` is owned by another `User`;
    /// - `UNIT_NOT_EXISTS` - the `Unit` does not exist in the `Property`;
    /// - `UNIT_OCCUPIED` - the `Unit` is occupied or has a pending tenant;
    /// - `TENANT_EXISTS` - an active tenant with the email exists;
    /// - `EMAIL_OCCUPIED` - the email is used by another `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            email = %email,
            gql.name = "createTenant",
            otel.name = Self::SPAN_NAME,
            property_id = %property_id,
            unit_id = %unit_id,
        ),
    )]
    pub async fn create_tenant(
        property_id: api::property::Id,
        unit_id: api::unit::Id,
        name: api::user::Name,
        email: api::user::Email,
        phone: Option<api::user::Phone>,
        move_in: DateTime,
        ctx: &Context,
    ) -> Result<api::Tenant, Error> {
        let my_id = Self::landlord_session(ctx).await?.user_id;

        ctx.service()
            .execute(command::CreateTenant {
                landlord_id: my_id.into(),
                property_id: property_id.into(),
                unit_id: unit_id.into(),
                name: name.into(),
                email: email.into(),
                phone: phone.map(Into::into),
                move_in: move_in.coerce(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Accepts a tenant invitation: creates the tenant `User`, moves it into
    /// the `Unit` and starts a `Session` for it.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_OR_EXPIRED_TOKEN` - the invitation is unknown, used or
    ///                                expired;
    /// - `EMAIL_OCCUPIED` - the invited email is used by another `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "activateTenant",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn activate_tenant(
        token: api::tenant::InvitationToken,
        password: api::user::Password,
        ctx: &Context,
    ) -> Result<api::user::session::CreateResult, Error> {
        let user = ctx
            .service()
            .execute(command::ActivateTenant {
                token: token.into(),
                password: secrecy::SecretBox::init_with(move || {
                    password.into()
                }),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        Self::start_session(user.id, ctx).await
    }

    /// Moves a tenant `User` into another `Unit` owned by the current
    /// `User`, releasing the previous one.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `UNIT_NOT_EXISTS` - the `Unit` does not exist;
    /// - `NOT_PROPERTY_OWNER` - the `Unit` belongs to another landlord;
    /// - `USER_NOT_EXISTS` - the tenant `User` does not exist;
    /// - `NOT_TENANT` - the `User` is not a tenant.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "reassignTenant",
            otel.name = Self::SPAN_NAME,
            tenant_id = %tenant_id,
            unit_id = %unit_id,
        ),
    )]
    pub async fn reassign_tenant(
        tenant_id: api::user::Id,
        unit_id: api::unit::Id,
        ctx: &Context,
    ) -> Result<api::Unit, Error> {
        let my_id = Self::landlord_session(ctx).await?.user_id;

        ctx.service()
            .execute(command::ReassignTenant {
                landlord_id: my_id.into(),
                tenant_user_id: tenant_id.into(),
                unit_id: unit_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Files a new `Meldung` against the `Unit` of the current tenant.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_TENANT` - the current `User` is not a tenant;
    /// - `NO_UNIT` - the current `User` has no `Unit` assigned;
    /// - `NEGATIVE_AMOUNT` - provided estimated cost is negative.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createMeldung",
            otel.name = Self::SPAN_NAME,
            priority = ?priority,
            title = %title,
        ),
    )]
    pub async fn create_meldung(
        title: api::meldung::Title,
        description: api::meldung::Description,
        priority: api::meldung::Priority,
        images: Option<Vec<api::meldung::ImageUrl>>,
        estimated_cost: Option<Money>,
        ctx: &Context,
    ) -> Result<api::Meldung, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::CreateMeldung {
                reporter_id: my_id.into(),
                title: title.into(),
                description: description.into(),
                priority: priority.into(),
                images: images
                    .unwrap_or_default()
                    .into_iter()
                    .map(Into::into)
                    .collect(),
                estimated_cost,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Assigns a craftsman to the `Meldung`, moving it into
    /// `IN_BEARBEITUNG`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MELDUNG_NOT_EXISTS` - the `Meldung` does not exist;
    /// - `MELDUNG_FORBIDDEN` - the current `User` may not assign craftsmen;
    /// - `NOT_CRAFTSMAN` - the assignee is not a craftsman;
    /// - `INVALID_TRANSITION` - the `Meldung` is closed already.
    #[tracing::instrument(
        skip_all,
        fields(
            craftsman_id = %craftsman_id,
            gql.name = "assignMeldung",
            meldung_id = %meldung_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn assign_meldung(
        meldung_id: api::meldung::Id,
        craftsman_id: api::user::Id,
        ctx: &Context,
    ) -> Result<api::Meldung, Error> {
        let session = ctx.current_session().await?;

        ctx.service()
            .execute(command::AssignMeldung {
                user_id: session.user_id.into(),
                role: session.role,
                meldung_id: meldung_id.into(),
                craftsman_id: craftsman_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Moves the `Meldung` into the provided status.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MELDUNG_NOT_EXISTS` - the `Meldung` does not exist;
    /// - `MELDUNG_FORBIDDEN` - the current `User` may not change the
    ///                         `Meldung`;
    /// - `INVALID_TRANSITION` - the status cannot be entered from the
    ///                          current one;
    /// - `NEGATIVE_AMOUNT` - provided actual cost is negative.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "updateMeldungStatus",
            meldung_id = %meldung_id,
            otel.name = Self::SPAN_NAME,
            status = ?status,
        ),
    )]
    pub async fn update_meldung_status(
        meldung_id: api::meldung::Id,
        status: api::meldung::Status,
        note: Option<api::meldung::NoteText>,
        actual_cost: Option<Money>,
        ctx: &Context,
    ) -> Result<api::Meldung, Error> {
        let session = ctx.current_session().await?;

        ctx.service()
            .execute(command::UpdateMeldungStatus {
                user_id: session.user_id.into(),
                role: session.role,
                meldung_id: meldung_id.into(),
                status: status.into(),
                note: note.map(Into::into),
                actual_cost,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Leaves a note on the `Meldung`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MELDUNG_NOT_EXISTS` - the `Meldung` does not exist;
    /// - `MELDUNG_FORBIDDEN` - the current `User` has no access to the
    ///                         `Meldung`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "addMeldungNote",
            meldung_id = %meldung_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn add_meldung_note(
        meldung_id: api::meldung::Id,
        text: api::meldung::NoteText,
        ctx: &Context,
    ) -> Result<api::Meldung, Error> {
        let session = ctx.current_session().await?;

        ctx.service()
            .execute(command::AddMeldungNote {
                user_id: session.user_id.into(),
                role: session.role,
                meldung_id: meldung_id.into(),
                text: text.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Posts a new `Message` into the `Meldung` thread.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MELDUNG_NOT_EXISTS` - the `Meldung` does not exist;
    /// - `MELDUNG_FORBIDDEN` - the current `User` has no access to the
    ///                         `Meldung`.
    #[tracing::instrument(
        skip_all,
        fields(
            attachments = attachments.as_ref().map_or(0, Vec::len),
            gql.name = "sendMessage",
            meldung_id = %meldung_id,
            otel.name = Self::SPAN_NAME,
            receiver_role = ?receiver_role,
        ),
    )]
    pub async fn send_message(
        meldung_id: api::meldung::Id,
        receiver_role: api::user::Role,
        receiver_id: Option<api::user::Id>,
        content: api::message::Content,
        attachments: Option<Vec<api::message::AttachmentInput>>,
        ctx: &Context,
    ) -> Result<api::Message, Error> {
        let session = ctx.current_session().await?;

        ctx.service()
            .execute(command::SendMessage {
                sender_id: session.user_id.into(),
                role: session.role,
                meldung_id: meldung_id.into(),
                receiver: domain::message::Receiver {
                    role: receiver_role.into(),
                    user_id: receiver_id.map(Into::into),
                },
                content: content.into(),
                attachments: attachments
                    .unwrap_or_default()
                    .into_iter()
                    .map(Into::into)
                    .collect(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Marks the `Message` as read by the current `User`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MESSAGE_NOT_EXISTS` - the `Message` does not exist;
    /// - `MESSAGE_FORBIDDEN` - the current `User` has no access to the
    ///                         `Message`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "markMessageRead",
            message_id = %message_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn mark_message_read(
        message_id: api::message::Id,
        ctx: &Context,
    ) -> Result<api::Message, Error> {
        let session = ctx.current_session().await?;

        ctx.service()
            .execute(command::MarkMessageRead {
                user_id: session.user_id.into(),
                role: session.role,
                message_id: message_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Publishes a new `Notification` for the residents of the `Property`
    /// owned by the current `User`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PROPERTY_NOT_EXISTS` - the `Property` does not exist;
    /// - `NOT_PROPERTY_OWNER` - the `Property` is owned by another `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createNotification",
            kind = ?kind,
            otel.name = Self::SPAN_NAME,
            property_id = %property_id,
        ),
    )]
    pub async fn create_notification(
        property_id: api::property::Id,
        kind: api::notification::Kind,
        priority: api::notification::Priority,
        title: api::notification::Title,
        message: api::notification::Text,
        meldung_id: Option<api::meldung::Id>,
        ctx: &Context,
    ) -> Result<api::Notification, Error> {
        let my_id = Self::landlord_session(ctx).await?.user_id;

        ctx.service()
            .execute(command::CreateNotification {
                creator_id: my_id.into(),
                property_id: property_id.into(),
                kind: kind.into(),
                priority: priority.into(),
                title: title.into(),
                message: message.into(),
                meldung_id: meldung_id.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Marks the `Notification` as read by the current `User`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOTIFICATION_NOT_EXISTS` - the `Notification` does not exist;
    /// - `NOTIFICATIONS_FORBIDDEN` - the `Notification` is not shown to the
    ///                               current `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "markNotificationRead",
            notification_id = %notification_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn mark_notification_read(
        notification_id: api::notification::Id,
        ctx: &Context,
    ) -> Result<api::Notification, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::MarkNotificationRead {
                user_id: my_id.into(),
                notification_id: notification_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Starts a billing subscription of the current landlord.
    ///
    /// Returns the URL the landlord approves the payment at.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_LANDLORD` - the current `User` is not a landlord;
    /// - `SUBSCRIPTION_EXISTS` - an active or pending subscription exists;
    /// - `BILLING_UNAVAILABLE` - the billing provider failed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createSubscription",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn create_subscription(
        ctx: &Context,
    ) -> Result<api::billing::Approval, Error> {
        let my_id = Self::landlord_session(ctx).await?.user_id;

        ctx.service()
            .execute(command::CreateSubscription {
                user_id: my_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Updates the billed quantity of the current landlord's subscription to
    /// the current number of owned `Unit`s.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NO_SUBSCRIPTION` - the current `User` has no subscription;
    /// - `BILLING_UNAVAILABLE` - the billing provider failed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "reviseSubscription",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn revise_subscription(
        ctx: &Context,
    ) -> Result<api::Subscription, Error> {
        let my_id = Self::landlord_session(ctx).await?.user_id;

        ctx.service()
            .execute(command::ReviseSubscription {
                user_id: my_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

define_error! {
    enum UserInputError {
        #[code = "MISSING_SPECIALIZATION"]
        #[status = BAD_REQUEST]
        #[message = "Craftsman `User` must have a specialization"]
        Specialization,

        #[code = "INVALID_RATING"]
        #[status = BAD_REQUEST]
        #[message = "Rating must be in `0..=5` range"]
        Rating,
    }
}

define_error! {
    enum UnitInputError {
        #[code = "INVALID_FLOOR"]
        #[status = BAD_REQUEST]
        #[message = "Floor is out of range"]
        Floor,
    }
}

define_error! {
    enum AmountError {
        #[code = "NEGATIVE_AMOUNT"]
        #[status = BAD_REQUEST]
        #[message = "Amount of money cannot be negative"]
        Negative,
    }
}

define_error! {
    enum OwnershipError {
        #[code = "NOT_PROPERTY_OWNER"]
        #[status = FORBIDDEN]
        #[message = "`Property` is owned by another `User`"]
        NotOwner,
    }
}

define_error! {
    enum TokenError {
        #[code = "INVALID_OR_EXPIRED_TOKEN"]
        #[status = BAD_REQUEST]
        #[message = "Provided token is invalid or expired"]
        InvalidOrExpired,
    }
}

define_error! {
    enum TransitionError {
        #[code = "INVALID_TRANSITION"]
        #[status = BAD_REQUEST]
        #[message = "`Meldung` cannot enter the requested status"]
        Invalid,
    }
}

define_error! {
    enum EmailError {
        #[code = "EMAIL_OCCUPIED"]
        #[status = CONFLICT]
        #[message = "Provided email is used by another `User`"]
        Occupied,
    }
}

impl AsError for command::create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::EmailOccupied(_) => EmailError::Occupied.into(),
        })
    }
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "WRONG_CREDENTIALS"]
                #[status = UNAUTHORIZED]
                #[message = "Wrong credentials"]
                WrongCredentials,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::JsonWebTokenEncodeError(_) | Self::UserNotExists(_) => {
                return None
            }
            Self::WrongCredentials => Error::WrongCredentials.into(),
        })
    }
}

impl AsError for command::update_user_password::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "WRONG_PASSWORD"]
                #[status = BAD_REQUEST]
                #[message = "Wrong password"]
                WrongPassword,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::UserNotExists(_) => api::query::UserError::NotExists.into(),
            Self::WrongPassword => Error::WrongPassword.into(),
        })
    }
}

impl AsError for command::request_password_reset::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::reset_password::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidOrExpiredToken => TokenError::InvalidOrExpired.into(),
        })
    }
}

impl AsError for command::create_property::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::UserNotExists(_) => api::query::UserError::NotExists.into(),
            Self::NotLandlord(_) => api::PrivilegeError::Landlord.into(),
        })
    }
}

impl AsError for command::create_unit::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::PropertyNotExists(_) => {
                api::query::PropertyError::NotExists.into()
            }
            Self::NotOwner(_) => OwnershipError::NotOwner.into(),
            Self::NegativeRent => AmountError::Negative.into(),
        })
    }
}

impl AsError for command::import_units::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::PropertyNotExists(_) => {
                api::query::PropertyError::NotExists.into()
            }
            Self::NotOwner(_) => OwnershipError::NotOwner.into(),
        })
    }
}

impl AsError for command::create_tenant::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "UNIT_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "`Unit` is occupied or has a pending tenant"]
                UnitOccupied,

                #[code = "TENANT_EXISTS"]
                #[status = CONFLICT]
                #[message = "Active tenant with the provided email exists"]
                TenantExists,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::PropertyNotExists(_) => {
                api::query::PropertyError::NotExists.into()
            }
            Self::NotOwner(_) => OwnershipError::NotOwner.into(),
            Self::UnitNotExists(_) => api::query::UnitError::NotExists.into(),
            Self::UnitOccupied(_) => Error::UnitOccupied.into(),
            Self::TenantExists(_) => Error::TenantExists.into(),
            Self::EmailOccupied(_) => EmailError::Occupied.into(),
        })
    }
}

impl AsError for command::activate_tenant::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidOrExpiredToken => TokenError::InvalidOrExpired.into(),
            Self::EmailOccupied(_) => EmailError::Occupied.into(),
        })
    }
}

impl AsError for command::reassign_tenant::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::UnitNotExists(_) => api::query::UnitError::NotExists.into(),
            Self::NotOwner(_) => OwnershipError::NotOwner.into(),
            Self::UserNotExists(_) => api::query::UserError::NotExists.into(),
            Self::NotTenant(_) => api::PrivilegeError::Tenant.into(),
        })
    }
}

impl AsError for command::create_meldung::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "NO_UNIT"]
                #[status = CONFLICT]
                #[message = "Tenant has no `Unit` assigned"]
                NoUnit,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::UserNotExists(_) => api::query::UserError::NotExists.into(),
            Self::NotTenant(_) => api::PrivilegeError::Tenant.into(),
            Self::NoUnit(_) => Error::NoUnit.into(),
            Self::NegativeCost => AmountError::Negative.into(),
        })
    }
}

impl AsError for command::assign_meldung::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "NOT_CRAFTSMAN"]
                #[status = BAD_REQUEST]
                #[message = "Assigned `User` must be a craftsman"]
                NotCraftsman,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::Forbidden(_) => api::query::MeldungError::Forbidden.into(),
            Self::NotCraftsman(_) => Error::NotCraftsman.into(),
            Self::MeldungNotExists(_) => {
                api::query::MeldungError::NotExists.into()
            }
            Self::InvalidTransition(_) => TransitionError::Invalid.into(),
        })
    }
}

impl AsError for command::update_meldung_status::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::MeldungNotExists(_) => {
                api::query::MeldungError::NotExists.into()
            }
            Self::Forbidden(_) => api::query::MeldungError::Forbidden.into(),
            Self::InvalidTransition(_) => TransitionError::Invalid.into(),
            Self::NegativeCost => AmountError::Negative.into(),
        })
    }
}

impl AsError for command::add_meldung_note::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::MeldungNotExists(_) => {
                api::query::MeldungError::NotExists.into()
            }
            Self::Forbidden(_) => api::query::MeldungError::Forbidden.into(),
        })
    }
}

impl AsError for command::send_message::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::MeldungNotExists(_) => {
                api::query::MeldungError::NotExists.into()
            }
            Self::Forbidden(_) => api::query::MeldungError::Forbidden.into(),
        })
    }
}

impl AsError for command::mark_message_read::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "MESSAGE_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Message` with the provided ID does not exist"]
                NotExists,

                #[code = "MESSAGE_FORBIDDEN"]
                #[status = FORBIDDEN]
                #[message = "`Message` with the provided ID is not \
                             accessible"]
                Forbidden,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::MessageNotExists(_) => Error::NotExists.into(),
            Self::Forbidden(_) => Error::Forbidden.into(),
        })
    }
}

impl AsError for command::create_notification::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::PropertyNotExists(_) => {
                api::query::PropertyError::NotExists.into()
            }
            Self::NotOwner(_) => OwnershipError::NotOwner.into(),
        })
    }
}

impl AsError for command::mark_notification_read::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "NOTIFICATION_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Notification` with the provided ID does not \
                             exist"]
                NotExists,

                #[code = "NOTIFICATIONS_FORBIDDEN"]
                #[status = FORBIDDEN]
                #[message = "`Notification` with the provided ID is not \
                             accessible"]
                Forbidden,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::NotificationNotExists(_) => Error::NotExists.into(),
            Self::Forbidden(_) => Error::Forbidden.into(),
        })
    }
}

impl AsError for command::create_subscription::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "SUBSCRIPTION_EXISTS"]
                #[status = CONFLICT]
                #[message = "Active or pending subscription exists already"]
                SubscriptionExists,
            }
        }

        Some(match self {
            Self::Billing(e) => return e.try_as_error(),
            Self::Db(e) => return e.try_as_error(),
            Self::UserNotExists(_) => api::query::UserError::NotExists.into(),
            Self::NotLandlord(_) => api::PrivilegeError::Landlord.into(),
            Self::SubscriptionExists(_) => Error::SubscriptionExists.into(),
        })
    }
}

impl AsError for command::revise_subscription::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "NO_SUBSCRIPTION"]
                #[status = CONFLICT]
                #[message = "Landlord has no subscription"]
                NoSubscription,
            }
        }

        Some(match self {
            Self::Billing(e) => return e.try_as_error(),
            Self::Db(e) => return e.try_as_error(),
            Self::UserNotExists(_) => api::query::UserError::NotExists.into(),
            Self::NoSubscription(_) => Error::NoSubscription.into(),
        })
    }
}
