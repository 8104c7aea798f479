//! [`Command`] definition.

pub mod activate_tenant;
pub mod add_meldung_note;
pub mod apply_billing_event;
pub mod assign_meldung;
pub mod authorize_user_session;
pub mod create_meldung;
pub mod create_notification;
pub mod create_property;
pub mod create_subscription;
pub mod create_tenant;
pub mod create_unit;
pub mod create_user;
pub mod create_user_session;
pub mod export_meldung_thread;
pub mod import_units;
pub mod mark_message_read;
pub mod mark_notification_read;
pub mod reassign_tenant;
pub mod request_password_reset;
pub mod reset_password;
pub mod revise_subscription;
pub mod send_message;
pub mod update_meldung_status;
pub mod update_user_password;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    activate_tenant::ActivateTenant, add_meldung_note::AddMeldungNote,
    apply_billing_event::ApplyBillingEvent, assign_meldung::AssignMeldung,
    authorize_user_session::AuthorizeUserSession,
    create_meldung::CreateMeldung, create_notification::CreateNotification,
    create_property::CreateProperty,
    create_subscription::CreateSubscription, create_tenant::CreateTenant,
    create_unit::CreateUnit, create_user::CreateUser,
    create_user_session::CreateUserSession,
    export_meldung_thread::ExportMeldungThread, import_units::ImportUnits,
    mark_message_read::MarkMessageRead,
    mark_notification_read::MarkNotificationRead,
    reassign_tenant::ReassignTenant,
    request_password_reset::RequestPasswordReset,
    reset_password::ResetPassword, revise_subscription::ReviseSubscription,
    send_message::SendMessage, update_meldung_status::UpdateMeldungStatus,
    update_user_password::UpdateUserPassword,
};
