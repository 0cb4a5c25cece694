//! Post-success side effects for finished document jobs.
//!
//! - [`JobNotification`]: what a finished job tells the outside world.
//! - [`SuccessHook`]: the fire-and-forget seam the pipeline calls.
//! - [`NotificationDispatcher`]: the production hook, fanning out to
//!   the [`delivery`] channels (email, webhook).

pub mod delivery;
pub mod hook;
pub mod notification;

pub use delivery::email::{EmailConfig, EmailDelivery};
pub use delivery::webhook::WebhookDelivery;
pub use hook::{HookError, NotificationDispatcher, SuccessHook};
pub use notification::JobNotification;
