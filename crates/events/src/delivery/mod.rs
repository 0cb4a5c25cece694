//! External delivery channels for job notifications.

pub mod email;
pub mod webhook;
