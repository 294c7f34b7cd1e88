//! Stream utilities for the inbound notification path

pub mod notifications;

pub use notifications::{Notifications, NotificationsExt};
