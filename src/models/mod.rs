//! This module contains the data models for the herald application.

pub mod alert;
pub mod labels;
pub mod nflog_entry;
pub mod notification;
pub mod receiver;

pub use alert::{Alert, AlertStatus};
pub use labels::LabelSet;
pub use nflog_entry::NotificationLogEntry;
