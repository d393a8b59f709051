//! Relays school-portal change events (announcements, teacher absences) into
//! Discord channels, editing earlier messages in place and tagging class
//! roles mentioned in schedule changes.

pub mod chat;
pub mod classify;
pub mod config;
pub mod delivery;
pub mod format;
pub mod matcher;
pub mod model;
pub mod ops;
pub mod portal;
pub mod relay;
