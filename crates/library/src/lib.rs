//! File hosting operations.
//!
//! A [`Library`] ties a blob [backend](parcel_storage) to the
//! [metadata store](parcel_metadata) and is the only thing that mutates
//! either. Every blob is named by a [`FileId`]; every blob has exactly one
//! record and vice versa, which [`reconcile`] restores after a crash.

pub mod error;
pub mod events;
mod files;
mod id;
mod name;
mod reconcile;
mod size;

pub use crate::files::{Download, Library};
pub use crate::id::FileId;
pub use crate::name::sanitize_filename;
pub use crate::reconcile::{ReconcileReport, reconcile};
pub use crate::size::{format_bytes, format_speed, format_uptime};
