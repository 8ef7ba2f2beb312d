//! Core processing modules
//!
//! Contains the dialog round-trip to the language model.

pub mod dialog;

pub use dialog::{DialogClient, HttpDialogClient, NO_RESPONSE};
