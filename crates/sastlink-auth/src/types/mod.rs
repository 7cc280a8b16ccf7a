//! Domain types shared across the hand-off.

pub mod client;
pub mod form;

pub use client::{Client, ClientValidationError};
pub use form::FormValues;
