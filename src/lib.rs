#![doc(html_root_url = "https://docs.rs/dom-push/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Applies server-pushed updates to an already-rendered page.
//!
//! A server sends [`Envelope`](`command::Envelope`)s (alone or batched as `{"updates": [...]}`),
//! a [`Dispatcher`](`dispatch::Dispatcher`) validates each into a [`Command`](`command::Command`)
//! and patches the matching element(s) of a [`Document`](`document::Document`) in place.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod command;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod memory;
pub mod patch;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use command::{ClassNames, Command, CommandKind, Envelope, Message, Target};
pub use dispatch::{Diagnostics, Dispatcher, TracingDiagnostics};
pub use document::Document;
pub use error::UpdateError;
