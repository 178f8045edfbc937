//! Turns inbound messages into patches and routes every failure to a [`Diagnostics`] sink.

use crate::{
	command::{split_updates, Command, Envelope},
	document::Document,
	error::UpdateError,
	patch,
};
use core::cell::RefCell;
use serde_json::Value;
use tracing::{error, instrument, trace, trace_span, warn, Level};

/// Receives every problem the [`Dispatcher`] runs into.
pub trait Diagnostics {
	fn report(&self, error: UpdateError);
}

impl<T: Diagnostics + ?Sized> Diagnostics for &T {
	fn report(&self, error: UpdateError) {
		(**self).report(error)
	}
}

/// Collects reports, mainly for tests.
impl Diagnostics for RefCell<Vec<UpdateError>> {
	fn report(&self, error: UpdateError) {
		self.borrow_mut().push(error)
	}
}

/// Logs each report through [`tracing`] at the error's [severity](`UpdateError::severity`).
///
/// Pushed markup and whole envelopes are only included with the `dangerous-logging` feature.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
	fn report(&self, error: UpdateError) {
		let severity = error.severity();
		if cfg!(feature = "dangerous-logging") {
			if severity == Level::WARN {
				warn!("{} ({:?})", error, error)
			} else {
				error!("{} ({:?})", error, error)
			}
		} else if severity == Level::WARN {
			warn!("{}", error)
		} else {
			error!("{}", error)
		}
	}
}

/// Applies updates to a [`Document`], one envelope at a time and strictly in the order given.
///
/// Nothing escapes a single envelope: every failure is [reported](`Diagnostics::report`)
/// and processing continues with the next one.
#[derive(Debug)]
pub struct Dispatcher<D, R = TracingDiagnostics> {
	document: D,
	diagnostics: R,
}

impl<D: Document> Dispatcher<D> {
	#[must_use]
	pub fn new(document: D) -> Self {
		Self::with_diagnostics(document, TracingDiagnostics)
	}
}

impl<D: Document, R: Diagnostics> Dispatcher<D, R> {
	#[must_use]
	pub fn with_diagnostics(document: D, diagnostics: R) -> Self {
		Self { document, diagnostics }
	}

	pub fn document(&self) -> &D {
		&self.document
	}

	pub fn diagnostics(&self) -> &R {
		&self.diagnostics
	}

	pub fn into_inner(self) -> (D, R) {
		(self.document, self.diagnostics)
	}

	/// Decodes one inbound message and applies the update or batch of updates it contains.
	#[instrument(skip(self, text))]
	pub fn handle_message(&self, text: &str) {
		match serde_json::from_str::<Value>(text) {
			Ok(payload) => self.handle_value(payload),
			Err(error) => self.diagnostics.report(UpdateError::MalformedMessage { reason: error.to_string() }),
		}
	}

	/// Applies an already decoded message.
	///
	/// Envelopes of a batch that don't decode are reported and skipped.
	#[instrument(skip(self, payload))]
	pub fn handle_value(&self, payload: Value) {
		let updates = match split_updates(payload) {
			Ok(updates) => updates,
			Err(error) => return self.diagnostics.report(error),
		};
		trace!("Applying {} update(s).", updates.len());
		for (index, update) in updates.into_iter().enumerate() {
			let span = trace_span!("update", index);
			let _enter = span.enter();
			match Envelope::from_value(update) {
				Ok(envelope) => self.dispatch(&envelope),
				Err(error) => self.diagnostics.report(error),
			}
		}
	}

	/// Validates `envelope` against its command's field requirements and applies it.
	#[instrument(skip(self, envelope), fields(command = ?envelope.command))]
	pub fn dispatch(&self, envelope: &Envelope) {
		match Command::try_from(envelope) {
			Ok(command) => self.apply(&command),
			Err(error) => self.diagnostics.report(error),
		}
	}

	pub fn apply(&self, command: &Command) {
		let result = match command {
			Command::SetElement { id, html } => patch::set_element(&self.document, id, html),
			Command::SetInnerHtml { target, html } => patch::set_inner_html(&self.document, target, html),
			Command::SetClassNames { id, class_names } => patch::set_class_names(&self.document, id, class_names),
			Command::ToggleClassNames { target, class_names } => patch::toggle_class_names(&self.document, target, class_names),
		};
		if let Err(error) = result {
			self.diagnostics.report(error)
		}
	}
}
