use thiserror::Error;
use tracing::Level;

/// Everything that can go wrong while applying a single update.
///
/// None of these escape the envelope they were raised for:
/// the [`Dispatcher`](`crate::dispatch::Dispatcher`) reports them and moves on to the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
	/// The `command` tag is missing or not one of the four known commands.
	#[error("unknown command: {command:?}")]
	UnknownCommand { command: Option<String> },

	/// The command is known, but none of its target forms had all required fields.
	#[error("invalid command data for {command}")]
	InvalidCommandData { command: &'static str, envelope: String },

	/// An `id` selector matched no live element.
	#[error("no element with id {id:?}")]
	TargetNotFound { id: String },

	/// The `html` of a `SetElement` update does not contain an element with the target `id`.
	#[error("newly rendered element does not match expected id {id:?}")]
	MalformedFragment { id: String, html: String },

	/// The payload is not JSON, not an object, or has fields of the wrong type.
	#[error("malformed message: {reason}")]
	MalformedMessage { reason: String },

	/// The host document rejected a mutation.
	#[error("failed to {operation}: {message}")]
	Dom { operation: &'static str, message: String },
}

impl UpdateError {
	/// Missing targets are expected while a page is still being (re-)rendered,
	/// so they are only warned about.
	#[must_use]
	pub fn severity(&self) -> Level {
		match self {
			Self::TargetNotFound { .. } => Level::WARN,
			_ => Level::ERROR,
		}
	}

	pub(crate) fn dom(operation: &'static str, error: impl core::fmt::Debug) -> Self {
		Self::Dom {
			operation,
			message: format!("{:?}", error),
		}
	}
}
