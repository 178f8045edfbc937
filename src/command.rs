//! The update commands a server can push, in their wire form ([`Envelope`]) and their validated form ([`Command`]).

use crate::error::UpdateError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// One update as it appears on the wire.
///
/// Every field is optional here. Which combinations are meaningful depends on `command`,
/// and is checked when converting into a [`Command`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub command: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub class: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub html: Option<String>,
	#[serde(default, rename = "classNames", skip_serializing_if = "Option::is_none")]
	pub class_names: Option<ClassNames>,
}

impl Envelope {
	/// # Errors
	///
	/// Iff `value` is not an object or one of the known fields has the wrong JSON type.
	pub fn from_value(value: Value) -> Result<Self, UpdateError> {
		serde_json::from_value(value).map_err(|error| UpdateError::MalformedMessage { reason: error.to_string() })
	}

	#[must_use]
	pub fn to_json(&self) -> String {
		serde_json::to_string(self).unwrap_or_default()
	}
}

/// `classNames` is sent either as a list or as one space-separated string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassNames {
	List(Vec<String>),
	Text(String),
}

impl ClassNames {
	/// The individual class tokens, split at whitespace.
	#[must_use]
	pub fn tokens(&self) -> Vec<&str> {
		match self {
			Self::List(list) => list.iter().flat_map(|item| item.split_ascii_whitespace()).collect(),
			Self::Text(text) => text.split_ascii_whitespace().collect(),
		}
	}

	/// The value to write into a `class` attribute.
	/// Text is used verbatim, lists are joined with single spaces.
	#[must_use]
	pub fn to_class_attribute(&self) -> Cow<'_, str> {
		match self {
			Self::List(list) => Cow::Owned(list.join(" ")),
			Self::Text(text) => Cow::Borrowed(text),
		}
	}
}

impl From<&str> for ClassNames {
	fn from(text: &str) -> Self {
		Self::Text(text.to_owned())
	}
}

impl From<Vec<String>> for ClassNames {
	fn from(list: Vec<String>) -> Self {
		Self::List(list)
	}
}

/// The four command tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
	SetElement,
	SetInnerHtml,
	SetClassNames,
	ToggleClassNames,
}

impl CommandKind {
	/// Accepts both the PascalCase tags and the camelCase ones older producers send.
	#[must_use]
	pub fn from_tag(tag: &str) -> Option<Self> {
		Some(match tag {
			"SetElement" | "setElement" => Self::SetElement,
			"SetInnerHTML" | "setInnerHTML" => Self::SetInnerHtml,
			"SetClassNames" | "setClassNames" => Self::SetClassNames,
			"ToggleClassNames" | "toggleClassNames" => Self::ToggleClassNames,
			_ => return None,
		})
	}

	#[must_use]
	pub fn tag(self) -> &'static str {
		match self {
			Self::SetElement => "SetElement",
			Self::SetInnerHtml => "SetInnerHTML",
			Self::SetClassNames => "SetClassNames",
			Self::ToggleClassNames => "ToggleClassNames",
		}
	}
}

/// Which live element(s) a command applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
	/// At most one element, by its `id` attribute.
	Id(String),
	/// Every element that has this class, at the time of resolution.
	Class(String),
}

/// A validated update. Each variant carries exactly the fields its operation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
	SetElement { id: String, html: String },
	SetInnerHtml { target: Target, html: String },
	SetClassNames { id: String, class_names: ClassNames },
	ToggleClassNames { target: Target, class_names: ClassNames },
}

impl Command {
	#[must_use]
	pub fn kind(&self) -> CommandKind {
		match self {
			Self::SetElement { .. } => CommandKind::SetElement,
			Self::SetInnerHtml { .. } => CommandKind::SetInnerHtml,
			Self::SetClassNames { .. } => CommandKind::SetClassNames,
			Self::ToggleClassNames { .. } => CommandKind::ToggleClassNames,
		}
	}
}

impl TryFrom<&Envelope> for Command {
	type Error = UpdateError;

	/// Target forms are tried in order (`id` before `class`) and the first complete one wins.
	/// Empty selectors count as absent.
	fn try_from(envelope: &Envelope) -> Result<Self, Self::Error> {
		let kind = match envelope.command.as_deref().and_then(CommandKind::from_tag) {
			Some(kind) => kind,
			None => {
				return Err(UpdateError::UnknownCommand {
					command: envelope.command.clone(),
				})
			}
		};

		let id = envelope.id.as_deref().filter(|id| !id.is_empty());
		let class = envelope.class.as_deref().filter(|class| !class.is_empty());
		let html = envelope.html.as_deref();
		let class_names = envelope.class_names.as_ref();

		let command = match kind {
			CommandKind::SetElement => match (id, html) {
				(Some(id), Some(html)) => Some(Self::SetElement {
					id: id.to_owned(),
					html: html.to_owned(),
				}),
				_ => None,
			},
			CommandKind::SetInnerHtml => match (id, class, html) {
				(Some(id), _, Some(html)) => Some(Self::SetInnerHtml {
					target: Target::Id(id.to_owned()),
					html: html.to_owned(),
				}),
				(None, Some(class), Some(html)) => Some(Self::SetInnerHtml {
					target: Target::Class(class.to_owned()),
					html: html.to_owned(),
				}),
				_ => None,
			},
			CommandKind::SetClassNames => match (id, class_names) {
				(Some(id), Some(class_names)) => Some(Self::SetClassNames {
					id: id.to_owned(),
					class_names: class_names.clone(),
				}),
				_ => None,
			},
			CommandKind::ToggleClassNames => match (id, class, class_names) {
				(Some(id), _, Some(class_names)) => Some(Self::ToggleClassNames {
					target: Target::Id(id.to_owned()),
					class_names: class_names.clone(),
				}),
				(None, Some(class), Some(class_names)) => Some(Self::ToggleClassNames {
					target: Target::Class(class.to_owned()),
					class_names: class_names.clone(),
				}),
				_ => None,
			},
		};

		command.ok_or_else(|| UpdateError::InvalidCommandData {
			command: kind.tag(),
			envelope: envelope.to_json(),
		})
	}
}

impl From<&Command> for Envelope {
	fn from(command: &Command) -> Self {
		let mut envelope = Envelope {
			command: Some(command.kind().tag().to_owned()),
			..Envelope::default()
		};
		let target = match command {
			Command::SetElement { id, html } => {
				envelope.html = Some(html.clone());
				Target::Id(id.clone())
			}
			Command::SetInnerHtml { target, html } => {
				envelope.html = Some(html.clone());
				target.clone()
			}
			Command::SetClassNames { id, class_names } => {
				envelope.class_names = Some(class_names.clone());
				Target::Id(id.clone())
			}
			Command::ToggleClassNames { target, class_names } => {
				envelope.class_names = Some(class_names.clone());
				target.clone()
			}
		};
		match target {
			Target::Id(id) => envelope.id = Some(id),
			Target::Class(class) => envelope.class = Some(class),
		}
		envelope
	}
}

/// A whole outbound payload, for producers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
	Batch { updates: Vec<Envelope> },
	Single(Envelope),
}

impl Message {
	#[must_use]
	pub fn batch<'a>(commands: impl IntoIterator<Item = &'a Command>) -> Self {
		Self::Batch {
			updates: commands.into_iter().map(Envelope::from).collect(),
		}
	}

	#[must_use]
	pub fn to_json(&self) -> String {
		serde_json::to_string(self).unwrap_or_default()
	}
}

impl From<&Command> for Message {
	fn from(command: &Command) -> Self {
		Self::Single(command.into())
	}
}

/// Splits a decoded inbound payload into its individual (still undecoded) updates, in order.
///
/// An object with an array-valued `updates` field is a batch; any other object is a single update.
///
/// # Errors
///
/// Iff `payload` is not a JSON object.
pub fn split_updates(payload: Value) -> Result<Vec<Value>, UpdateError> {
	let mut object: Map<String, Value> = match payload {
		Value::Object(object) => object,
		other => {
			return Err(UpdateError::MalformedMessage {
				reason: format!("expected a JSON object but found {}", json_kind(&other)),
			})
		}
	};
	match object.remove("updates") {
		Some(Value::Array(updates)) => Ok(updates),
		Some(other) => {
			object.insert("updates".to_owned(), other);
			Ok(vec![Value::Object(object)])
		}
		None => Ok(vec![Value::Object(object)]),
	}
}

fn json_kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}
