//! The live page, through [`web_sys`].

use crate::{
	dispatch::{Diagnostics, Dispatcher},
	document::Document,
	error::UpdateError,
};
use js_sys::Function;
use tracing::{instrument, trace_span, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{HtmlCollection, MessageEvent, WebSocket};

/// A [`Document`] backed by a [`web_sys::Document`]. Element handles are the DOM elements themselves.
#[derive(Debug, Clone)]
pub struct WebDocument {
	document: web_sys::Document,
}

impl WebDocument {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self { document }
	}

	/// The current window's document, if there is one.
	#[must_use]
	pub fn from_window() -> Option<Self> {
		web_sys::window()?.document().map(Self::new)
	}
}

fn snapshot(collection: &HtmlCollection) -> Vec<web_sys::Element> {
	(0..collection.length()).filter_map(|i| collection.item(i)).collect()
}

impl Document for WebDocument {
	type Element = web_sys::Element;
	type Error = JsValue;

	fn element_by_id(&self, id: &str) -> Option<web_sys::Element> {
		self.document.get_element_by_id(id)
	}

	fn elements_by_class_name(&self, class_name: &str) -> Vec<web_sys::Element> {
		// The collection is live, so it's copied before anything is mutated.
		snapshot(&self.document.get_elements_by_class_name(class_name))
	}

	fn parse_fragment(&self, html: &str) -> Result<web_sys::Element, JsValue> {
		let container = self.document.create_element("div")?;
		container.set_inner_html(html);
		Ok(container)
	}

	fn descendant_by_id(&self, root: &web_sys::Element, id: &str) -> Option<web_sys::Element> {
		snapshot(&root.get_elements_by_tag_name("*")).into_iter().find(|element| element.id() == id)
	}

	fn class_name(&self, element: &web_sys::Element) -> String {
		element.class_name()
	}

	fn set_class_name(&self, element: &web_sys::Element, class_name: &str) {
		element.set_class_name(class_name)
	}

	fn style_text(&self, element: &web_sys::Element) -> String {
		match element.dyn_ref::<web_sys::HtmlElement>() {
			Some(html_element) => html_element.style().css_text(),
			None => element.get_attribute("style").unwrap_or_default(),
		}
	}

	fn set_style_text(&self, element: &web_sys::Element, style_text: &str) {
		match element.dyn_ref::<web_sys::HtmlElement>() {
			Some(html_element) => html_element.style().set_css_text(style_text),
			None => {
				if let Err(error) = element.set_attribute("style", style_text) {
					warn!("Could not set style attribute: {:?}", error)
				}
			}
		}
	}

	fn attributes(&self, element: &web_sys::Element) -> Vec<(String, String)> {
		let attributes = element.attributes();
		(0..attributes.length())
			.filter_map(|i| attributes.item(i))
			.map(|attribute| (attribute.name(), attribute.value()))
			.collect()
	}

	fn set_attribute(&self, element: &web_sys::Element, name: &str, value: &str) -> Result<(), JsValue> {
		element.set_attribute(name, value)
	}

	fn inner_html(&self, element: &web_sys::Element) -> String {
		element.inner_html()
	}

	fn set_inner_html(&self, element: &web_sys::Element, html: &str) {
		element.set_inner_html(html)
	}

	fn toggle_class(&self, element: &web_sys::Element, token: &str) -> Result<bool, JsValue> {
		element.class_list().toggle(token)
	}
}

/// Forwards the text messages of a [`WebSocket`] to a [`Dispatcher`] for as long as it's alive.
///
/// The socket itself (connecting, reconnecting, closing) stays the caller's business.
/// Dropping the listener unregisters it.
pub struct Listener {
	socket: WebSocket,
	on_message: Closure<dyn FnMut(MessageEvent)>,
}

impl core::fmt::Debug for Listener {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Listener").field("socket", &self.socket).finish_non_exhaustive()
	}
}

/// Replaces `socket`'s `onmessage` handler with one that applies each message through `dispatcher`.
#[must_use = "Dropping the `Listener` unregisters it."]
#[instrument(skip(dispatcher))]
pub fn listen<R: Diagnostics + 'static>(socket: &WebSocket, dispatcher: Dispatcher<WebDocument, R>) -> Listener {
	let on_message = Closure::wrap(Box::new(move |event: MessageEvent| {
		let span = trace_span!("on_message");
		let _enter = span.enter();
		let data = event.data();
		match data.as_string() {
			Some(text) => dispatcher.handle_message(&text),
			None => dispatcher.diagnostics().report(UpdateError::MalformedMessage {
				reason: format!("expected a text message but received {:?}", data),
			}),
		}
	}) as Box<dyn FnMut(MessageEvent)>);
	socket.set_onmessage(Some(on_message.as_ref().unchecked_ref::<Function>()));
	Listener {
		socket: socket.clone(),
		on_message,
	}
}

impl Drop for Listener {
	fn drop(&mut self) {
		// Handlers installed by someone else in the meantime are left alone.
		let ours: &JsValue = self.on_message.as_ref();
		if self.socket.onmessage().map_or(false, |current| JsValue::from(current) == *ours) {
			self.socket.set_onmessage(None)
		}
	}
}
