//! The capabilities this crate needs from the page it patches, and target resolution on top of them.

use crate::{command::Target, error::UpdateError};
use core::fmt::Debug;
use tracing::trace;

/// A live document tree.
///
/// All methods take `&self`: implementations wrap a host that is mutated through shared handles,
/// like the browser DOM. Element handles must keep referring to the same node when it is mutated.
pub trait Document {
	/// A handle to one element. Cloning the handle must not clone the element.
	type Element: Clone + Debug;
	type Error: Debug;

	fn element_by_id(&self, id: &str) -> Option<Self::Element>;

	/// A snapshot of the elements currently having `class_name`, in document order.
	fn elements_by_class_name(&self, class_name: &str) -> Vec<Self::Element>;

	/// Parses `html` into a new, detached container element.
	///
	/// # Errors
	///
	/// Iff the host can't create the container.
	fn parse_fragment(&self, html: &str) -> Result<Self::Element, Self::Error>;

	/// Called once a container from [`parse_fragment`](`Document::parse_fragment`) is no longer needed.
	///
	/// Hosts that don't collect detached nodes on their own should free it here.
	fn release_fragment(&self, container: &Self::Element) {
		let _ = container;
	}

	/// Searches the descendants of `root` (excluding `root` itself).
	fn descendant_by_id(&self, root: &Self::Element, id: &str) -> Option<Self::Element>;

	fn class_name(&self, element: &Self::Element) -> String;
	fn set_class_name(&self, element: &Self::Element, class_name: &str);

	/// The element's inline style declarations as text.
	fn style_text(&self, element: &Self::Element) -> String;
	fn set_style_text(&self, element: &Self::Element, style_text: &str);

	/// `(name, value)` pairs, in attribute order.
	fn attributes(&self, element: &Self::Element) -> Vec<(String, String)>;

	/// # Errors
	///
	/// Iff the host rejects `name`.
	fn set_attribute(&self, element: &Self::Element, name: &str, value: &str) -> Result<(), Self::Error>;

	fn inner_html(&self, element: &Self::Element) -> String;
	fn set_inner_html(&self, element: &Self::Element, html: &str);

	/// Removes `token` from the element's class list if present, adds it otherwise.
	/// Returns whether it is present afterwards.
	///
	/// # Errors
	///
	/// Iff `token` is not a valid class token (empty or containing whitespace).
	fn toggle_class(&self, element: &Self::Element, token: &str) -> Result<bool, Self::Error>;
}

pub fn resolve_by_id<D: Document + ?Sized>(document: &D, id: &str) -> Option<D::Element> {
	let element = document.element_by_id(id);
	trace!(id, found = element.is_some(), "Resolved id.");
	element
}

pub fn resolve_by_class<D: Document + ?Sized>(document: &D, class_name: &str) -> Vec<D::Element> {
	let elements = document.elements_by_class_name(class_name);
	trace!(class_name, count = elements.len(), "Resolved class.");
	elements
}

/// Resolves `target` into its target set.
///
/// # Errors
///
/// [`UpdateError::TargetNotFound`] iff an `id` target matches nothing.
/// A `class` target matching nothing is an empty set instead.
pub fn resolve<D: Document + ?Sized>(document: &D, target: &Target) -> Result<Vec<D::Element>, UpdateError> {
	match target {
		Target::Id(id) => resolve_by_id(document, id)
			.map(|element| vec![element])
			.ok_or_else(|| UpdateError::TargetNotFound { id: id.clone() }),
		Target::Class(class_name) => Ok(resolve_by_class(document, class_name)),
	}
}
