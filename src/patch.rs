//! The four mutations. Each one resolves its own targets and touches nothing if resolution fails.

use crate::{
	command::{ClassNames, Target},
	document::{resolve, resolve_by_id, Document},
	error::UpdateError,
};
use tracing::{instrument, trace, trace_span, warn};

/// Refreshes the element `id` in place from the element with the same `id` inside `html`.
///
/// The live element is kept (so anything bound to it stays bound). Its class and inline style are replaced,
/// the replacement's attributes are copied over it (attributes it doesn't have are left alone)
/// and its content is replaced.
///
/// # Errors
///
/// - [`UpdateError::TargetNotFound`] if there is no live element `id`,
/// - [`UpdateError::MalformedFragment`] if `html` contains no element `id` (the live element is left untouched),
/// - [`UpdateError::Dom`] for the first attribute the host refused. The remaining ones are still copied.
#[instrument(skip(document, html))]
pub fn set_element<D: Document + ?Sized>(document: &D, id: &str, html: &str) -> Result<(), UpdateError> {
	let target = resolve_by_id(document, id).ok_or_else(|| UpdateError::TargetNotFound { id: id.to_owned() })?;

	let container = document.parse_fragment(html).map_err(|error| UpdateError::dom("parse fragment", error))?;
	let result = refresh(document, &target, &container, id, html);
	document.release_fragment(&container);
	result
}

fn refresh<D: Document + ?Sized>(document: &D, target: &D::Element, container: &D::Element, id: &str, html: &str) -> Result<(), UpdateError> {
	let replacement = document.descendant_by_id(container, id).ok_or_else(|| UpdateError::MalformedFragment {
		id: id.to_owned(),
		html: html.to_owned(),
	})?;

	document.set_class_name(target, &document.class_name(&replacement));
	document.set_style_text(target, &document.style_text(&replacement));

	let mut first_error = None;
	for (name, value) in document.attributes(&replacement) {
		if let Err(error) = document.set_attribute(target, &name, &value) {
			warn!("Could not copy attribute {:?}: {:?}", name, error);
			first_error.get_or_insert_with(|| UpdateError::dom("set attribute", error));
		}
	}

	document.set_inner_html(target, &document.inner_html(&replacement));
	first_error.map_or(Ok(()), Err)
}

/// Replaces the content of every target with `html`, verbatim.
///
/// # Errors
///
/// [`UpdateError::TargetNotFound`] iff `target` is an `id` that matches nothing.
#[instrument(skip(document, html))]
pub fn set_inner_html<D: Document + ?Sized>(document: &D, target: &Target, html: &str) -> Result<(), UpdateError> {
	for element in resolve(document, target)? {
		trace!(?element, "Setting inner HTML.");
		document.set_inner_html(&element, html);
	}
	Ok(())
}

/// Overwrites the whole `class` attribute of element `id`.
///
/// # Errors
///
/// [`UpdateError::TargetNotFound`] iff there is no element `id`.
#[cfg_attr(feature = "dangerous-logging", instrument(skip(document)))]
#[cfg_attr(not(feature = "dangerous-logging"), instrument(skip(document, class_names)))]
pub fn set_class_names<D: Document + ?Sized>(document: &D, id: &str, class_names: &ClassNames) -> Result<(), UpdateError> {
	let element = resolve_by_id(document, id).ok_or_else(|| UpdateError::TargetNotFound { id: id.to_owned() })?;
	document.set_class_name(&element, &class_names.to_class_attribute());
	Ok(())
}

/// Flips each token of `class_names` on each target, independently.
///
/// Not idempotent: applying the same toggle twice restores the original classes.
///
/// # Errors
///
/// - [`UpdateError::TargetNotFound`] iff `target` is an `id` that matches nothing,
/// - [`UpdateError::Dom`] for the first token the host refused. All other tokens and targets are still toggled.
#[cfg_attr(feature = "dangerous-logging", instrument(skip(document)))]
#[cfg_attr(not(feature = "dangerous-logging"), instrument(skip(document, class_names)))]
pub fn toggle_class_names<D: Document + ?Sized>(document: &D, target: &Target, class_names: &ClassNames) -> Result<(), UpdateError> {
	let tokens = class_names.tokens();
	let mut first_error = None;
	for element in resolve(document, target)? {
		let span = trace_span!("Toggling classes", ?element);
		let _enter = span.enter();
		for &token in &tokens {
			match document.toggle_class(&element, token) {
				Ok(present) if cfg!(feature = "dangerous-logging") => trace!(token, present, "Toggled class."),
				Ok(present) => trace!(present, "Toggled class."),
				Err(error) => {
					if cfg!(feature = "dangerous-logging") {
						warn!("Could not toggle class {:?}: {:?}", token, error)
					} else {
						warn!("Could not toggle class: {:?}", error)
					}
					first_error.get_or_insert_with(|| UpdateError::dom("toggle class", error));
				}
			}
		}
	}
	first_error.map_or(Ok(()), Err)
}
