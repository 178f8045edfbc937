//! A [`Document`] that lives entirely in memory.
//!
//! Useful for tests and for hosts that keep their own model of a page.
//! Markup is parsed with [`scraper`] (and so follows the HTML5 tree construction rules).
//!
//! Element handles are [`NodeId`]s. Removed nodes are freed and their slots reused,
//! but a handle never refers to another node than the one it was created for:
//! once its node is gone, lookups through it come up empty.

use crate::document::Document;
use core::{
	cell::RefCell,
	sync::atomic::{AtomicU64, Ordering},
};
use scraper::{ElementRef, Html, Node as ParsedNode};
use slab::Slab;
use thiserror::Error;
use tracing::trace;

mod html;

use html::{RAW_TEXT_ELEMENTS, VOID_ELEMENTS};

/// Shared by all documents, so that handles from one document never match a node of another.
static NEXT_SERIAL: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
	key: usize,
	serial: u64,
}

#[derive(Debug, Clone)]
enum NodeKind {
	Element { tag: String, attributes: Vec<(String, String)> },
	Text(String),
	Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
	serial: u64,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
	kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
	#[error("{0:?} is not an element")]
	NotAnElement(NodeId),
	#[error("invalid character in {0:?}")]
	InvalidCharacter(String),
	#[error("empty class token")]
	EmptyToken,
}

#[derive(Debug, Clone, Default)]
struct Tree {
	nodes: Slab<Node>,
}

impl Tree {
	fn node(&self, id: NodeId) -> Option<&Node> {
		self.nodes.get(id.key).filter(|node| node.serial == id.serial)
	}

	fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
		self.nodes.get_mut(id.key).filter(|node| node.serial == id.serial)
	}

	fn children(&self, id: NodeId) -> &[NodeId] {
		match self.node(id) {
			Some(node) => node.children.as_slice(),
			None => &[],
		}
	}

	fn push(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
		let serial = NEXT_SERIAL.fetch_add(1, Ordering::Relaxed);
		let key = self.nodes.insert(Node {
			serial,
			parent,
			children: Vec::new(),
			kind,
		});
		let id = NodeId { key, serial };
		if let Some(parent) = parent.and_then(|parent| self.node_mut(parent)) {
			parent.children.push(id);
		}
		id
	}

	fn tag(&self, id: NodeId) -> Option<&str> {
		match &self.node(id)?.kind {
			NodeKind::Element { tag, .. } => Some(tag.as_str()),
			_ => None,
		}
	}

	fn attributes(&self, id: NodeId) -> &[(String, String)] {
		match self.node(id).map(|node| &node.kind) {
			Some(NodeKind::Element { attributes, .. }) => attributes.as_slice(),
			_ => &[],
		}
	}

	fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
		self.attributes(id).iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
	}

	fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), MemoryError> {
		let attributes = match self.node_mut(id).map(|node| &mut node.kind) {
			Some(NodeKind::Element { attributes, .. }) => attributes,
			_ => return Err(MemoryError::NotAnElement(id)),
		};
		match attributes.iter_mut().find(|(n, _)| n == name) {
			Some((_, existing)) => value.clone_into(existing),
			None => attributes.push((name.to_owned(), value.to_owned())),
		}
		Ok(())
	}

	/// Parses `html` in the context of a `<body>` and appends the resulting nodes to `parent`.
	fn append_fragment(&mut self, parent: NodeId, html: &str) {
		let fragment = Html::parse_fragment(html);
		self.import_children(parent, fragment.root_element());
	}

	fn import_children(&mut self, parent: NodeId, source: ElementRef<'_>) {
		for child in source.children() {
			match child.value() {
				ParsedNode::Element(element) => {
					let attributes = element.attrs().map(|(name, value)| (name.to_owned(), value.to_owned())).collect();
					let imported = self.push(
						Some(parent),
						NodeKind::Element {
							tag: element.name().to_owned(),
							attributes,
						},
					);
					if let Some(element) = ElementRef::wrap(child) {
						self.import_children(imported, element);
					}
				}
				ParsedNode::Text(text) => {
					self.push(Some(parent), NodeKind::Text(text.to_string()));
				}
				ParsedNode::Comment(comment) => {
					self.push(Some(parent), NodeKind::Comment(comment.to_string()));
				}
				_ => {}
			}
		}
	}

	/// Frees `root` and everything below it, unlinking it from its parent first.
	fn remove(&mut self, root: NodeId) {
		let parent = match self.node(root) {
			Some(node) => node.parent,
			None => return,
		};
		let mut doomed = vec![root];
		doomed.extend(self.descendants(root));
		if let Some(parent) = parent {
			if let Some(parent) = self.node_mut(parent) {
				parent.children.retain(|&child| child != root);
			}
		}
		for id in doomed {
			self.nodes.try_remove(id.key);
		}
	}

	fn remove_children(&mut self, id: NodeId) {
		let children = match self.node_mut(id) {
			Some(node) => core::mem::take(&mut node.children),
			None => return,
		};
		for child in children {
			if let Some(node) = self.node_mut(child) {
				node.parent = None;
			}
			self.remove(child);
		}
	}

	/// Descendants of `root` in document order, excluding `root`.
	fn descendants(&self, root: NodeId) -> impl Iterator<Item = NodeId> + '_ {
		let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
		core::iter::from_fn(move || {
			let id = stack.pop()?;
			stack.extend(self.children(id).iter().rev().copied());
			Some(id)
		})
	}

	fn serialize_children(&self, id: NodeId, out: &mut String) {
		let raw_text = self.tag(id).map_or(false, |tag| RAW_TEXT_ELEMENTS.contains(&tag));
		for &child in self.children(id) {
			let kind = match self.node(child) {
				Some(node) => &node.kind,
				None => continue,
			};
			match kind {
				NodeKind::Element { tag, attributes } => {
					out.push('<');
					out.push_str(tag);
					for (name, value) in attributes {
						out.push(' ');
						out.push_str(name);
						out.push_str("=\"");
						html::escape_attribute(value, out);
						out.push('"');
					}
					out.push('>');
					if !VOID_ELEMENTS.contains(&tag.as_str()) {
						self.serialize_children(child, out);
						out.push_str("</");
						out.push_str(tag);
						out.push('>');
					}
				}
				NodeKind::Text(text) if raw_text => out.push_str(text),
				NodeKind::Text(text) => html::escape_text(text, out),
				NodeKind::Comment(comment) => {
					out.push_str("<!--");
					out.push_str(comment);
					out.push_str("-->");
				}
			}
		}
	}
}

fn class_tokens(class_name: &str) -> impl Iterator<Item = &str> {
	class_name.split_ascii_whitespace()
}

/// An in-memory document tree rooted at a `<body>` element.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
	tree: RefCell<Tree>,
	body: NodeId,
}

impl Default for MemoryDocument {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryDocument {
	#[must_use]
	pub fn new() -> Self {
		let mut tree = Tree::default();
		let body = tree.push(
			None,
			NodeKind::Element {
				tag: "body".to_owned(),
				attributes: Vec::new(),
			},
		);
		Self {
			tree: RefCell::new(tree),
			body,
		}
	}

	/// A document whose body contains `html`.
	#[must_use]
	pub fn from_html(html: &str) -> Self {
		let document = Self::new();
		document.tree.borrow_mut().append_fragment(document.body, html);
		document
	}

	#[must_use]
	pub fn body(&self) -> NodeId {
		self.body
	}

	/// The body's content as markup.
	#[must_use]
	pub fn html(&self) -> String {
		self.inner_html(&self.body)
	}

	/// How many nodes the document holds, including detached ones and the body itself.
	#[must_use]
	pub fn node_count(&self) -> usize {
		self.tree.borrow().nodes.len()
	}

	#[must_use]
	pub fn parent(&self, node: NodeId) -> Option<NodeId> {
		self.tree.borrow().node(node)?.parent
	}

	/// Whether `node` is (still) part of the body's tree.
	#[must_use]
	pub fn is_connected(&self, node: NodeId) -> bool {
		let tree = self.tree.borrow();
		let mut current = node;
		loop {
			if current == self.body {
				return true;
			}
			match tree.node(current).and_then(|node| node.parent) {
				Some(parent) => current = parent,
				None => return false,
			}
		}
	}

	#[must_use]
	pub fn tag_name(&self, node: NodeId) -> Option<String> {
		self.tree.borrow().tag(node).map(str::to_owned)
	}

	#[must_use]
	pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
		self.tree.borrow().attribute(node, name).map(str::to_owned)
	}

	/// Whether the element's class list contains `token`.
	#[must_use]
	pub fn has_class(&self, node: NodeId, token: &str) -> bool {
		class_tokens(&self.class_name(&node)).any(|t| t == token)
	}

	fn find_descendant(&self, root: NodeId, id: &str) -> Option<NodeId> {
		let tree = self.tree.borrow();
		let found = tree.descendants(root).find(|&node| tree.attribute(node, "id") == Some(id));
		found
	}
}

impl Document for MemoryDocument {
	type Element = NodeId;
	type Error = MemoryError;

	fn element_by_id(&self, id: &str) -> Option<NodeId> {
		self.find_descendant(self.body, id)
	}

	/// Like the DOM, matches elements having all of the whitespace-separated classes in `class_name`.
	fn elements_by_class_name(&self, class_name: &str) -> Vec<NodeId> {
		let wanted: Vec<&str> = class_tokens(class_name).collect();
		if wanted.is_empty() {
			return Vec::new();
		}
		let tree = self.tree.borrow();
		let elements = tree
			.descendants(self.body)
			.filter(|&node| {
				tree.attribute(node, "class")
					.map_or(false, |classes| wanted.iter().all(|w| class_tokens(classes).any(|t| t == *w)))
			})
			.collect();
		elements
	}

	fn parse_fragment(&self, html: &str) -> Result<NodeId, MemoryError> {
		let mut tree = self.tree.borrow_mut();
		let container = tree.push(
			None,
			NodeKind::Element {
				tag: "div".to_owned(),
				attributes: Vec::new(),
			},
		);
		tree.append_fragment(container, html);
		trace!(?container, "Parsed detached fragment.");
		Ok(container)
	}

	fn descendant_by_id(&self, root: &NodeId, id: &str) -> Option<NodeId> {
		self.find_descendant(*root, id)
	}

	fn class_name(&self, element: &NodeId) -> String {
		self.attribute(*element, "class").unwrap_or_default()
	}

	fn set_class_name(&self, element: &NodeId, class_name: &str) {
		// Never fails for elements, and handles only ever denote elements.
		let _ = self.tree.borrow_mut().set_attribute(*element, "class", class_name);
	}

	fn style_text(&self, element: &NodeId) -> String {
		self.attribute(*element, "style").unwrap_or_default()
	}

	fn set_style_text(&self, element: &NodeId, style_text: &str) {
		let mut tree = self.tree.borrow_mut();
		if style_text.is_empty() && tree.attribute(*element, "style").is_none() {
			return;
		}
		let _ = tree.set_attribute(*element, "style", style_text);
	}

	fn attributes(&self, element: &NodeId) -> Vec<(String, String)> {
		self.tree.borrow().attributes(*element).to_vec()
	}

	fn set_attribute(&self, element: &NodeId, name: &str, value: &str) -> Result<(), MemoryError> {
		if name.is_empty() || name.contains(|c: char| c.is_ascii_whitespace() || matches!(c, '"' | '\'' | '>' | '/' | '=' | '<')) {
			return Err(MemoryError::InvalidCharacter(name.to_owned()));
		}
		self.tree.borrow_mut().set_attribute(*element, &name.to_ascii_lowercase(), value)
	}

	fn inner_html(&self, element: &NodeId) -> String {
		let mut out = String::new();
		self.tree.borrow().serialize_children(*element, &mut out);
		out
	}

	fn set_inner_html(&self, element: &NodeId, html: &str) {
		let mut tree = self.tree.borrow_mut();
		if tree.tag(*element).is_none() {
			return;
		}
		tree.remove_children(*element);
		tree.append_fragment(*element, html);
	}

	fn release_fragment(&self, container: &NodeId) {
		let mut tree = self.tree.borrow_mut();
		if *container != self.body && tree.node(*container).map_or(false, |node| node.parent.is_none()) {
			tree.remove(*container);
			trace!(?container, "Released fragment.");
		}
	}

	fn toggle_class(&self, element: &NodeId, token: &str) -> Result<bool, MemoryError> {
		if token.is_empty() {
			return Err(MemoryError::EmptyToken);
		}
		if token.contains(|c: char| c.is_ascii_whitespace()) {
			return Err(MemoryError::InvalidCharacter(token.to_owned()));
		}

		// The class list is an ordered set, so duplicates disappear on write.
		let mut tokens: Vec<String> = Vec::new();
		for t in class_tokens(&self.class_name(element)) {
			if !tokens.iter().any(|existing| existing == t) {
				tokens.push(t.to_owned())
			}
		}
		let present = match tokens.iter().position(|t| t == token) {
			Some(index) => {
				tokens.remove(index);
				false
			}
			None => {
				tokens.push(token.to_owned());
				true
			}
		};
		self.tree.borrow_mut().set_attribute(*element, "class", &tokens.join(" "))?;
		Ok(present)
	}
}
