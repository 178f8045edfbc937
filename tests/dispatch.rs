use core::cell::RefCell;
use dom_push::{memory::MemoryDocument, Diagnostics, Dispatcher, Document, UpdateError};
use serde_json::json;

type Reports = RefCell<Vec<UpdateError>>;

fn dispatcher(html: &str) -> Dispatcher<MemoryDocument, Reports> {
	Dispatcher::with_diagnostics(MemoryDocument::from_html(html), Reports::default())
}

fn reports(dispatcher: &Dispatcher<MemoryDocument, Reports>) -> Vec<UpdateError> {
	dispatcher.diagnostics().borrow().clone()
}

#[test]
fn set_inner_html_by_id() {
	let dispatcher = dispatcher(r#"<div id="status">old</div>"#);
	dispatcher.handle_message(r#"{"command":"SetInnerHTML","id":"status","html":"<b>OK</b>"}"#);
	assert_eq!(dispatcher.document().html(), r#"<div id="status"><b>OK</b></div>"#);
	assert!(reports(&dispatcher).is_empty());
}

#[test]
fn set_inner_html_by_class() {
	let dispatcher = dispatcher(r#"<p class="t">1</p><p class="t u">2</p><p>3</p>"#);
	dispatcher.handle_message(r#"{"command":"SetInnerHTML","class":"t","html":"x"}"#);
	assert_eq!(dispatcher.document().html(), r#"<p class="t">x</p><p class="t u">x</p><p>3</p>"#);
}

#[test]
fn set_then_toggle_in_one_batch() {
	let dispatcher = dispatcher(r#"<p id="a" class="old"></p>"#);
	dispatcher.handle_message(
		r#"{"updates":[{"command":"SetClassNames","id":"a","classNames":"x y"},{"command":"ToggleClassNames","id":"a","classNames":["x"]}]}"#,
	);
	let document = dispatcher.document();
	assert_eq!(document.class_name(&document.element_by_id("a").unwrap()), "y");
	assert!(reports(&dispatcher).is_empty());
}

#[test]
fn toggle_by_class_applies_to_each_element() {
	let dispatcher = dispatcher(r#"<li class="tab"></li><li class="tab"></li><li class="tab"></li>"#);
	dispatcher.handle_message(r#"{"command":"ToggleClassNames","class":"tab","classNames":["active"]}"#);
	let document = dispatcher.document();
	let tabs = document.elements_by_class_name("tab");
	assert_eq!(tabs.len(), 3);
	assert!(tabs.iter().all(|&tab| document.has_class(tab, "active")));
}

#[test]
fn toggle_is_its_own_inverse() {
	let dispatcher = dispatcher(r#"<p id="a" class="x z"></p>"#);
	let a = dispatcher.document().element_by_id("a").unwrap();
	let toggle = json!({"command": "ToggleClassNames", "id": "a", "classNames": ["x", "y"]});

	dispatcher.handle_value(toggle.clone());
	assert!(!dispatcher.document().has_class(a, "x"));
	assert!(dispatcher.document().has_class(a, "y"));
	assert!(dispatcher.document().has_class(a, "z"));

	dispatcher.handle_value(toggle);
	assert!(dispatcher.document().has_class(a, "x"));
	assert!(!dispatcher.document().has_class(a, "y"));
	assert!(dispatcher.document().has_class(a, "z"));
}

#[test]
fn set_class_names_replaces_everything() {
	for prior in ["", r#" class="a b c""#, r#" class="x""#] {
		let dispatcher = dispatcher(&format!(r#"<p id="a"{}></p>"#, prior));
		dispatcher.handle_value(json!({"command": "SetClassNames", "id": "a", "classNames": ["x", "w"]}));
		let document = dispatcher.document();
		assert_eq!(document.class_name(&document.element_by_id("a").unwrap()), "x w");
	}
}

#[test]
fn set_element_keeps_the_live_node() {
	let dispatcher = dispatcher(r#"<ul><li id="row" class="old" style="color: red" data-keep="1">old</li><li>next</li></ul>"#);
	let before = dispatcher.document().element_by_id("row").unwrap();
	let parent = dispatcher.document().parent(before);

	dispatcher.handle_value(json!({
		"command": "SetElement",
		"id": "row",
		"html": r#"<li id="row" class="new" style="color: blue" data-x="2"><b>new</b></li>"#
	}));

	let document = dispatcher.document();
	let after = document.element_by_id("row").unwrap();
	assert_eq!(before, after);
	assert_eq!(document.parent(after), parent);
	assert!(document.is_connected(after));
	assert_eq!(
		document.html(),
		r#"<ul><li id="row" class="new" style="color: blue" data-keep="1" data-x="2"><b>new</b></li><li>next</li></ul>"#
	);
	assert!(reports(&dispatcher).is_empty());
}

#[test]
fn set_element_finds_nested_replacement() {
	let dispatcher = dispatcher(r#"<span id="t">1</span>"#);
	dispatcher.handle_value(json!({"command": "SetElement", "id": "t", "html": r#"<div><span id="t">2</span></div>"#}));
	// Like `element.className = ""` in a browser, this leaves an empty `class` attribute.
	assert_eq!(dispatcher.document().html(), r#"<span id="t" class="">2</span>"#);
}

#[test]
fn set_element_without_matching_id_changes_nothing() {
	let html = r#"<div id="t" class="c">content</div>"#;
	let dispatcher = dispatcher(html);
	dispatcher.handle_value(json!({"command": "SetElement", "id": "t", "html": r#"<div id="other" class="d">new</div>"#}));
	assert_eq!(dispatcher.document().html(), html);
	assert_eq!(
		reports(&dispatcher),
		[UpdateError::MalformedFragment {
			id: "t".to_owned(),
			html: r#"<div id="other" class="d">new</div>"#.to_owned(),
		}]
	);
}

#[test]
fn unknown_command_mutates_nothing_and_reports_once() {
	let html = r#"<p id="a" class="x">1</p>"#;
	for command in [json!("Explode"), json!("setelement"), json!(null)] {
		let dispatcher = dispatcher(html);
		dispatcher.handle_value(json!({"command": command, "id": "a", "html": "2", "classNames": ["y"]}));
		assert_eq!(dispatcher.document().html(), html);
		let reports = reports(&dispatcher);
		assert_eq!(reports.len(), 1);
		assert!(matches!(reports[0], UpdateError::UnknownCommand { .. }));
	}
}

#[test]
fn invalid_command_data() {
	let html = r#"<p id="a" class="x">1</p>"#;
	let invalid = [
		json!({"command": "SetElement", "class": "x", "html": "<p id=\"a\"></p>"}),
		json!({"command": "SetElement", "id": "a"}),
		json!({"command": "SetInnerHTML", "id": "a"}),
		json!({"command": "SetInnerHTML", "html": "2"}),
		json!({"command": "SetClassNames", "class": "x", "classNames": ["y"]}),
		json!({"command": "ToggleClassNames", "id": "a"}),
		json!({"command": "ToggleClassNames", "id": "", "class": "", "classNames": ["y"]}),
	];
	for envelope in invalid {
		let dispatcher = dispatcher(html);
		dispatcher.handle_value(envelope.clone());
		assert_eq!(dispatcher.document().html(), html, "{}", envelope);
		let reports = reports(&dispatcher);
		assert_eq!(reports.len(), 1, "{}", envelope);
		assert!(matches!(reports[0], UpdateError::InvalidCommandData { .. }), "{}", envelope);
	}
}

#[test]
fn missing_targets() {
	let html = r#"<p id="a">1</p>"#;
	let dispatcher = dispatcher(html);
	dispatcher.handle_value(json!({"updates": [
		{"command": "SetInnerHTML", "id": "nope", "html": "2"},
		{"command": "SetInnerHTML", "class": "nope", "html": "2"},
		{"command": "ToggleClassNames", "class": "nope", "classNames": ["y"]}
	]}));
	assert_eq!(dispatcher.document().html(), html);
	assert_eq!(reports(&dispatcher), [UpdateError::TargetNotFound { id: "nope".to_owned() }]);
	assert_eq!(reports(&dispatcher)[0].severity(), tracing::Level::WARN);
}

#[test]
fn failures_stay_local_to_their_envelope() {
	let dispatcher = dispatcher(r#"<p id="a">1</p><p id="b">2</p>"#);
	dispatcher.handle_value(json!({"updates": [
		{"command": "SetInnerHTML", "id": "a", "html": "x"},
		{"command": "Explode"},
		{"command": "SetInnerHTML", "id": 5, "html": "y"},
		"not an object",
		{"command": "SetClassNames", "id": "missing", "classNames": "c"},
		{"command": "SetInnerHTML", "id": "b", "html": "z"}
	]}));
	assert_eq!(dispatcher.document().html(), r#"<p id="a">x</p><p id="b">z</p>"#);

	let reports = reports(&dispatcher);
	assert_eq!(reports.len(), 4);
	assert!(matches!(reports[0], UpdateError::UnknownCommand { .. }));
	assert!(matches!(reports[1], UpdateError::MalformedMessage { .. }));
	assert!(matches!(reports[2], UpdateError::MalformedMessage { .. }));
	assert!(matches!(reports[3], UpdateError::TargetNotFound { .. }));
}

#[test]
fn malformed_messages() {
	let dispatcher = dispatcher("");
	dispatcher.handle_message("{not json");
	dispatcher.handle_message("[]");
	dispatcher.handle_message("\"SetElement\"");
	let reports = reports(&dispatcher);
	assert_eq!(reports.len(), 3);
	assert!(reports.iter().all(|report| matches!(report, UpdateError::MalformedMessage { .. })));
}

#[test]
fn rejected_attributes_do_not_stop_the_refresh() {
	let dispatcher = dispatcher(r#"<p id="t" class="c">1</p>"#);
	dispatcher.handle_value(json!({"command": "SetElement", "id": "t", "html": r#"<p id="t" class="d" a"b="1" data-ok="2">new</p>"#}));
	assert_eq!(dispatcher.document().html(), r#"<p id="t" class="d" data-ok="2">new</p>"#);
	let reports = reports(&dispatcher);
	assert_eq!(reports.len(), 1);
	assert!(matches!(reports[0], UpdateError::Dom { operation: "set attribute", .. }));
}

#[test]
fn legacy_producer_messages() {
	// What older servers push for a setpoint change.
	let dispatcher = dispatcher(r#"<span id="setpoint-value">20</span>"#);
	dispatcher.handle_message(r#"{"command":"setInnerHTML","id":"setpoint-value","html":"21"}"#);
	assert_eq!(dispatcher.document().html(), r#"<span id="setpoint-value">21</span>"#);
}

#[test]
fn diagnostics_by_reference() {
	let reports = Reports::default();
	let dispatcher = Dispatcher::with_diagnostics(MemoryDocument::new(), &reports);
	dispatcher.handle_message("{}");
	drop(dispatcher);
	assert_eq!(reports.into_inner(), [UpdateError::UnknownCommand { command: None }]);

	fn assert_diagnostics<R: Diagnostics>(_: &R) {}
	assert_diagnostics(&dom_push::TracingDiagnostics);
}

#[test]
fn repeated_updates_are_idempotent() {
	let dispatcher = dispatcher(
		r#"<div id="card" class="a"><span id="t" style="color: red">1</span></div><p id="s">s</p><i class="k">k</i><i class="k">k</i><b id="c" class="x"></b>"#,
	);
	let updates = json!({"updates": [
		{"command": "SetElement", "id": "t", "html": r#"<div><span id="t" class="n" data-v="2">2</span></div>"#},
		{"command": "SetInnerHTML", "id": "s", "html": "<em>new</em>"},
		{"command": "SetInnerHTML", "class": "k", "html": "<u>u</u>"},
		{"command": "SetClassNames", "id": "c", "classNames": ["y", "z"]}
	]});

	dispatcher.handle_value(updates.clone());
	let once = dispatcher.document().html();
	assert_eq!(
		once,
		r#"<div id="card" class="a"><span id="t" style="" class="n" data-v="2">2</span></div><p id="s"><em>new</em></p><i class="k"><u>u</u></i><i class="k"><u>u</u></i><b id="c" class="y z"></b>"#
	);

	dispatcher.handle_value(updates);
	assert_eq!(dispatcher.document().html(), once);
	assert!(reports(&dispatcher).is_empty());
}

#[test]
fn repeated_refreshes_do_not_grow_the_document() {
	let dispatcher = dispatcher(r#"<p id="a">x</p>"#);
	assert_eq!(dispatcher.document().node_count(), 3);
	for _ in 0..1000 {
		dispatcher.handle_message(r#"{"command":"SetElement","id":"a","html":"<p id=\"a\">x</p>"}"#);
	}
	assert_eq!(dispatcher.document().node_count(), 3);

	// The fragment is released even if it turns out not to contain the target.
	dispatcher.handle_message(r#"{"command":"SetElement","id":"a","html":"<p id=\"b\">x</p>"}"#);
	assert_eq!(dispatcher.document().node_count(), 3);
	assert_eq!(reports(&dispatcher).len(), 1);
}
