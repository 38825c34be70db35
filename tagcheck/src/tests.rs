// SPDX-License-Identifier: MIT OR Apache-2.0
use crate::lexer::LexerError;
use crate::{
	Callback, Invalidation, LineColumn, Reason, RecoveryPolicy, Registry, Settings, SweepPolicy,
	TagRule, Validator, Violation,
};

fn rules() -> Registry {
	[
		TagRule::new("a").attribute("href").self_closing(true),
		TagRule::new("b").attribute("id"),
		TagRule::new("c").attribute("id"),
		TagRule::new("style").attribute("id"),
	]
	.into_iter()
	.collect()
}

fn validator() -> Validator { Validator::new(rules()) }

fn messages(violations: &[Violation]) -> Vec<String> {
	violations.iter().map(ToString::to_string).collect()
}

fn check(text: &str, expected: &[&str]) {
	let violations = validator().validate(text).unwrap();
	assert_eq!(messages(&violations), expected, "violations of {text:?}");
}

#[test]
fn single_tag() { check("<a></a>", &[]); }

#[test]
fn self_closing_tag() { check("<a>", &[]); }

#[test]
fn single_attribute() { check("<a href='test'>", &[]); }

#[test]
fn unknown_attribute() { check("<a hrefff='test'>", &["invalid attribute 'hrefff' in tag 'a' at 1:2"]); }

#[test]
fn duplicated_attribute() {
	check("<a href='test' href='test2'>", &["duplicated attribute 'href' in 'a' at 1:2"]);
}

#[test]
fn unknown_tag() {
	check(
		"<art>",
		&["tag 'art' is not valid at 1:2", "tag 'art' is not properly closed at 1:2"],
	);
}

#[test]
fn unclosed_tag() { check("<b>df", &["tag 'b' is not properly closed at 1:2"]); }

#[test]
fn nested_tags() { check("<b><a></a></b>", &[]); }

#[test]
fn wrongly_nested_tags() {
	// `</b>` closes c along with b, so the trailing `</c>` is a dangling
	// end tag and gets reported like any other
	check(
		"<b><c></b></c>",
		&[
			"tag 'c' is not properly closed at 1:5",
			"close tag 'c' was not opened before close tag at 1:13",
		],
	);
}

#[test]
fn swapped_start_and_end() {
	check(
		"</b><b>",
		&[
			"close tag 'b' was not opened before close tag at 1:3",
			"tag 'b' is not properly closed at 1:6",
		],
	);
}

#[test]
fn nested_with_self_closing() { check("<b><a></b>", &[]); }

#[test]
fn nested_unknown_attribute() {
	check("<b kkk='kkk'><a></b>", &["invalid attribute 'kkk' in tag 'b' at 1:2"]);
	check("<b><a kkk='kkk'></b>", &["invalid attribute 'kkk' in tag 'a' at 1:5"]);
}

#[test]
fn multiple_lines() {
	let violations = validator()
		.validate("<b></b>\n<b></b>\n<b kkk='kkk'></b>")
		.unwrap();
	assert_eq!(violations.len(), 1, "one violation");
	assert_eq!(
		violations[0].position,
		Some(LineColumn { line: 3, column: 2 }),
		"third line"
	);
	assert_eq!(violations[0].span, 17..18, "byte span");
}

#[test]
fn raw_text_is_not_markup() { check("<style id=s>p > <x> {}</style>", &[]); }

#[test]
fn comments_are_not_markup() { check("<b><!-- <x> </b> --></b>", &[]); }

#[test]
fn case_insensitive() { check("<B ID=x></b>", &[]); }

#[test]
fn queries() {
	let validator = validator();
	assert!(validator.is_valid_attribute("a", "href"), "allowed");
	assert!(!validator.is_valid_attribute("kkk", "href"), "unknown tag");
	assert!(!validator.is_valid_attribute("b", "href"), "other tag's attribute");
	assert!(validator.is_valid_tag("style"), "known tag");
	assert!(!validator.is_valid_tag("art"), "unknown tag");
	assert!(validator.is_self_closing_tag("a"), "self-closing");
	assert!(!validator.is_self_closing_tag("b"), "not self-closing");
}

#[test]
fn suppressing_callback() {
	let mut triggered = 0_usize;
	let mut validator = validator().with_callback(|_: &Invalidation<'_>| -> Option<Violation> {
		triggered += 1;
		None
	});
	let violations = validator.validate("<kk>").unwrap();
	assert!(violations.is_empty(), "everything suppressed");
	drop(validator);
	assert_eq!(triggered, 2, "unknown and unclosed");
}

#[test]
fn rewriting_callback() {
	let mut validator = validator().with_callback(|invalidation: &Invalidation<'_>| {
		(invalidation.reason == Reason::UnknownAttribute).then(|| Violation {
			attribute: Some(format!(
				"{}={}",
				invalidation.attribute_name(),
				invalidation.attribute_value()
			)),
			..invalidation.to_violation()
		})
	});
	let violations = validator.validate("<b x=1 id=2 y='3 4'><zz>").unwrap();
	assert_eq!(
		messages(&violations),
		[
			"invalid attribute 'x=1' in tag 'b' at 1:2",
			"invalid attribute 'y=3 4' in tag 'b' at 1:2",
		],
		"only attributes, with values"
	);
}

struct Budget {
	left: usize,
	seen: Vec<Reason>,
}

impl Callback for Budget {
	fn invalidation(&mut self, invalidation: &Invalidation<'_>) -> Option<Violation> {
		self.left = self.left.saturating_sub(1);
		self.seen.push(invalidation.reason);
		Some(invalidation.to_violation())
	}
	fn abandon(&self) -> bool { self.left == 0 }
}

#[test]
fn abandoning_callback() {
	let mut validator = validator().with_callback(Budget {
		left: 2,
		seen: Vec::new(),
	});
	let violations = validator.validate("<x><y><z>").unwrap();
	assert_eq!(
		messages(&violations),
		["tag 'x' is not valid at 1:2", "tag 'y' is not valid at 1:5"],
		"abandoned after two"
	);
	assert_eq!(validator.callback().seen.len(), 2, "no further calls");
	validator.callback_mut().left = 10;
	assert!(validator.validate("<b></b>").unwrap().is_empty(), "clean input");
	assert_eq!(validator.into_callback().left, 10, "callback untouched");
}

#[test]
fn stop_after_first_error() {
	let mut validator = validator().with_settings(Settings {
		stop_after_first_error: true,
		..Settings::default()
	});
	let violations = validator.validate("<b kkk=1><x></b>").unwrap();
	assert_eq!(
		messages(&violations),
		["invalid attribute 'kkk' in tag 'b' at 1:2"],
		"first only"
	);
	let quiet = validator
		.with_callback(|invalidation: &Invalidation<'_>| {
			(invalidation.reason != Reason::UnknownAttribute).then(|| invalidation.to_violation())
		})
		.validate("<b kkk=1><x></b>")
		.unwrap();
	assert_eq!(
		messages(&quiet),
		["tag 'x' is not valid at 1:11"],
		"suppressed violations don't count"
	);
}

#[test]
fn policies() {
	let text = "<b><c><c></b>";
	let mut validator = validator();
	assert_eq!(
		messages(&validator.validate(text).unwrap()),
		["tag 'c' is not properly closed at 1:8"],
		"innermost"
	);
	validator.settings_mut().recovery = RecoveryPolicy::ReportAll;
	assert_eq!(
		messages(&validator.validate(text).unwrap()),
		[
			"tag 'c' is not properly closed at 1:8",
			"tag 'c' is not properly closed at 1:5",
		],
		"all skipped"
	);
	validator.settings_mut().sweep = SweepPolicy::StopAtFirst;
	assert_eq!(
		validator.validate("<b><c>").unwrap().len(),
		1,
		"sweep stops at first"
	);
	assert_eq!(validator.settings().sweep, SweepPolicy::StopAtFirst, "settings kept");
}

#[test]
fn global_rule() {
	let mut validator = validator();
	validator.add_rules([
		TagRule::global().attribute("class").pattern("data-[a-z]+").unwrap(),
		TagRule::new("p").pattern("on").unwrap(),
	]);
	assert!(validator.is_valid_attribute("zz", "class"), "global on unknown tag");
	check_with(
		&mut validator,
		"<b class=x data-id=1 data-=2 id=3></b>",
		&["invalid attribute 'data-' in tag 'b' at 1:2"],
	);
	check_with(
		&mut validator,
		"<zz class=x></zz>",
		&["tag 'zz' is not valid at 1:2", "tag 'zz' is not valid at 1:15"],
	);
	check_with(
		&mut validator,
		"<p on=1 onclick=2></p>",
		&["invalid attribute 'onclick' in tag 'p' at 1:2"],
	);
}

fn check_with(validator: &mut Validator, text: &str, expected: &[&str]) {
	let violations = validator.validate(text).unwrap();
	assert_eq!(messages(&violations), expected, "violations of {text:?}");
}

#[test]
fn replacing_rules() {
	let mut validator = validator();
	validator.add_rule(TagRule::new("b").attribute("title"));
	assert!(!validator.is_valid_attribute("b", "id"), "old rule gone");
	assert!(validator.is_valid_attribute("b", "title"), "new rule");
	assert_eq!(validator.registry().len(), 4, "same number of rules");
}

#[test]
fn replacing_global_rule() {
	let mut validator = validator();
	validator.add_rule(TagRule::global().attribute("class"));
	validator.add_rule(TagRule::global().attribute("lang"));
	assert!(!validator.is_valid_attribute("b", "class"), "first global rule gone");
	assert!(validator.is_valid_attribute("b", "lang"), "last one wins");
	assert_eq!(validator.registry().len(), 5, "one global rule");
	check_with(
		&mut validator,
		"<b lang=en class=x></b>",
		&["invalid attribute 'class' in tag 'b' at 1:2"],
	);
}

#[test]
fn invalid_pattern() {
	let error = TagRule::new("b").pattern("(").unwrap_err();
	assert!(
		error.to_string().starts_with("Invalid attribute pattern \"(\""),
		"message: {error}"
	);
}

#[test]
fn reader_matches_string() {
	let text = "<b>\n  <c id=1 id=2>\n</b>\n<art>";
	let mut validator = validator();
	let from_string = validator.validate(text).unwrap();
	let from_reader = validator.validate_reader(text.as_bytes()).unwrap();
	assert_eq!(from_string, from_reader, "same violations");
	assert_eq!(
		messages(&from_reader),
		[
			"duplicated attribute 'id' in 'c' at 2:4",
			"tag 'c' is not properly closed at 2:4",
			"tag 'art' is not valid at 4:2",
			"tag 'art' is not properly closed at 4:2",
		],
		"positions"
	);
}

#[test]
fn invalid_utf8_aborts() {
	let error = validator().validate_bytes(b"<x>\n\xFF<b>").unwrap_err();
	assert_eq!(error.error, LexerError::InvalidUtf8(4), "lexer error");
	assert_eq!(error.span.start, 3, "text token start");
	assert_eq!(
		messages(&error.violations),
		["tag 'x' is not valid at 1:2"],
		"earlier violations kept, no sweep"
	);
}

#[test]
fn display_without_position() {
	let violation = Violation {
		tag: "b".to_owned(),
		attribute: Some("id".to_owned()),
		reason: Reason::DuplicatedAttribute,
		span: 1..2,
		position: None,
	};
	assert_eq!(violation.to_string(), "duplicated attribute 'id' in 'b'", "message");
	assert_eq!(Reason::DuplicatedAttribute.to_string(), "duplicated attribute", "short name");
	assert_eq!(Reason::DuplicatedAttribute.code(), 4, "code");
}
