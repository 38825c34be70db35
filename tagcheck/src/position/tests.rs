// SPDX-License-Identifier: MIT OR Apache-2.0
use crate::position::{LineColumn, LineIndex, translate};
use crate::{Reason, Violation};

fn at(line: usize, column: usize) -> LineColumn { LineColumn { line, column } }

#[test]
fn locate() {
	let index = LineIndex::from_text(b"ab\n\ncd\n");
	assert_eq!(index.lines(), 4, "trailing newline starts a line");
	assert_eq!(index.locate(0), at(1, 1), "start");
	assert_eq!(index.locate(2), at(1, 3), "newline belongs to its line");
	assert_eq!(index.locate(3), at(2, 1), "empty line");
	assert_eq!(index.locate(5), at(3, 2), "third line");
	assert_eq!(index.locate(7), at(4, 1), "end of text");
}

#[test]
fn chunks() {
	let mut index = LineIndex::new();
	index.scan(0, b"a\nb");
	index.scan(3, b"c\n");
	index.scan(5, b"");
	index.scan(5, b"\nd");
	assert_eq!(index, LineIndex::from_text(b"a\nbc\n\nd"), "same as whole text");
	assert_eq!(index.locate(6), at(4, 1), "last line");
}

#[test]
fn translate_violations() {
	let index = LineIndex::from_text(b"<b>\n<x>");
	let mut violations = [Violation {
		tag: "x".to_owned(),
		attribute: None,
		reason: Reason::UnknownTag,
		span: 5..6,
		position: None,
	}];
	translate(&index, &mut violations);
	assert_eq!(violations[0].position, Some(at(2, 2)), "translated");
	assert_eq!(at(2, 2).to_string(), "2:2", "display");
}
