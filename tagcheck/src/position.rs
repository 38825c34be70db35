// SPDX-License-Identifier: MIT OR Apache-2.0
//! Byte offset to line/column translation.

use core::fmt;

use crate::Violation;

#[cfg(test)]
mod tests;

/// 1-based line and column, columns count bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineColumn {
	/// Line number, starting at 1.
	pub line: usize,
	/// Byte column within the line, starting at 1.
	pub column: usize,
}

impl fmt::Display for LineColumn {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}:{}", self.line, self.column)
	}
}

/// Start offsets of every line in a text.
///
/// Lines are delimited by `\n`, which counts towards the length of the line
/// it ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
	// always starts with 0, strictly increasing
	starts: Vec<usize>,
}

impl Default for LineIndex {
	fn default() -> Self { Self::new() }
}

impl LineIndex {
	/// Index of an empty text, a single line.
	pub fn new() -> Self { Self { starts: vec![0] } }
	/// Index a whole text.
	pub fn from_text(text: &[u8]) -> Self {
		let mut index = Self::new();
		index.scan(0, text);
		index
	}
	/// Record the line breaks in a chunk of text found at `offset`.
	///
	/// Chunks must be recorded in order and without overlap.
	pub fn scan(&mut self, offset: usize, chunk: &[u8]) {
		self.starts.extend(
			chunk
				.iter()
				.enumerate()
				.filter(|&(_, &byte)| byte == b'\n')
				.map(|(at, _)| offset + at + 1),
		);
	}
	/// Number of lines seen so far.
	pub fn lines(&self) -> usize { self.starts.len() }
	/// Find the line and column of a byte offset.
	pub fn locate(&self, offset: usize) -> LineColumn {
		// starts[0] == 0, so this is at least 1
		let line = self.starts.partition_point(|&start| start <= offset);
		let start = self.starts.get(line - 1).copied().unwrap_or_default();
		LineColumn {
			line,
			column: offset - start + 1,
		}
	}
}

/// Fill in the position of every violation from the start of its span.
pub fn translate(index: &LineIndex, violations: &mut [Violation]) {
	for violation in violations {
		violation.position = Some(index.locate(violation.span.start));
	}
}
