// SPDX-License-Identifier: MIT OR Apache-2.0
//! Streaming whitelist validation of markup tags and attributes
//!
//! Describe which tags and attributes are allowed with a [`Registry`] of
//! [`TagRule`]s, then run markup through a [`Validator`]. Every tag that isn't
//! registered, every attribute that isn't allowed, repeated attributes, and
//! badly nested or unclosed tags come back as [`Violation`]s with their line
//! and column:
//! ```
//! use tagcheck::{TagRule, Validator};
//!
//! let mut validator = Validator::default();
//! validator.add_rules([
//!     TagRule::new("a").attribute("href"),
//!     TagRule::new("b"),
//! ]);
//! let violations = validator.validate("<b><a href='x' target=_blank></a>").unwrap();
//! let messages = violations.iter().map(ToString::to_string).collect::<Vec<_>>();
//! assert_eq!(messages, [
//!     "invalid attribute 'target' in tag 'a' at 1:5",
//!     "tag 'b' is not properly closed at 1:2",
//! ]);
//! ```
//!
//! Validation streams: input is tokenized incrementally, and only the stack
//! of open tags and the line starts are kept. Use [`Validator::validate_reader`]
//! to validate straight from any [`Read`].
//!
//! Custom handling goes through a [`Callback`], which can rewrite, drop, or
//! stop at each problem found. The pieces are usable on their own as well,
//! see [`lexer`] and [`engine`].
//!
//! Logging goes through the [`log`] facade, nothing is logged above `debug`
//! unless a rule is replaced.

use core::fmt;
use core::ops::{ControlFlow, Range};
use std::error;
use std::io::Read;

use thiserror::Error;

pub mod callback;
pub mod engine;
pub mod lexer;
pub mod position;
pub mod registry;

#[cfg(test)]
mod tests;

pub use callback::{Callback, DefaultCallback, Invalidation};
pub use engine::{RecoveryPolicy, SweepPolicy};
pub use position::LineColumn;
pub use registry::{Registry, RuleError, TagRule};

use engine::{Engine, Outcome};
use lexer::{Input, Lexer, LexerError, ReadInput, Token};

/// Why a tag or attribute was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Reason {
	/// The tag has no rule.
	UnknownTag,
	/// The attribute isn't allowed on the tag.
	UnknownAttribute,
	/// An end tag without a matching open tag.
	ClosedBeforeOpened,
	/// An open tag that was never closed, or closed by an outer end tag.
	NotProperlyClosed,
	/// The attribute appears more than once in the same tag.
	DuplicatedAttribute,
}

impl Reason {
	/// Stable numeric code, in declaration order starting at 0.
	pub fn code(self) -> u8 {
		match self {
			Self::UnknownTag => 0,
			Self::UnknownAttribute => 1,
			Self::ClosedBeforeOpened => 2,
			Self::NotProperlyClosed => 3,
			Self::DuplicatedAttribute => 4,
		}
	}
}

impl fmt::Display for Reason {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(match self {
			Self::UnknownTag => "unknown tag",
			Self::UnknownAttribute => "unknown attribute",
			Self::ClosedBeforeOpened => "closed before opened",
			Self::NotProperlyClosed => "not properly closed",
			Self::DuplicatedAttribute => "duplicated attribute",
		})
	}
}

/// A reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Violation {
	/// Name of the offending tag.
	pub tag: String,
	/// Name of the offending attribute, for attribute reasons.
	pub attribute: Option<String>,
	/// What's wrong.
	pub reason: Reason,
	/// Byte range of the tag name it points at.
	pub span: Range<usize>,
	/// Line and column of the start of `span`, filled in once a scan ends.
	pub position: Option<LineColumn>,
}

impl fmt::Display for Violation {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let tag = &self.tag;
		let attribute = self.attribute.as_deref().unwrap_or_default();
		match self.reason {
			Reason::UnknownTag => write!(f, "tag '{tag}' is not valid"),
			Reason::UnknownAttribute => write!(f, "invalid attribute '{attribute}' in tag '{tag}'"),
			Reason::ClosedBeforeOpened => {
				write!(f, "close tag '{tag}' was not opened before close tag")
			}
			Reason::NotProperlyClosed => write!(f, "tag '{tag}' is not properly closed"),
			Reason::DuplicatedAttribute => write!(f, "duplicated attribute '{attribute}' in '{tag}'"),
		}?;
		if let Some(position) = self.position {
			write!(f, " at {position}")?;
		}
		Ok(())
	}
}

impl error::Error for Violation {}

/// Tokenizing failed partway through, so validation couldn't finish.
#[derive(Debug, Error)]
#[error("validation aborted at byte {}: {error}", .span.start)]
pub struct ScanError {
	/// What went wrong.
	#[source]
	pub error: LexerError,
	/// Where it went wrong.
	pub span: Range<usize>,
	/// Violations reported before the error, with positions.
	pub violations: Vec<Violation>,
}

/// How a [`Validator`] reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Settings {
	/// End validation at the first reported violation.
	pub stop_after_first_error: bool,
	/// Which tags a mismatched end tag reports.
	pub recovery: RecoveryPolicy,
	/// Which unclosed tags the end of input reports.
	pub sweep: SweepPolicy,
}

/// Run a whole validation over `input`.
///
/// This is what every `Validator::validate*` method calls, exposed for use
/// with a borrowed registry.
///
/// # Errors
/// If the input can't be read or isn't UTF-8.
pub fn scan<T: Input, C: Callback>(
	registry: &Registry,
	settings: Settings,
	callback: &mut C,
	input: T,
) -> Result<Vec<Violation>, ScanError> {
	log::debug!("validating with {} tag rules, {settings:?}", registry.len());
	let mut lexer = Lexer::new(input);
	let mut engine = Engine::new(registry, settings.recovery);
	let mut violations = Vec::new();
	let mut emit = |invalidation: Invalidation<'_>| {
		let outcome = match callback.invalidation(&invalidation) {
			Some(violation) => {
				violations.push(violation);
				if settings.stop_after_first_error {
					Outcome::Stop
				} else {
					Outcome::Reported
				}
			}
			None => Outcome::Suppressed,
		};
		if callback.abandon() {
			log::debug!("callback abandoned validation");
			Outcome::Stop
		} else {
			outcome
		}
	};
	let scanned = loop {
		let (token, span) = lexer.next_token();
		match token {
			Ok(Token::Eof) => break Ok(ControlFlow::Continue(())),
			Ok(token) => {
				if engine.push(&token, &mut emit).is_break() {
					break Ok(ControlFlow::Break(()));
				}
			}
			Err(error) => break Err((error, span)),
		}
	};
	if let Ok(ControlFlow::Continue(())) = scanned
		&& engine.finish(settings.sweep, &mut emit).is_break()
	{
		log::debug!("stopped while sweeping unclosed tags");
	}
	let lines = lexer.into_lines();
	position::translate(&lines, &mut violations);
	log::debug!(
		"validated {} lines, {} violations",
		lines.lines(),
		violations.len()
	);
	match scanned {
		Ok(_) => Ok(violations),
		Err((error, span)) => Err(ScanError {
			error,
			span,
			violations,
		}),
	}
}

/// Tag whitelist validator.
///
/// Holds the rules, the [`Settings`], and the [`Callback`] that decides what
/// gets reported.
#[derive(Debug, Clone)]
pub struct Validator<C = DefaultCallback> {
	registry: Registry,
	settings: Settings,
	callback: C,
}

impl Validator {
	/// Create a validator reporting every violation.
	pub fn new(registry: Registry) -> Self {
		Self {
			registry,
			settings: Settings::default(),
			callback: DefaultCallback,
		}
	}
}

impl Default for Validator {
	fn default() -> Self { Self::new(Registry::new()) }
}

impl<C: Callback> Validator<C> {
	/// Replace the settings.
	#[must_use]
	pub fn with_settings(mut self, settings: Settings) -> Self {
		self.settings = settings;
		self
	}
	/// Replace the callback.
	pub fn with_callback<D: Callback>(self, callback: D) -> Validator<D> {
		Validator {
			registry: self.registry,
			settings: self.settings,
			callback,
		}
	}
	/// Current settings.
	pub fn settings(&self) -> &Settings { &self.settings }
	/// Current settings, for changing.
	pub fn settings_mut(&mut self) -> &mut Settings { &mut self.settings }
	/// The rules in use.
	pub fn registry(&self) -> &Registry { &self.registry }
	/// The callback.
	pub fn callback(&self) -> &C { &self.callback }
	/// The callback, for changing.
	pub fn callback_mut(&mut self) -> &mut C { &mut self.callback }
	/// Take back the callback, along with whatever it collected.
	pub fn into_callback(self) -> C { self.callback }
	/// Allow a tag, replacing any previous rule for it.
	pub fn add_rule(&mut self, rule: TagRule) { self.registry.register(rule); }
	/// Allow several tags.
	pub fn add_rules<I: IntoIterator<Item = TagRule>>(&mut self, rules: I) {
		self.registry.extend(rules);
	}
	/// Whether the tag is registered.
	pub fn is_valid_tag(&self, tag: &str) -> bool { self.registry.is_known_tag(tag) }
	/// Whether the tag is registered as self-closing.
	pub fn is_self_closing_tag(&self, tag: &str) -> bool { self.registry.is_self_closing(tag) }
	/// Whether the attribute is allowed on the tag, see
	/// [`Registry::is_valid_attribute`].
	pub fn is_valid_attribute(&self, tag: &str, attribute: &str) -> bool {
		self.registry.is_valid_attribute(tag, attribute)
	}
	/// Validate a string.
	///
	/// # Errors
	/// Never for a string, kept fallible to match the other entry points.
	pub fn validate(&mut self, text: &str) -> Result<Vec<Violation>, ScanError> {
		self.validate_bytes(text.as_bytes())
	}
	/// Validate UTF-8 bytes.
	///
	/// # Errors
	/// If the bytes aren't UTF-8.
	pub fn validate_bytes(&mut self, text: &[u8]) -> Result<Vec<Violation>, ScanError> {
		scan(&self.registry, self.settings, &mut self.callback, text)
	}
	/// Validate everything a reader produces, without buffering it.
	///
	/// # Errors
	/// If reading fails, or the text isn't UTF-8.
	pub fn validate_reader<R: Read>(&mut self, reader: R) -> Result<Vec<Violation>, ScanError> {
		scan(&self.registry, self.settings, &mut self.callback, ReadInput::new(reader))
	}
}
