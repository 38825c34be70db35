// SPDX-License-Identifier: MIT OR Apache-2.0
//! Hooks into every detected invalidation.
//!
//! You probably want to start at [`Callback`].

use core::ops::Range;

use crate::lexer::Attribute;
use crate::{Reason, Violation};

/// A detected invalidation, before it becomes a [`Violation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invalidation<'scan> {
	/// Name of the offending tag.
	pub tag: &'scan str,
	/// The offending attribute, for attribute reasons.
	pub attribute: Option<&'scan Attribute>,
	/// What's wrong.
	pub reason: Reason,
	/// Where the tag name is.
	pub span: &'scan Range<usize>,
}

impl Invalidation<'_> {
	/// Attribute name, empty if this isn't about an attribute.
	pub fn attribute_name(&self) -> &str { self.attribute.map_or("", |attribute| &attribute.key) }
	/// Attribute value, empty if this isn't about an attribute.
	pub fn attribute_value(&self) -> &str {
		self.attribute.map_or("", |attribute| &attribute.value)
	}
	/// The standard violation for this invalidation, without a position.
	pub fn to_violation(&self) -> Violation {
		Violation {
			tag: self.tag.to_owned(),
			attribute: self.attribute.map(|attribute| attribute.key.clone()),
			reason: self.reason,
			span: self.span.clone(),
			position: None,
		}
	}
}

/// Called once for every invalidation found while validating.
///
/// Implemented for any `FnMut(&Invalidation) -> Option<Violation>`.
pub trait Callback {
	/// Turn an invalidation into a reported violation, or `None` to leave it
	/// out of the results.
	fn invalidation(&mut self, invalidation: &Invalidation<'_>) -> Option<Violation>;
	/// Checked after every invalidation, `true` ends validation early with
	/// the violations reported so far.
	fn abandon(&self) -> bool { false }
}

impl<F: FnMut(&Invalidation<'_>) -> Option<Violation>> Callback for F {
	fn invalidation(&mut self, invalidation: &Invalidation<'_>) -> Option<Violation> {
		self(invalidation)
	}
}

/// Reports every invalidation as its standard [`Violation`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DefaultCallback;

impl Callback for DefaultCallback {
	fn invalidation(&mut self, invalidation: &Invalidation<'_>) -> Option<Violation> {
		Some(invalidation.to_violation())
	}
}
