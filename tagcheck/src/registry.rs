// SPDX-License-Identifier: MIT OR Apache-2.0
//! The whitelist of permitted tags and attributes.
//!
//! You probably want to start at [`Registry`].

use std::collections::hash_map::{Entry, HashMap};
use std::collections::HashSet;
use std::fmt;

use regex::Regex;
use thiserror::Error;

/// An error while building a [`TagRule`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RuleError {
	#[error("Invalid attribute pattern {0:?}: {1}")]
	#[doc = "Invalid attribute pattern"]
	Pattern(String, #[source] regex::Error),
}

/// Whitelist entry for a single tag.
///
/// A rule with an empty name is the *global* rule, its attributes are allowed
/// on every tag.
#[derive(Clone)]
pub struct TagRule {
	name: String,
	attributes: HashSet<String>,
	pattern: Option<Regex>,
	self_closing: bool,
}

impl TagRule {
	/// Create a rule for a tag, with no attributes allowed.
	pub fn new<N: Into<String>>(name: N) -> Self {
		Self {
			name: name.into(),
			attributes: HashSet::new(),
			pattern: None,
			self_closing: false,
		}
	}
	/// Create the global rule.
	pub fn global() -> Self { Self::new(String::new()) }
	/// Allow an attribute name.
	#[must_use]
	pub fn attribute<A: Into<String>>(mut self, name: A) -> Self {
		self.attributes.insert(name.into());
		self
	}
	/// Allow several attribute names.
	#[must_use]
	pub fn attributes<I>(mut self, names: I) -> Self
	where
		I: IntoIterator,
		I::Item: Into<String>,
	{
		self.attributes.extend(names.into_iter().map(Into::into));
		self
	}
	/// Allow any attribute whose whole name matches a regular expression.
	///
	/// # Errors
	/// If the pattern doesn't compile.
	pub fn pattern(mut self, pattern: &str) -> Result<Self, RuleError> {
		let anchored = format!("^(?:{pattern})$");
		self.pattern = Some(
			Regex::new(&anchored).map_err(|err| RuleError::Pattern(pattern.to_owned(), err))?,
		);
		Ok(self)
	}
	/// Mark the tag as self-closing, it is never reported as unclosed.
	#[must_use]
	pub fn self_closing(mut self, self_closing: bool) -> Self {
		self.self_closing = self_closing;
		self
	}
	/// Name of the tag, empty for the global rule.
	pub fn name(&self) -> &str { &self.name }
	/// Whether this is the global rule.
	pub fn is_global(&self) -> bool { self.name.is_empty() }
	/// Whether the tag is self-closing.
	pub fn is_self_closing(&self) -> bool { self.self_closing }
	/// Check an attribute against this rule alone.
	pub fn allows(&self, attribute: &str) -> bool {
		self.attributes.contains(attribute)
			|| self
				.pattern
				.as_ref()
				.is_some_and(|pattern| pattern.is_match(attribute))
	}
}

impl fmt::Debug for TagRule {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let mut attributes = self.attributes.iter().collect::<Vec<_>>();
		attributes.sort_unstable();
		f.debug_struct("TagRule")
			.field("name", &self.name)
			.field("attributes", &attributes)
			.field("pattern", &self.pattern.as_ref().map(Regex::as_str))
			.field("self_closing", &self.self_closing)
			.finish()
	}
}

/// Mapping from tag name to [`TagRule`].
///
/// Read-only while validating, so it can be shared between scans.
#[derive(Debug, Clone, Default)]
pub struct Registry {
	rules: HashMap<String, TagRule>,
}

impl Registry {
	/// Create an empty registry, which rejects everything.
	pub fn new() -> Self { Self::default() }
	/// Insert a rule, replacing any previous rule with the same name.
	pub fn register(&mut self, rule: TagRule) {
		match self.rules.entry(rule.name.clone()) {
			Entry::Occupied(mut entry) => {
				if rule.is_global() {
					log::warn!("global tag rule registered twice, replacing the previous one");
				} else {
					log::debug!("replacing tag rule {:?}", rule.name);
				}
				entry.insert(rule);
			}
			Entry::Vacant(entry) => {
				entry.insert(rule);
			}
		}
	}
	/// Rule for a tag, the empty name gets the global rule.
	pub fn get(&self, name: &str) -> Option<&TagRule> { self.rules.get(name) }
	/// The global rule, if any.
	pub fn global(&self) -> Option<&TagRule> { self.get("") }
	/// Number of rules, including the global rule.
	pub fn len(&self) -> usize { self.rules.len() }
	/// Whether there are no rules.
	pub fn is_empty(&self) -> bool { self.rules.is_empty() }
	/// Whether the tag has a rule.
	pub fn is_known_tag(&self, name: &str) -> bool { self.rules.contains_key(name) }
	/// Whether the tag has a rule marking it self-closing.
	pub fn is_self_closing(&self, name: &str) -> bool {
		self.get(name).is_some_and(TagRule::is_self_closing)
	}
	/// Check whether an attribute is allowed on a tag.
	///
	/// The global rule is consulted first, then the tag's own rule. The tag
	/// doesn't need to be known for a globally-allowed attribute to pass.
	pub fn is_valid_attribute(&self, tag: &str, attribute: &str) -> bool {
		self.global().is_some_and(|rule| rule.allows(attribute))
			|| self.get(tag).is_some_and(|rule| rule.allows(attribute))
	}
}

impl Extend<TagRule> for Registry {
	fn extend<T: IntoIterator<Item = TagRule>>(&mut self, iter: T) {
		for rule in iter {
			self.register(rule);
		}
	}
}

impl FromIterator<TagRule> for Registry {
	fn from_iter<T: IntoIterator<Item = TagRule>>(iter: T) -> Self {
		let mut registry = Self::new();
		registry.extend(iter);
		registry
	}
}
