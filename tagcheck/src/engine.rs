// SPDX-License-Identifier: MIT OR Apache-2.0
//! The tag nesting automaton.
//!
//! Feed it tokens with [`Engine::push`], then sweep the leftover open tags with
//! [`Engine::finish`]. Every problem found goes to an `emit` function, which
//! decides whether validation continues.
//!
//! You probably want to start at [`Engine`].

use core::ops::{ControlFlow, Range};
use std::collections::HashSet;

use crate::callback::Invalidation;
use crate::lexer::{Attribute, Tag, Token};
use crate::registry::Registry;
use crate::Reason;


/// How many of the tags skipped by a mismatched end tag get reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RecoveryPolicy {
	/// Only the innermost open tag, deeper ones are closed silently.
	#[default]
	ReportInnermost,
	/// Every skipped tag, innermost first.
	ReportAll,
}

/// How much of the stack the end-of-input sweep reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SweepPolicy {
	/// Every unclosed tag.
	#[default]
	ReportAll,
	/// Stop after the first reported unclosed tag, like older releases did.
	StopAtFirst,
}

/// What happened to an emitted invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Added to the results.
	Reported,
	/// Dropped by the callback.
	Suppressed,
	/// Validation must stop now.
	Stop,
}

/// A tag that hasn't been closed yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpenTag {
	/// Tag name.
	pub name: String,
	/// Where the opening tag's name is.
	pub name_span: Range<usize>,
}

/// What an end tag does to the stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Closing {
	/// The tag is open, keep the first `keep` entries and report the entries
	/// at `unclosed` as not properly closed.
	Matched {
		/// Stack length afterwards.
		keep: usize,
		/// Stack indices to report, in order.
		unclosed: Vec<usize>,
	},
	/// The tag isn't open anywhere.
	NotOpened,
}

/// Decide how an end tag named `name` closes `stack`.
///
/// The innermost open tag with that name is closed together with everything
/// opened after it. Tags that `is_self_closing` are never reported.
pub fn close_tag<F>(stack: &[OpenTag], name: &str, is_self_closing: F, policy: RecoveryPolicy) -> Closing
where
	F: Fn(&str) -> bool,
{
	let Some(index) = stack.iter().rposition(|open| open.name == name) else {
		return Closing::NotOpened;
	};
	let reportable = |&at: &usize| !is_self_closing(&stack[at].name);
	let mut skipped = index + 1..stack.len();
	let unclosed = match policy {
		RecoveryPolicy::ReportInnermost => skipped.next_back().filter(reportable).into_iter().collect(),
		RecoveryPolicy::ReportAll => skipped.rev().filter(reportable).collect(),
	};
	Closing::Matched {
		keep: index,
		unclosed,
	}
}

fn invalidation<'scan>(
	tag: &'scan Tag,
	attribute: Option<&'scan Attribute>,
	reason: Reason,
) -> Invalidation<'scan> {
	Invalidation {
		tag: &tag.name,
		attribute,
		reason,
		span: &tag.name_span,
	}
}

fn unclosed(open: &OpenTag) -> Invalidation<'_> {
	Invalidation {
		tag: &open.name,
		attribute: None,
		reason: Reason::NotProperlyClosed,
		span: &open.name_span,
	}
}

fn check(outcome: Outcome) -> ControlFlow<()> {
	match outcome {
		Outcome::Stop => ControlFlow::Break(()),
		Outcome::Reported | Outcome::Suppressed => ControlFlow::Continue(()),
	}
}

/// Validation state for a single scan.
///
/// Only borrows the registry, so any number of engines can share one.
#[derive(Debug)]
pub struct Engine<'reg> {
	registry: &'reg Registry,
	recovery: RecoveryPolicy,
	stack: Vec<OpenTag>,
}

impl<'reg> Engine<'reg> {
	/// Create an engine with nothing open.
	pub fn new(registry: &'reg Registry, recovery: RecoveryPolicy) -> Self {
		Self {
			registry,
			recovery,
			stack: Vec::new(),
		}
	}
	/// Currently open tags, outermost first.
	pub fn stack(&self) -> &[OpenTag] { &self.stack }
	/// Feed a token into the engine.
	///
	/// Tokens other than tags are ignored. Returns [`ControlFlow::Break`] as
	/// soon as `emit` returns [`Outcome::Stop`].
	pub fn push<F>(&mut self, token: &Token, mut emit: F) -> ControlFlow<()>
	where
		F: FnMut(Invalidation<'_>) -> Outcome,
	{
		let Some(tag) = token.tag() else {
			return ControlFlow::Continue(());
		};
		log::trace!("{token} at {:?}", tag.name_span);
		if !self.registry.is_known_tag(&tag.name) {
			check(emit(invalidation(tag, None, Reason::UnknownTag)))?;
		}
		let mut seen = HashSet::new();
		for attribute in &tag.attributes {
			if !self.registry.is_valid_attribute(&tag.name, &attribute.key) {
				check(emit(invalidation(
					tag,
					Some(attribute),
					Reason::UnknownAttribute,
				)))?;
			}
			if !seen.insert(attribute.key.as_str()) {
				check(emit(invalidation(
					tag,
					Some(attribute),
					Reason::DuplicatedAttribute,
				)))?;
			}
		}
		if let Token::End(_) = token {
			self.close(tag, emit)
		} else {
			self.stack.push(OpenTag {
				name: tag.name.clone(),
				name_span: tag.name_span.clone(),
			});
			ControlFlow::Continue(())
		}
	}
	fn close<F>(&mut self, tag: &Tag, mut emit: F) -> ControlFlow<()>
	where
		F: FnMut(Invalidation<'_>) -> Outcome,
	{
		let registry = self.registry;
		match close_tag(
			&self.stack,
			&tag.name,
			|name| registry.is_self_closing(name),
			self.recovery,
		) {
			Closing::NotOpened => check(emit(invalidation(tag, None, Reason::ClosedBeforeOpened))),
			Closing::Matched { keep, unclosed: report } => {
				let closed = self.stack.split_off(keep);
				for at in report {
					check(emit(unclosed(&closed[at - keep])))?;
				}
				ControlFlow::Continue(())
			}
		}
	}
	/// Mark the end of the token stream, reporting tags left open.
	///
	/// Self-closing tags are skipped.
	pub fn finish<F>(self, sweep: SweepPolicy, mut emit: F) -> ControlFlow<()>
	where
		F: FnMut(Invalidation<'_>) -> Outcome,
	{
		for open in &self.stack {
			if self.registry.is_self_closing(&open.name) {
				continue;
			}
			match emit(unclosed(open)) {
				Outcome::Stop => return ControlFlow::Break(()),
				Outcome::Reported if sweep == SweepPolicy::StopAtFirst => break,
				Outcome::Reported | Outcome::Suppressed => {}
			}
		}
		ControlFlow::Continue(())
	}
}
