// SPDX-License-Identifier: MIT OR Apache-2.0
//! Read markup tokens out of a text stream.
//!
//! This is not a conforming HTML tokenizer, it only finds the tags, their
//! attributes and enough of everything else to skip over it correctly.
//!
//! You probably want to start at [`Lexer`].

use core::fmt;
use core::mem::discriminant;
use core::ops::Range;
use std::error::Error;
use std::io::{self, ErrorKind, Read};

use crate::position::LineIndex;


/// A single attribute of a tag, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
	/// Lowercased attribute name.
	pub key: String,
	/// Raw value, without quotes, entities are left as-is.
	pub value: String,
	/// Span of the whole attribute, including its value.
	pub span: Range<usize>,
}

/// Contents of a start, end, or self-closing tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
	/// Lowercased tag name.
	pub name: String,
	/// Span of the name alone.
	pub name_span: Range<usize>,
	/// Attributes in source order, duplicates included.
	pub attributes: Vec<Attribute>,
}

/// A successful token of text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
	/// `<name ...>`
	Start(Tag),
	/// `</name ...>`
	End(Tag),
	/// `<name .../>`
	SelfClosing(Tag),
	/// Anything between markup.
	Text,
	/// `<!-- -->`, or some bogus markup treated like one.
	Comment,
	/// `<!doctype ...>`
	Doctype,
	/// End of file.
	Eof,
}

impl Token {
	/// The tag of a structural token.
	pub fn tag(&self) -> Option<&Tag> {
		match self {
			Token::Start(tag) | Token::End(tag) | Token::SelfClosing(tag) => Some(tag),
			_ => None,
		}
	}
}

impl fmt::Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Token::Start(tag) => write!(f, "<{}>", tag.name),
			Token::End(tag) => write!(f, "</{}>", tag.name),
			Token::SelfClosing(tag) => write!(f, "<{}/>", tag.name),
			Token::Text => f.write_str("text"),
			Token::Comment => f.write_str("comment"),
			Token::Doctype => f.write_str("doctype"),
			Token::Eof => f.write_str("end of file"),
		}
	}
}

/// An error while lexing, these end validation.
#[derive(Debug)]
#[non_exhaustive]
pub enum LexerError {
	/// Error from the underlying reader.
	Io(io::Error),
	/// Invalid UTF-8 text at the offset.
	InvalidUtf8(usize),
}

impl fmt::Display for LexerError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			LexerError::Io(err) => fmt::Display::fmt(err, f),
			LexerError::InvalidUtf8(at) => write!(f, "Invalid UTF-8 text at {at}"),
		}
	}
}

impl Error for LexerError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			LexerError::Io(err) => Some(err),
			LexerError::InvalidUtf8(_) => None,
		}
	}
}

/// IO errors compare by kind only.
impl PartialEq for LexerError {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(LexerError::Io(a), LexerError::Io(b)) => a.kind() == b.kind(),
			(LexerError::InvalidUtf8(a), LexerError::InvalidUtf8(b)) => a == b,
			_ => discriminant(self) == discriminant(other),
		}
	}
}

type LexerResult<T> = Result<T, LexerError>;

/// Longest peek the lexer will ever request.
pub const MAX_PEEK: usize = 16;

/// Source of bytes for the [`Lexer`], a small lookahead window over the text.
///
/// Implemented for byte slices and for any reader through [`ReadInput`].
pub trait Input {
	/// Look at the next `n` bytes or more, fewer means the text ends there.
	/// Only ever asked for `n` in `1..=MAX_PEEK`.
	///
	/// # Errors
	/// On IO error.
	fn peek(&mut self, n: usize) -> LexerResult<&[u8]>;
	/// Consume `n` bytes that an earlier `peek` returned.
	fn advance(&mut self, n: usize);
}

impl Input for &[u8] {
	fn peek(&mut self, _n: usize) -> LexerResult<&[u8]> { Ok(self) }
	fn advance(&mut self, n: usize) { *self = &self[n..]; }
}

/// Streams markup out of a reader, holding at most [`MAX_PEEK`] bytes.
#[derive(Debug)]
pub struct ReadInput<T> {
	reader: T,
	buffer: [u8; MAX_PEEK],
	buffer_len: usize,
}

impl<T> ReadInput<T> {
	/// Wrap a reader.
	pub fn new(reader: T) -> Self {
		Self {
			reader,
			buffer: [0; MAX_PEEK],
			buffer_len: 0,
		}
	}
	/// Get back the reader, any peeked bytes are lost.
	pub fn into_inner(self) -> T { self.reader }
}

#[expect(clippy::panic_in_result_fn, reason = "precondition validation")]
impl<T: Read> Input for ReadInput<T> {
	fn peek(&mut self, request: usize) -> LexerResult<&[u8]> {
		assert!(request <= MAX_PEEK, "peek longer than MAX_PEEK");
		// like read_exact, but a short read at the end is fine
		let mut start = self.buffer_len;
		while start < request {
			// fill the whole buffer if the reader allows, extra bytes stay for later
			match self.reader.read(&mut self.buffer[start..]) {
				Ok(0) => break,
				Ok(n) => start += n,
				Err(e) if e.kind() == ErrorKind::Interrupted => {}
				Err(e) => return Err(LexerError::Io(e)),
			}
		}
		self.buffer_len = start;
		Ok(&self.buffer[..start])
	}
	fn advance(&mut self, request: usize) {
		assert!(
			request <= self.buffer_len,
			"advancing past peeked bytes"
		);
		self.buffer.copy_within(request..self.buffer_len, 0);
		self.buffer_len -= request;
	}
}

/// Elements whose contents are text up to the matching end tag.
const RAW_TEXT: [&str; 9] = [
	"iframe", "noembed", "noframes", "noscript", "script", "style", "textarea", "title", "xmp",
];

fn is_space(byte: u8) -> bool { matches!(byte, b'\t' | b'\n' | b'\x0C' | b'\r' | b' ') }

fn utf8_len(first: u8) -> usize {
	const LUT: [u8; 16] = [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 3, 4];
	usize::from(LUT[usize::from(first >> 4)])
}

/// Where consumed characters go
trait CharOutput {
	fn co_push(&mut self, text: &str);
}
impl CharOutput for &mut String {
	fn co_push(&mut self, text: &str) { self.push_str(text); }
}
impl CharOutput for () {
	fn co_push(&mut self, _text: &str) {}
}
/// Names are matched case-insensitively, so store them lowercased
struct Lowercase<'out>(&'out mut String);
impl CharOutput for Lowercase<'_> {
	fn co_push(&mut self, text: &str) {
		self.0.extend(text.chars().map(|ch| ch.to_ascii_lowercase()));
	}
}

// what the next token can be
#[derive(Debug, Clone, Copy)]
enum State {
	Data,
	/// Inside a raw text element, waiting for its end tag
	RawText(&'static str),
	/// Everything until the end is text
	PlainText,
	/// The reader failed, it won't be asked again
	IrrecoverableError,
}

/// Splits markup into tags and the text around them.
#[derive(Debug)]
pub struct Lexer<T> {
	reader: T,
	cursor: usize,
	state: State,
	lines: LineIndex,
}

impl<T: Input> Lexer<T> {
	/// Start lexing at the beginning of `input`.
	pub fn new(input: T) -> Self {
		Self {
			reader: input,
			cursor: 0,
			state: State::Data,
			lines: LineIndex::new(),
		}
	}
	fn peek(&mut self, n: usize) -> LexerResult<&[u8]> {
		match self.reader.peek(n) {
			Ok(result) => Ok(result),
			Err(err) => {
				self.state = State::IrrecoverableError;
				Err(err)
			}
		}
	}
	fn peek_byte(&mut self) -> LexerResult<Option<u8>> { Ok(self.peek(1)?.first().copied()) }
	/// case-insensitive prefix check
	fn at(&mut self, text: &[u8]) -> LexerResult<bool> {
		let found = self.peek(text.len())?;
		Ok(found
			.get(..text.len())
			.is_some_and(|found| found.eq_ignore_ascii_case(text)))
	}
	fn advance(&mut self, n: usize) {
		// always called on already-peeked bytes, so this can't hit IO
		if let Ok(bytes) = self.reader.peek(n) {
			self.lines.scan(self.cursor, &bytes[..n.min(bytes.len())]);
		}
		self.cursor += n;
		self.reader.advance(n);
	}
	/// Consume one character, false at end of file.
	fn take_char<O: CharOutput>(&mut self, mut out: O) -> LexerResult<bool> {
		let Some(first) = self.peek_byte()? else {
			return Ok(false);
		};
		let len = utf8_len(first);
		let found = self.peek(len)?;
		let valid = match found.get(..len).map(str::from_utf8) {
			Some(Ok(text)) => {
				out.co_push(text);
				true
			}
			_ => false,
		};
		if valid {
			self.advance(len);
			Ok(true)
		} else {
			// skip a byte, for anyone wanting to continue
			let at = self.cursor;
			self.advance(1);
			Err(LexerError::InvalidUtf8(at))
		}
	}
	fn skip_spaces(&mut self) -> LexerResult<()> {
		while self.peek_byte()?.is_some_and(is_space) {
			self.advance(1);
		}
		Ok(())
	}
	/// Whether a `<` here starts some markup.
	fn at_markup(&mut self) -> LexerResult<bool> {
		Ok(matches!(
			self.peek(2)?,
			[b'<', b'/' | b'!' | b'?' | b'a'..=b'z' | b'A'..=b'Z', ..]
		))
	}
	fn text(&mut self) -> LexerResult<Token> {
		// first character might be a non-markup '<'
		self.take_char(())?;
		while self.peek_byte()?.is_some() && !self.at_markup()? {
			self.take_char(())?;
		}
		Ok(Token::Text)
	}
	/// Skip until after a `>`
	fn bogus_comment(&mut self) -> LexerResult<Token> {
		while let Some(byte) = self.peek_byte()? {
			if byte == b'>' {
				self.advance(1);
				break;
			}
			self.take_char(())?;
		}
		Ok(Token::Comment)
	}
	/// After `<!--`
	fn comment(&mut self) -> LexerResult<Token> {
		// abruptly closed empty comments
		if self.at(b">")? {
			self.advance(1);
			return Ok(Token::Comment);
		}
		if self.at(b"->")? {
			self.advance(2);
			return Ok(Token::Comment);
		}
		while self.peek_byte()?.is_some() {
			if self.at(b"-->")? {
				self.advance(3);
				break;
			}
			self.take_char(())?;
		}
		Ok(Token::Comment)
	}
	/// An attribute value after `=`, `None` when cut off.
	fn value(&mut self) -> LexerResult<Option<String>> {
		let mut value = String::new();
		match self.peek_byte()? {
			None => return Ok(None),
			Some(quote @ (b'"' | b'\'')) => {
				self.advance(1);
				loop {
					match self.peek_byte()? {
						None => return Ok(None),
						Some(byte) if byte == quote => {
							self.advance(1);
							break;
						}
						Some(_) => {
							self.take_char(&mut value)?;
						}
					}
				}
			}
			Some(_) => {
				while self.peek_byte()?.is_some_and(|byte| !is_space(byte) && byte != b'>') {
					self.take_char(&mut value)?;
				}
			}
		}
		Ok(Some(value))
	}
	/// One attribute, `None` when cut off.
	fn attribute(&mut self) -> LexerResult<Option<Attribute>> {
		let start = self.cursor;
		let mut key = String::new();
		// the first character can be '='
		self.take_char(Lowercase(&mut key))?;
		while self
			.peek_byte()?
			.is_some_and(|byte| !is_space(byte) && !matches!(byte, b'/' | b'>' | b'='))
		{
			self.take_char(Lowercase(&mut key))?;
		}
		self.skip_spaces()?;
		let value = if self.at(b"=")? {
			self.advance(1);
			self.skip_spaces()?;
			let Some(value) = self.value()? else {
				return Ok(None);
			};
			value
		} else {
			String::new()
		};
		Ok(Some(Attribute {
			key,
			value,
			span: start..self.cursor,
		}))
	}
	/// Tag after `<` or `</`, `None` when cut off.
	fn tag(&mut self, end: bool) -> LexerResult<Option<Token>> {
		let name_start = self.cursor;
		let mut name = String::new();
		while self
			.peek_byte()?
			.is_some_and(|byte| !is_space(byte) && !matches!(byte, b'/' | b'>'))
		{
			self.take_char(Lowercase(&mut name))?;
		}
		let mut tag = Tag {
			name,
			name_span: name_start..self.cursor,
			attributes: Vec::new(),
		};
		loop {
			self.skip_spaces()?;
			match self.peek_byte()? {
				None => return Ok(None),
				Some(b'>') => {
					self.advance(1);
					break;
				}
				Some(b'/') => {
					self.advance(1);
					if self.at(b">")? {
						self.advance(1);
						return Ok(Some(if end {
							Token::End(tag)
						} else {
							Token::SelfClosing(tag)
						}));
					}
					// stray slash, ignored
				}
				Some(_) => match self.attribute()? {
					Some(attribute) => tag.attributes.push(attribute),
					None => return Ok(None),
				},
			}
		}
		if end {
			return Ok(Some(Token::End(tag)));
		}
		if tag.name == "plaintext" {
			self.state = State::PlainText;
		} else if let Some(&raw) = RAW_TEXT.iter().find(|&&raw| raw == tag.name) {
			self.state = State::RawText(raw);
		}
		Ok(Some(Token::Start(tag)))
	}
	/// Markup starting at a `<`, checked by `at_markup`.
	fn markup(&mut self) -> LexerResult<Token> {
		let start = self.cursor;
		let tag = match self.peek(3)? {
			[b'<', b'/', b'>', ..] => {
				self.advance(3);
				return Ok(Token::Comment);
			}
			[b'<', b'/', b'a'..=b'z' | b'A'..=b'Z', ..] => {
				self.advance(2);
				self.tag(true)?
			}
			[b'<', b'/' | b'?', ..] => {
				self.advance(2);
				return self.bogus_comment();
			}
			[b'<', b'!', ..] => {
				if self.at(b"<!--")? {
					self.advance(4);
					return self.comment();
				}
				let doctype = self.at(b"<!doctype")?;
				self.advance(2);
				self.bogus_comment()?;
				return Ok(if doctype { Token::Doctype } else { Token::Comment });
			}
			_ => {
				self.advance(1);
				self.tag(false)?
			}
		};
		Ok(tag.unwrap_or_else(|| {
			log::debug!("dropping markup cut off by end of file at {start}");
			Token::Eof
		}))
	}
	/// Text up to the end tag of a raw text element.
	fn raw_text(&mut self, name: &'static str) -> LexerResult<Option<Token>> {
		let start = self.cursor;
		loop {
			let found = self.peek(name.len() + 3)?;
			let closes = found.starts_with(b"</")
				&& found
					.get(2..2 + name.len())
					.is_some_and(|found| found.eq_ignore_ascii_case(name.as_bytes()))
				&& found
					.get(2 + name.len())
					.is_none_or(|&byte| is_space(byte) || matches!(byte, b'/' | b'>'));
			if closes || found.is_empty() {
				break;
			}
			self.take_char(())?;
		}
		self.state = State::Data;
		Ok((self.cursor > start).then_some(Token::Text))
	}
	fn next_token_value(&mut self) -> LexerResult<Token> {
		match self.state {
			State::IrrecoverableError => return Ok(Token::Eof),
			State::PlainText => {
				if self.peek_byte()?.is_none() {
					return Ok(Token::Eof);
				}
				while self.take_char(())? {}
				return Ok(Token::Text);
			}
			State::RawText(name) => {
				if let Some(text) = self.raw_text(name)? {
					return Ok(text);
				}
			}
			State::Data => {}
		}
		if self.peek_byte()?.is_none() {
			Ok(Token::Eof)
		} else if self.at_markup()? {
			self.markup()
		} else {
			self.text()
		}
	}
	/// Get the next token and its span.
	///
	/// After an error the lexer can keep going, unless it was an IO error,
	/// then it only returns [`Token::Eof`].
	pub fn next_token(&mut self) -> (LexerResult<Token>, Range<usize>) {
		let start = self.cursor;
		let token = self.next_token_value();
		(token, start..self.cursor)
	}
	/// Current byte offset into the input.
	pub fn current_position(&self) -> usize { self.cursor }
	/// Line breaks seen so far.
	pub fn lines(&self) -> &LineIndex { &self.lines }
	/// Finish lexing, returning the line breaks seen.
	pub fn into_lines(self) -> LineIndex { self.lines }
}
