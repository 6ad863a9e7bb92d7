//! Scope pattern keys.
//!
//! A scope pattern is an ancestor chain written most-distant-first, e.g.
//! `call_expression > identifier` or `template_string > "${"`. Each segment is
//! either a bare node-type name (named node) or a quoted token (anonymous node),
//! optionally followed by a sibling-order qualifier: `[n]` counts same-type
//! preceding siblings, `[-n]` counts same-type following siblings (`[-1]` is
//! the last sibling of its type).
//!
//! Keys are parsed once at grammar load and re-rendered in canonical form so
//! that lookups against the candidates built by the matcher are exact string
//! comparisons.

use std::fmt;

/// Separator between segments in canonical form.
pub const SEPARATOR: &str = " > ";

/// Sibling-order qualifier on a pattern segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderQualifier {
	/// `[n]`: `n` same-type siblings precede the node.
	Forward(usize),
	/// `[-n]`: `n - 1` same-type siblings follow the node (`n >= 1`).
	Backward(usize),
}

impl fmt::Display for OrderQualifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Forward(n) => write!(f, "[{n}]"),
			Self::Backward(n) => write!(f, "[-{n}]"),
		}
	}
}

/// One `>`-separated element of a scope pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
	/// Type key: bare name, or the token wrapped in double quotes.
	pub key: String,
	pub order: Option<OrderQualifier>,
}

impl Segment {
	/// Returns true for quoted (anonymous token) segments.
	pub fn is_literal(&self) -> bool {
		self.key.starts_with('"')
	}
}

impl fmt::Display for Segment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.key)?;
		if let Some(order) = self.order {
			write!(f, "{order}")?;
		}
		Ok(())
	}
}

/// Reasons a scope pattern key is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
	#[error("empty segment")]
	EmptySegment,
	#[error("unterminated quoted token `{0}`")]
	UnterminatedLiteral(String),
	#[error("invalid order qualifier `{0}`")]
	InvalidQualifier(String),
	#[error("invalid node type `{0}`")]
	InvalidType(String),
}

/// A parsed scope pattern, most distant ancestor first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopePattern {
	segments: Vec<Segment>,
}

impl ScopePattern {
	/// Parses a pattern key.
	///
	/// Segments are split on `>` outside of quoted tokens, so `a>b` and
	/// `a > b` parse identically and `binary_expression > ">"` keeps its
	/// quoted `>` token.
	pub fn parse(input: &str) -> Result<Self, PatternError> {
		let segments = split_segments(input)?
			.into_iter()
			.map(parse_segment)
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Self { segments })
	}

	pub fn segments(&self) -> &[Segment] {
		&self.segments
	}

	/// Number of ancestors referenced beyond the node itself.
	pub fn depth(&self) -> usize {
		self.segments.len().saturating_sub(1)
	}

	/// Returns true if any segment carries an order qualifier.
	pub fn uses_order(&self) -> bool {
		self.segments.iter().any(|s| s.order.is_some())
	}

	/// Returns true if an ancestor segment carries an order qualifier.
	///
	/// The matcher only qualifies the node itself, so such patterns never match.
	pub fn has_ancestor_qualifier(&self) -> bool {
		let n = self.segments.len();
		self.segments[..n.saturating_sub(1)].iter().any(|s| s.order.is_some())
	}

	/// Canonical key string (`A > B > C[0]`).
	pub fn canonical(&self) -> String {
		self.to_string()
	}
}

impl fmt::Display for ScopePattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, segment) in self.segments.iter().enumerate() {
			if i > 0 {
				f.write_str(SEPARATOR)?;
			}
			write!(f, "{segment}")?;
		}
		Ok(())
	}
}

/// Splits on `>` separators that are not part of a quoted token.
///
/// A quoted token opens at a `"` that starts a segment and closes at the last
/// `"` before the next separator candidate that is followed only by an
/// optional qualifier. Tokens such as `">"` and `"""` are therefore preserved.
fn split_segments(input: &str) -> Result<Vec<&str>, PatternError> {
	let mut out = Vec::new();
	let mut rest = input.trim();
	if rest.is_empty() {
		return Err(PatternError::EmptySegment);
	}

	loop {
		if rest.starts_with('"') {
			let end = literal_end(rest)?;
			let tail = rest[end..].trim_start();
			match tail.strip_prefix('>') {
				Some(next) => {
					out.push(rest[..end].trim_end());
					rest = next.trim_start();
				}
				None => {
					out.push(rest);
					break;
				}
			}
		} else {
			match rest.find('>') {
				Some(idx) => {
					out.push(rest[..idx].trim_end());
					rest = rest[idx + 1..].trim_start();
				}
				None => {
					out.push(rest);
					break;
				}
			}
		}
		if rest.is_empty() {
			return Err(PatternError::EmptySegment);
		}
	}

	Ok(out)
}

/// Returns the byte index just past a quoted segment (including any qualifier).
fn literal_end(rest: &str) -> Result<usize, PatternError> {
	let bytes = rest.as_bytes();
	let mut candidate = None;
	let mut i = 1;
	while i < bytes.len() {
		if bytes[i] == b'"' {
			let after = &rest[i + 1..];
			let after_qualifier = skip_qualifier(after);
			let trimmed = after_qualifier.trim_start();
			if trimmed.is_empty() || trimmed.starts_with('>') {
				candidate = Some(rest.len() - after_qualifier.len());
				if trimmed.is_empty() {
					break;
				}
				// Prefer the shortest token ending right before a separator,
				// unless the remainder cannot start a valid segment.
				let next = trimmed[1..].trim_start();
				if !next.is_empty() {
					break;
				}
			}
		}
		i += 1;
	}
	candidate.ok_or_else(|| PatternError::UnterminatedLiteral(rest.to_string()))
}

fn skip_qualifier(s: &str) -> &str {
	if let Some(inner) = s.strip_prefix('[')
		&& let Some(close) = inner.find(']')
	{
		return &inner[close + 1..];
	}
	s
}

fn parse_segment(raw: &str) -> Result<Segment, PatternError> {
	let raw = raw.trim();
	if raw.is_empty() {
		return Err(PatternError::EmptySegment);
	}

	let (key, order) = match raw.strip_suffix(']') {
		Some(body) => {
			let open = body
				.rfind('[')
				.ok_or_else(|| PatternError::InvalidQualifier(raw.to_string()))?;
			let key = &body[..open];
			// `"]"` style tokens end in a quote, so a `]` here is always a qualifier.
			(key, Some(parse_qualifier(&body[open + 1..], raw)?))
		}
		None => (raw, None),
	};

	if key.is_empty() {
		return Err(PatternError::EmptySegment);
	}
	if key.starts_with('"') {
		if key.len() < 3 || !key.ends_with('"') {
			return Err(PatternError::UnterminatedLiteral(key.to_string()));
		}
	} else if key.chars().any(char::is_whitespace) || key.contains('"') {
		return Err(PatternError::InvalidType(key.to_string()));
	}

	Ok(Segment {
		key: key.to_string(),
		order,
	})
}

fn parse_qualifier(text: &str, raw: &str) -> Result<OrderQualifier, PatternError> {
	let invalid = || PatternError::InvalidQualifier(raw.to_string());
	match text.strip_prefix('-') {
		Some(digits) => {
			let n: usize = digits.parse().map_err(|_| invalid())?;
			if n == 0 {
				return Err(invalid());
			}
			Ok(OrderQualifier::Backward(n))
		}
		None => text.parse().map(OrderQualifier::Forward).map_err(|_| invalid()),
	}
}
