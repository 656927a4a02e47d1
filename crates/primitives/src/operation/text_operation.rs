use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::trace;

use super::scan_op::{CommentIds, InsertOp, LengthState, RawScanOp, RetainOp, ScanOp, has_non_bmp};
use crate::comment::Comment;
use crate::error::{OtError, Result};
use crate::file_data::StringFileData;
use crate::range::{CharLen, Range};
use crate::tracking::{Tracking, TrackingProps};

/// Largest document, in characters, an operation may produce.
pub const MAX_STRING_LENGTH: CharLen = 2 * 1024 * 1024;

/// An edit to a document expressed as retain/insert/remove steps.
///
/// Operations are built with the chaining methods below. Adjacent steps of
/// the same kind and metadata merge, zero-length steps are dropped, and an
/// insert is always placed before a remove at the same position so that
/// equal edits have equal representations.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TextOperation {
	ops: Vec<ScanOp>,
	base_length: CharLen,
	target_length: CharLen,
}

impl TextOperation {
	pub fn new() -> Self {
		Self::default()
	}

	/// Length of the document this operation applies to.
	pub fn base_length(&self) -> CharLen {
		self.base_length
	}

	/// Length of the document after applying this operation.
	pub fn target_length(&self) -> CharLen {
		self.target_length
	}

	pub fn ops(&self) -> &[ScanOp] {
		&self.ops
	}

	/// Keeps `n` characters.
	pub fn retain(self, n: CharLen) -> Self {
		self.retain_with(n, None)
	}

	/// Keeps `n` characters, re-attributing them when `tracking` is set.
	pub fn retain_with(mut self, n: CharLen, tracking: Option<Tracking>) -> Self {
		self.push(ScanOp::Retain(RetainOp::new(n, tracking)));
		self
	}

	/// Inserts untracked text bound to no comments.
	pub fn insert(self, text: impl Into<String>) -> Result<Self> {
		self.insert_with(text, None, CommentIds::new())
	}

	/// Inserts text with attribution and comment bindings.
	///
	/// Fails with [`OtError::InvalidInsertion`] if the text has non-BMP
	/// characters.
	pub fn insert_with(
		mut self,
		text: impl Into<String>,
		tracking: Option<TrackingProps>,
		comment_ids: impl IntoIterator<Item = impl Into<String>>,
	) -> Result<Self> {
		self.push(ScanOp::Insert(InsertOp::new(text, tracking, comment_ids)?));
		Ok(self)
	}

	/// Removes `n` characters.
	pub fn remove(mut self, n: CharLen) -> Self {
		self.push(ScanOp::Remove(n));
		self
	}

	/// Appends a step, merging it into the previous one where possible.
	pub fn push(&mut self, op: ScanOp) {
		if op.is_empty() {
			return;
		}

		match &op {
			ScanOp::Retain(retain) => {
				self.base_length += retain.length;
				self.target_length += retain.length;
			}
			ScanOp::Insert(insert) => self.target_length += insert.char_len(),
			ScanOp::Remove(length) => self.base_length += length,
		}

		match op {
			ScanOp::Insert(ins) => match self.ops.as_mut_slice() {
				[.., ScanOp::Insert(prev)] | [.., ScanOp::Insert(prev), ScanOp::Remove(_)] if prev.can_merge_with(&ins) => {
					prev.append(ins);
				}
				[.., last @ ScanOp::Remove(_)] => {
					let removed = std::mem::replace(last, ScanOp::Insert(ins));
					self.ops.push(removed);
				}
				_ => self.ops.push(ScanOp::Insert(ins)),
			},
			op => match (self.ops.last_mut(), op) {
				(Some(ScanOp::Retain(prev)), ScanOp::Retain(next)) if prev.tracking == next.tracking => {
					prev.length += next.length;
				}
				(Some(ScanOp::Remove(prev)), ScanOp::Remove(next)) => *prev += next,
				(_, op) => self.ops.push(op),
			},
		}
	}

	/// True if applying this operation changes nothing.
	pub fn is_noop(&self) -> bool {
		match self.ops.as_slice() {
			[] => true,
			[ScanOp::Retain(retain)] => retain.tracking.is_none(),
			_ => false,
		}
	}

	/// True if `other` can be composed after this operation.
	pub fn can_be_composed_with(&self, other: &TextOperation) -> bool {
		self.target_length == other.base_length
	}

	/// Whether `other` continues this edit closely enough to share an undo
	/// step: consecutive typing, or consecutive deleting with either
	/// backspace or the delete key.
	pub fn can_be_composed_with_for_undo(&self, other: &TextOperation) -> bool {
		if self.is_noop() || other.is_noop() {
			return true;
		}

		let (Some(a), Some(b)) = (self.simple_op(), other.simple_op()) else {
			return false;
		};
		let (start_a, start_b) = (self.start_index(), other.start_index());
		match (a, b) {
			(ScanOp::Insert(a), ScanOp::Insert(_)) => start_a + a.char_len() == start_b,
			(ScanOp::Remove(_), ScanOp::Remove(b)) => start_b + b == start_a || start_a == start_b,
			_ => false,
		}
	}

	/// The single non-retain step of an operation that has at most one.
	fn simple_op(&self) -> Option<&ScanOp> {
		match self.ops.as_slice() {
			[op] => Some(op),
			[ScanOp::Retain(_), op] | [op, ScanOp::Retain(_)] => Some(op),
			[ScanOp::Retain(_), op, ScanOp::Retain(_)] => Some(op),
			_ => None,
		}
	}

	fn start_index(&self) -> CharLen {
		match self.ops.first() {
			Some(ScanOp::Retain(retain)) => retain.length,
			_ => 0,
		}
	}

	/// Applies the operation to a document, content and annotations together.
	///
	/// On error the document is left untouched.
	pub fn apply(&self, file: &mut StringFileData) -> Result<()> {
		self.apply_with_limit(file, MAX_STRING_LENGTH)
	}

	/// [`TextOperation::apply`] with a caller-chosen length limit.
	pub fn apply_with_limit(&self, file: &mut StringFileData, max_length: CharLen) -> Result<()> {
		let content = file.content();
		if has_non_bmp(content) {
			return Err(OtError::apply("The string contains non BMP characters."));
		}
		let input_length = content.chars().count();
		if input_length != self.base_length {
			return Err(OtError::apply(
				"The operation's base length must be equal to the string's length.",
			));
		}
		if self.target_length > max_length {
			return Err(OtError::TooLong {
				length: self.target_length,
			});
		}

		let mut chars = content.chars();
		let mut result = String::with_capacity(content.len());
		let mut comments = file.comments().clone();
		let mut tracked = file.tracked_changes().clone();
		let mut cursor = 0;
		let mut input_cursor = 0;

		for op in &self.ops {
			match op {
				ScanOp::Retain(retain) => {
					if input_cursor + retain.length > input_length {
						return Err(OtError::apply(
							"Operation can't retain more chars than are left in the string.",
						));
					}
					tracked.retain_unmerged(cursor, retain.length, retain.tracking.as_ref());
					result.extend(chars.by_ref().take(retain.length));
					cursor += retain.length;
					input_cursor += retain.length;
				}
				ScanOp::Insert(insert) => {
					let length = insert.char_len();
					tracked.insert_unmerged(cursor, length, insert.tracking());
					comments.apply_insert(Range::new(cursor, length), insert.comment_ids());
					result.push_str(insert.text());
					cursor += length;
				}
				ScanOp::Remove(length) => {
					if input_cursor + length > input_length {
						return Err(OtError::apply(
							"Operation can't remove more chars than are left in the string.",
						));
					}
					tracked.delete_unmerged(cursor, *length);
					comments.apply_delete(Range::new(cursor, *length));
					chars.by_ref().take(*length).for_each(drop);
					input_cursor += length;
				}
			}
		}

		if input_cursor != input_length {
			return Err(OtError::apply("The operation didn't operate on the whole string."));
		}

		tracked.normalize();
		trace!(
			base = self.base_length,
			target = cursor,
			ops = self.ops.len(),
			"applied text operation"
		);
		file.replace(result, comments, tracked);
		Ok(())
	}

	/// Projects the operation onto a document of known length.
	pub fn apply_to_length(&self, length: CharLen) -> Result<CharLen> {
		self.apply_to_length_with_limit(length, MAX_STRING_LENGTH)
	}

	/// [`TextOperation::apply_to_length`] with a caller-chosen length limit.
	pub fn apply_to_length_with_limit(&self, length: CharLen, max_length: CharLen) -> Result<CharLen> {
		if length != self.base_length {
			return Err(OtError::apply(
				"The operation's base length must be equal to the string's length.",
			));
		}

		let mut state = LengthState {
			length: 0,
			input_cursor: 0,
			input_length: length,
		};
		for op in &self.ops {
			state = op.apply_to_length(state)?;
		}

		if state.input_cursor != length {
			return Err(OtError::apply("The operation didn't operate on the whole string."));
		}
		if state.length > max_length {
			return Err(OtError::TooLong { length: state.length });
		}
		Ok(state.length)
	}

	/// Moves a comment's ranges through this operation as if applied to a
	/// document holding that comment.
	pub fn apply_to_comment(&self, comment: &mut Comment) {
		let mut cursor = 0;
		for op in &self.ops {
			match op {
				ScanOp::Retain(retain) => cursor += retain.length,
				ScanOp::Insert(insert) => {
					let bound = insert.comment_ids().iter().any(|id| id == comment.id());
					comment.apply_insert(cursor, insert.char_len(), bound);
					cursor += insert.char_len();
				}
				ScanOp::Remove(length) => comment.apply_delete(Range::new(cursor, *length)),
			}
		}
	}

	/// Builds the operation that undoes this one.
	///
	/// `previous` is the document before this operation was applied. Removed
	/// text comes back split at every comment and tracked-change boundary so
	/// each piece regains the comment bindings and attribution it had.
	pub fn invert(&self, previous: &StringFileData) -> Result<TextOperation> {
		let chars: Vec<char> = previous.content().chars().collect();
		if chars.len() != self.base_length {
			return Err(OtError::apply(
				"The operation's base length must be equal to the string's length.",
			));
		}

		let tracked = previous.tracked_changes();
		let comments = previous.comments();
		let mut inverse = TextOperation::new();
		let mut cursor = 0;

		for op in &self.ops {
			match op {
				ScanOp::Retain(RetainOp { length, tracking: None }) => {
					inverse.push(ScanOp::Retain(RetainOp::new(*length, None)));
					cursor += length;
				}
				ScanOp::Retain(RetainOp { length, .. }) => {
					let span = Range::new(cursor, *length);
					let mut at = span.start();
					for change in tracked.intersect_range(span) {
						if change.range.start() > at {
							let gap = change.range.start() - at;
							inverse.push(ScanOp::Retain(RetainOp::new(gap, Some(Tracking::Clear))));
						}
						at = change.range.end();
						inverse.push(ScanOp::Retain(RetainOp::new(
							change.range.length(),
							Some(Tracking::Props(change.tracking)),
						)));
					}
					if span.end() > at {
						inverse.push(ScanOp::Retain(RetainOp::new(span.end() - at, Some(Tracking::Clear))));
					}
					cursor += length;
				}
				ScanOp::Insert(insert) => inverse.push(ScanOp::Remove(insert.char_len())),
				ScanOp::Remove(length) => {
					let span = Range::new(cursor, *length);
					let mut cuts: Vec<CharLen> = comments
						.boundaries()
						.chain(tracked.iter().flat_map(|c| [c.range.start(), c.range.end()]))
						.filter(|&p| p > span.start() && p < span.end())
						.chain([span.start(), span.end()])
						.collect();
					cuts.sort_unstable();
					cuts.dedup();

					for pair in cuts.windows(2) {
						let piece = Range::new(pair[0], pair[1] - pair[0]);
						let text: String = chars[piece.start()..piece.end()].iter().collect();
						let tracking = tracked.tracked_changes_at(piece.start()).next().map(|c| c.tracking.clone());
						let ids: Vec<String> = comments.ids_covering(piece).map(str::to_owned).collect();
						inverse.push(ScanOp::Insert(InsertOp::new(text, tracking, ids)?));
					}
					cursor += length;
				}
			}
		}

		Ok(inverse)
	}

	/// Combines this operation with one applied after it.
	///
	/// Where both retain a span with attribution, the second wins; a clear in
	/// the second drops attribution set by the first.
	pub fn compose(&self, other: &TextOperation) -> Result<TextOperation> {
		if self.target_length != other.base_length {
			return Err(OtError::LengthMismatch(
				"The base length of the second operation has to be the target length of the first operation",
			));
		}

		let mut result = TextOperation::new();
		let mut ops1 = self.ops.iter().cloned();
		let mut ops2 = other.ops.iter().cloned();
		let mut op1 = ops1.next();
		let mut op2 = ops2.next();

		loop {
			match (op1.take(), op2.take()) {
				(None, None) => break,
				(Some(ScanOp::Remove(length)), b) => {
					result.push(ScanOp::Remove(length));
					op1 = ops1.next();
					op2 = b;
				}
				(a, Some(insert @ ScanOp::Insert(_))) => {
					result.push(insert);
					op1 = a;
					op2 = ops2.next();
				}
				(None, Some(_)) => {
					return Err(OtError::LengthMismatch(
						"Cannot compose operations: first operation is too short.",
					));
				}
				(Some(_), None) => {
					return Err(OtError::LengthMismatch(
						"Cannot compose operations: first operation is too long.",
					));
				}
				(Some(ScanOp::Retain(a)), Some(ScanOp::Retain(b))) => {
					let length = a.length.min(b.length);
					let (head_a, rest_a) = split_retain(a, length);
					let (head_b, rest_b) = split_retain(b, length);
					let tracking = head_b.tracking.or(head_a.tracking);
					result.push(ScanOp::Retain(RetainOp::new(length, tracking)));
					op1 = next_or(rest_a, &mut ops1);
					op2 = next_or(rest_b, &mut ops2);
				}
				(Some(a @ ScanOp::Insert(_)), Some(b @ ScanOp::Remove(_))) => {
					let length = a.len().min(b.len());
					let (_, rest_a) = a.split_at(length);
					let (_, rest_b) = b.split_at(length);
					op1 = next_or(rest_a, &mut ops1);
					op2 = next_or(rest_b, &mut ops2);
				}
				(Some(ScanOp::Insert(a)), Some(ScanOp::Retain(b))) => {
					let length = a.char_len().min(b.length);
					let (mut head, rest_a) = a.split_at(length);
					let (retain, rest_b) = split_retain(b, length);
					let rest_a = ScanOp::Insert(rest_a);
					match retain.tracking {
						Some(Tracking::Props(props)) => head.set_tracking(Some(props)),
						Some(Tracking::Clear) => head.set_tracking(None),
						None => {}
					}
					result.push(ScanOp::Insert(head));
					op1 = next_or(rest_a, &mut ops1);
					op2 = next_or(rest_b, &mut ops2);
				}
				(Some(a @ ScanOp::Retain(_)), Some(b @ ScanOp::Remove(_))) => {
					let length = a.len().min(b.len());
					let (_, rest_a) = a.split_at(length);
					let (_, rest_b) = b.split_at(length);
					result.push(ScanOp::Remove(length));
					op1 = next_or(rest_a, &mut ops1);
					op2 = next_or(rest_b, &mut ops2);
				}
			}
		}

		trace!(
			base = result.base_length,
			target = result.target_length,
			"composed text operations"
		);
		Ok(result)
	}

	/// Transforms two concurrent operations against each other.
	///
	/// Returns `(a', b')` such that `a.compose(b')` and `b.compose(a')` have
	/// the same effect. Inserts at the same position order `a` before `b`.
	/// Where both retain a span, `a`'s attribution wins.
	pub fn transform(a: &TextOperation, b: &TextOperation) -> Result<(TextOperation, TextOperation)> {
		if a.base_length != b.base_length {
			return Err(OtError::LengthMismatch("Both operations have to have the same base length"));
		}

		let mut a_prime = TextOperation::new();
		let mut b_prime = TextOperation::new();
		let mut ops1 = a.ops.iter().cloned();
		let mut ops2 = b.ops.iter().cloned();
		let mut op1 = ops1.next();
		let mut op2 = ops2.next();

		loop {
			match (op1.take(), op2.take()) {
				(None, None) => break,
				(Some(insert @ ScanOp::Insert(_)), other) => {
					b_prime.push(ScanOp::Retain(RetainOp::new(insert.len(), None)));
					a_prime.push(insert);
					op1 = ops1.next();
					op2 = other;
				}
				(other, Some(insert @ ScanOp::Insert(_))) => {
					a_prime.push(ScanOp::Retain(RetainOp::new(insert.len(), None)));
					b_prime.push(insert);
					op1 = other;
					op2 = ops2.next();
				}
				(None, Some(_)) => {
					return Err(OtError::LengthMismatch(
						"Cannot transform operations: first operation is too short.",
					));
				}
				(Some(_), None) => {
					return Err(OtError::LengthMismatch(
						"Cannot transform operations: first operation is too long.",
					));
				}
				(Some(ScanOp::Retain(x)), Some(ScanOp::Retain(y))) => {
					let length = x.length.min(y.length);
					let (head_x, rest_x) = split_retain(x, length);
					let (head_y, rest_y) = split_retain(y, length);
					if head_x.tracking.is_some() {
						a_prime.push(ScanOp::Retain(head_x));
						b_prime.push(ScanOp::Retain(RetainOp::new(length, None)));
					} else {
						a_prime.push(ScanOp::Retain(RetainOp::new(length, None)));
						b_prime.push(ScanOp::Retain(head_y));
					}
					op1 = next_or(rest_x, &mut ops1);
					op2 = next_or(rest_y, &mut ops2);
				}
				(Some(x @ ScanOp::Remove(_)), Some(y @ ScanOp::Remove(_))) => {
					let length = x.len().min(y.len());
					op1 = next_or(x.split_at(length).1, &mut ops1);
					op2 = next_or(y.split_at(length).1, &mut ops2);
				}
				(Some(x @ ScanOp::Remove(_)), Some(y @ ScanOp::Retain(_))) => {
					let length = x.len().min(y.len());
					a_prime.push(ScanOp::Remove(length));
					op1 = next_or(x.split_at(length).1, &mut ops1);
					op2 = next_or(y.split_at(length).1, &mut ops2);
				}
				(Some(x @ ScanOp::Retain(_)), Some(y @ ScanOp::Remove(_))) => {
					let length = x.len().min(y.len());
					b_prime.push(ScanOp::Remove(length));
					op1 = next_or(x.split_at(length).1, &mut ops1);
					op2 = next_or(y.split_at(length).1, &mut ops2);
				}
			}
		}

		trace!(
			base = a.base_length,
			a_target = a_prime.target_length,
			b_target = b_prime.target_length,
			"transformed text operations"
		);
		Ok((a_prime, b_prime))
	}

	/// Wire form: a JSON array of scan ops.
	pub fn to_json(&self) -> Value {
		Value::Array(
			self.ops
				.iter()
				.map(|op| serde_json::to_value(RawScanOp::from(op)).unwrap_or(Value::Null))
				.collect(),
		)
	}

	/// Parses the wire form, accepting a bare array or a
	/// `{"textOperation": [...]}` envelope.
	pub fn from_json(value: &Value) -> Result<Self> {
		let ops = match value {
			Value::Object(map) => map
				.get("textOperation")
				.ok_or_else(|| OtError::UnknownOperation(value.to_string()))?,
			other => other,
		};
		let raw: Vec<RawScanOp> = serde_json::from_value(ops.clone())?;
		Self::from_raw(raw)
	}

	fn from_raw(raw: Vec<RawScanOp>) -> Result<Self> {
		let mut operation = TextOperation::new();
		for op in raw {
			operation.push(ScanOp::try_from(op)?);
		}
		Ok(operation)
	}
}

/// Splits a retain after `n` characters, returning the rest as a scan op.
fn split_retain(retain: RetainOp, n: CharLen) -> (RetainOp, ScanOp) {
	let rest = RetainOp::new(retain.length - n, retain.tracking.clone());
	(RetainOp::new(n, retain.tracking), ScanOp::Retain(rest))
}

/// Continues with the remainder of a split op, or the next op once it is
/// used up.
fn next_or(rest: ScanOp, iter: &mut impl Iterator<Item = ScanOp>) -> Option<ScanOp> {
	if rest.is_empty() { iter.next() } else { Some(rest) }
}

impl fmt::Display for TextOperation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (idx, op) in self.ops.iter().enumerate() {
			if idx > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{op}")?;
		}
		Ok(())
	}
}

impl Serialize for TextOperation {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		serializer.collect_seq(self.ops.iter().map(RawScanOp::from))
	}
}

impl<'de> Deserialize<'de> for TextOperation {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		let raw = Vec::<RawScanOp>::deserialize(deserializer)?;
		Self::from_raw(raw).map_err(serde::de::Error::custom)
	}
}
