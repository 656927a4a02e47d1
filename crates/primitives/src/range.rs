use serde::{Deserialize, Serialize};

use crate::error::{OtError, Result};

/// A position in the text, measured in characters (not bytes).
///
/// Inserted and base text are restricted to the Basic Multilingual Plane, so
/// one character is also one UTF-16 code unit on the wire.
pub type CharIdx = usize;

/// A length or count in the text, measured in characters (not bytes).
///
/// This is distinct from CharIdx to avoid accidentally passing an index
/// where a length is expected or vice versa.
pub type CharLen = usize;

/// A half-open interval `[pos, pos + length)` of characters.
///
/// Ranges are plain values: every adjustment returns a new range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
	pos: CharIdx,
	length: CharLen,
}

impl Range {
	/// Creates a range starting at `pos` spanning `length` characters.
	#[inline]
	pub const fn new(pos: CharIdx, length: CharLen) -> Self {
		Self { pos, length }
	}

	/// Start of the range (inclusive).
	#[inline]
	pub fn pos(&self) -> CharIdx {
		self.pos
	}

	/// Alias of [`Range::pos`].
	#[inline]
	pub fn start(&self) -> CharIdx {
		self.pos
	}

	/// Number of characters covered.
	#[inline]
	pub fn length(&self) -> CharLen {
		self.length
	}

	/// End of the range (exclusive).
	#[inline]
	pub fn end(&self) -> CharIdx {
		self.pos + self.length
	}

	/// Returns true if the range covers no characters.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.length == 0
	}

	/// Returns true if this range starts at or after the end of `other`.
	pub fn starts_after(&self, other: &Range) -> bool {
		self.start() >= other.end()
	}

	/// Returns true if this range starts strictly after `pos`.
	pub fn start_is_after(&self, pos: CharIdx) -> bool {
		self.start() > pos
	}

	/// Returns true if the ranges share at least one character.
	///
	/// Touching ranges do not overlap.
	pub fn overlaps(&self, other: &Range) -> bool {
		self.start() < other.end() && self.end() > other.start()
	}

	/// Returns true if one range ends exactly where the other starts.
	pub fn touches(&self, other: &Range) -> bool {
		self.end() == other.start() || self.start() == other.end()
	}

	/// Returns true if `other` lies entirely inside this range.
	pub fn contains(&self, other: &Range) -> bool {
		self.start() <= other.start() && self.end() >= other.end()
	}

	/// Returns true if `cursor` lies in `[start, end]`, both ends inclusive.
	pub fn contains_cursor(&self, cursor: CharIdx) -> bool {
		self.start() <= cursor && cursor <= self.end()
	}

	/// Removes the part of `other` that overlaps this range from its length.
	///
	/// Subtracting a covering range leaves an empty range at the original
	/// start. Subtracting a disjoint range is a no-op.
	pub fn subtract(&self, other: &Range) -> Range {
		if self.contains(other) {
			Range::new(self.pos, self.length - other.length)
		} else if other.contains(self) {
			Range::new(self.pos, 0)
		} else if self.overlaps(other) {
			if other.start() < self.start() {
				Range::new(other.pos, self.length - (other.end() - self.start()))
			} else {
				Range::new(self.pos, self.length - (self.end() - other.start()))
			}
		} else {
			*self
		}
	}

	/// Returns true if the ranges overlap or touch.
	pub fn can_merge(&self, other: &Range) -> bool {
		self.overlaps(other) || self.touches(other)
	}

	/// Returns the union of two overlapping or touching ranges.
	pub fn merge(&self, other: &Range) -> Result<Range> {
		if !self.can_merge(other) {
			return Err(OtError::CannotMerge);
		}
		Ok(self.union(other))
	}

	/// Smallest range covering both, without checking adjacency.
	pub(crate) fn union(&self, other: &Range) -> Range {
		let start = self.start().min(other.start());
		let end = self.end().max(other.end());
		Range::new(start, end - start)
	}

	/// Returns the overlapping part of both ranges, if any.
	pub fn intersect(&self, other: &Range) -> Option<Range> {
		let start = self.start().max(other.start());
		let end = self.end().min(other.end());
		(start < end).then(|| Range::new(start, end - start))
	}

	/// Splits the range at the absolute `cursor`.
	///
	/// Splitting at either boundary yields one empty part.
	pub fn split_at(&self, cursor: CharIdx) -> Result<(Range, Range)> {
		if !self.contains_cursor(cursor) {
			return Err(OtError::CursorOutOfRange { cursor, range: *self });
		}
		let left = Range::new(self.pos, cursor - self.pos);
		let right = Range::new(cursor, self.end() - cursor);
		Ok((left, right))
	}

	/// Splits at `cursor` and opens a gap of `length` for an insertion.
	///
	/// Returns `(left, inserted, right)` where `right` has been shifted past
	/// the inserted span.
	pub fn insert_at(&self, cursor: CharIdx, length: CharLen) -> Result<(Range, Range, Range)> {
		let (left, right) = self.split_at(cursor)?;
		Ok((left, Range::new(cursor, length), right.shifted(length)))
	}

	/// Grows the range by `n` characters at its end.
	pub fn extend_by(&self, n: CharLen) -> Range {
		Range::new(self.pos, self.length + n)
	}

	/// Shrinks the range by `n` characters at its end.
	pub fn shrink_by(&self, n: CharLen) -> Result<Range> {
		let length = self
			.length
			.checked_sub(n)
			.ok_or(OtError::ShrinkTooFar { range: *self, by: n })?;
		Ok(Range::new(self.pos, length))
	}

	/// Moves the range by a signed offset.
	pub fn move_by(&self, by: isize) -> Result<Range> {
		let pos = self
			.pos
			.checked_add_signed(by)
			.ok_or(OtError::MoveOutOfBounds { range: *self, by })?;
		Ok(Range::new(pos, self.length))
	}

	/// Moves the range right by `n` characters.
	#[inline]
	pub(crate) fn shifted(&self, n: CharLen) -> Range {
		Range::new(self.pos + n, self.length)
	}

	/// Moves the range left by `n` characters, saturating at zero.
	#[inline]
	pub(crate) fn shifted_back(&self, n: CharLen) -> Range {
		Range::new(self.pos.saturating_sub(n), self.length)
	}
}
