//! Comments: named annotations anchored to one or more text ranges.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{OtError, Result};
use crate::range::{CharIdx, CharLen, Range};

/// A comment anchored to sorted, non-overlapping, non-touching ranges.
///
/// A comment whose text has all been removed keeps existing with no ranges,
/// so a later insertion bound to its id can bring it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CommentRaw", into = "CommentRaw")]
pub struct Comment {
	id: String,
	ranges: Vec<Range>,
	resolved: bool,
}

#[derive(Serialize, Deserialize)]
struct CommentRaw {
	id: String,
	ranges: Vec<Range>,
	#[serde(default, skip_serializing_if = "std::ops::Not::not")]
	resolved: bool,
}

impl Comment {
	/// Builds a comment, sorting its ranges and merging touching ones.
	///
	/// Empty ranges are dropped. Overlapping ranges are rejected with
	/// [`OtError::OverlappingRanges`].
	pub fn new(id: impl Into<String>, ranges: impl IntoIterator<Item = Range>, resolved: bool) -> Result<Self> {
		let mut sorted: Vec<Range> = ranges.into_iter().filter(|r| !r.is_empty()).collect();
		sorted.sort_by_key(Range::start);

		let mut merged: Vec<Range> = Vec::with_capacity(sorted.len());
		for range in sorted {
			match merged.last_mut() {
				Some(last) if last.overlaps(&range) => return Err(OtError::OverlappingRanges),
				Some(last) if last.touches(&range) => *last = last.union(&range),
				_ => merged.push(range),
			}
		}

		Ok(Self {
			id: id.into(),
			ranges: merged,
			resolved,
		})
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn ranges(&self) -> &[Range] {
		&self.ranges
	}

	pub fn resolved(&self) -> bool {
		self.resolved
	}

	pub fn set_resolved(&mut self, resolved: bool) {
		self.resolved = resolved;
	}

	/// Shifts ranges around an insertion of `length` characters at `cursor`.
	///
	/// When `extend` is set (the insertion is bound to this comment) the range
	/// containing or touching the cursor grows to cover the insertion, and a
	/// new range is added if none does. Otherwise a range containing the
	/// cursor is split around the inserted text.
	pub fn apply_insert(&mut self, cursor: CharIdx, length: CharLen, extend: bool) {
		let mut extended = false;
		let mut ranges = Vec::with_capacity(self.ranges.len() + 1);

		for range in &self.ranges {
			if cursor == range.end() {
				if extend {
					ranges.push(range.extend_by(length));
					extended = true;
				} else {
					ranges.push(*range);
				}
			} else if cursor == range.start() {
				if extend {
					ranges.push(range.extend_by(length));
					extended = true;
				} else {
					ranges.push(range.shifted(length));
				}
			} else if range.start_is_after(cursor) {
				ranges.push(range.shifted(length));
			} else if range.contains_cursor(cursor) {
				if extend {
					ranges.push(range.extend_by(length));
					extended = true;
				} else {
					ranges.push(Range::new(range.start(), cursor - range.start()));
					ranges.push(Range::new(cursor + length, range.end() - cursor));
				}
			} else {
				ranges.push(*range);
			}
		}

		if extend && !extended {
			ranges.push(Range::new(cursor, length));
		}

		self.ranges = ranges;
		self.coalesce();
	}

	/// Removes `deleted` from every range and shifts later ranges left.
	pub fn apply_delete(&mut self, deleted: Range) {
		for range in &mut self.ranges {
			if range.overlaps(&deleted) {
				*range = range.subtract(&deleted);
			} else if range.starts_after(&deleted) {
				*range = range.shifted_back(deleted.length());
			}
		}
		self.coalesce();
	}

	/// Sorts, drops empty ranges and merges touching or overlapping ones.
	fn coalesce(&mut self) {
		self.ranges.retain(|r| !r.is_empty());
		self.ranges.sort_by_key(Range::start);
		let mut merged: Vec<Range> = Vec::with_capacity(self.ranges.len());
		for range in self.ranges.drain(..) {
			match merged.last_mut() {
				Some(last) if last.can_merge(&range) => *last = last.union(&range),
				_ => merged.push(range),
			}
		}
		self.ranges = merged;
	}
}

impl TryFrom<CommentRaw> for Comment {
	type Error = OtError;

	fn try_from(raw: CommentRaw) -> Result<Self> {
		Comment::new(raw.id, raw.ranges, raw.resolved)
	}
}

impl From<Comment> for CommentRaw {
	fn from(comment: Comment) -> Self {
		Self {
			id: comment.id,
			ranges: comment.ranges,
			resolved: comment.resolved,
		}
	}
}

/// Comments keyed by id, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Comment>", into = "Vec<Comment>")]
pub struct CommentList {
	comments: IndexMap<String, Comment>,
}

impl CommentList {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.comments.len()
	}

	pub fn is_empty(&self) -> bool {
		self.comments.is_empty()
	}

	pub fn get(&self, id: &str) -> Option<&Comment> {
		self.comments.get(id)
	}

	pub fn iter(&self) -> impl Iterator<Item = &Comment> {
		self.comments.values()
	}

	pub fn ids(&self) -> impl Iterator<Item = &str> {
		self.comments.keys().map(String::as_str)
	}

	/// Inserts or replaces a comment. A replaced comment keeps its position.
	pub fn add(&mut self, comment: Comment) {
		self.comments.insert(comment.id.clone(), comment);
	}

	/// Removes a comment, returning it. Unknown ids are ignored.
	pub fn delete(&mut self, id: &str) -> Option<Comment> {
		self.comments.shift_remove(id)
	}

	/// Sets the resolved flag, returning false if the comment does not exist.
	pub fn set_resolved(&mut self, id: &str, resolved: bool) -> bool {
		match self.comments.get_mut(id) {
			Some(comment) => {
				comment.set_resolved(resolved);
				true
			}
			None => false,
		}
	}

	/// Applies an insertion of `inserted.length()` characters at
	/// `inserted.start()` to every comment, extending those in `comment_ids`.
	pub fn apply_insert(&mut self, inserted: Range, comment_ids: &[String]) {
		for comment in self.comments.values_mut() {
			let extend = comment_ids.iter().any(|id| *id == comment.id);
			comment.apply_insert(inserted.start(), inserted.length(), extend);
		}
	}

	/// Applies a deletion to every comment.
	pub fn apply_delete(&mut self, deleted: Range) {
		for comment in self.comments.values_mut() {
			comment.apply_delete(deleted);
		}
	}

	/// Ids of comments whose ranges cover all of `span`.
	pub(crate) fn ids_covering(&self, span: Range) -> impl Iterator<Item = &str> {
		self.comments
			.values()
			.filter(move |c| c.ranges.iter().any(|r| r.contains(&span)))
			.map(|c| c.id.as_str())
	}

	/// Positions at which any comment range starts or ends.
	pub(crate) fn boundaries(&self) -> impl Iterator<Item = CharIdx> + '_ {
		self.comments
			.values()
			.flat_map(|c| c.ranges.iter().flat_map(|r| [r.start(), r.end()]))
	}
}

impl From<Vec<Comment>> for CommentList {
	fn from(comments: Vec<Comment>) -> Self {
		let mut list = Self::new();
		for comment in comments {
			list.add(comment);
		}
		list
	}
}

impl From<CommentList> for Vec<Comment> {
	fn from(list: CommentList) -> Self {
		list.comments.into_values().collect()
	}
}

impl FromIterator<Comment> for CommentList {
	fn from_iter<I: IntoIterator<Item = Comment>>(iter: I) -> Self {
		Self::from(iter.into_iter().collect::<Vec<_>>())
	}
}
