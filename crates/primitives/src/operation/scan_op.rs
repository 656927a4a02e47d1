use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{OtError, Result};
use crate::range::CharLen;
use crate::tracking::{Tracking, TrackingProps};

/// Comment ids an insertion is bound to. Usually zero or one.
pub type CommentIds = SmallVec<[String; 1]>;

/// Returns true if the text has characters that need a UTF-16 surrogate pair.
pub(crate) fn has_non_bmp(text: &str) -> bool {
	text.chars().any(|c| u32::from(c) > 0xFFFF)
}

/// A text insertion with cached character length.
///
/// Storing the character count avoids repeated O(n) `.chars().count()` calls
/// while applying, composing and transforming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
	text: String,
	char_len: CharLen,
}

impl Insertion {
	#[inline]
	pub fn new(text: String) -> Self {
		let char_len = text.chars().count();
		Self { text, char_len }
	}

	#[inline]
	pub fn text(&self) -> &str {
		&self.text
	}

	#[inline]
	pub fn char_len(&self) -> CharLen {
		self.char_len
	}

	fn push_str(&mut self, other: &Insertion) {
		self.text.push_str(&other.text);
		self.char_len += other.char_len;
	}

	/// Splits after the first `n` characters.
	fn split_at(self, n: CharLen) -> (Insertion, Insertion) {
		debug_assert!(n <= self.char_len);
		let byte_idx = self.text.char_indices().nth(n).map_or(self.text.len(), |(i, _)| i);
		let (head, tail) = self.text.split_at(byte_idx);
		(
			Insertion {
				text: head.to_owned(),
				char_len: n,
			},
			Insertion {
				text: tail.to_owned(),
				char_len: self.char_len - n,
			},
		)
	}
}

/// Keeps `length` input characters, optionally re-attributing them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetainOp {
	pub length: CharLen,
	pub tracking: Option<Tracking>,
}

impl RetainOp {
	pub fn new(length: CharLen, tracking: Option<Tracking>) -> Self {
		Self { length, tracking }
	}
}

/// Inserts text, optionally attributed and bound to comments.
#[derive(Debug, Clone)]
pub struct InsertOp {
	insertion: Insertion,
	tracking: Option<TrackingProps>,
	comment_ids: CommentIds,
}

impl InsertOp {
	/// Fails with [`OtError::InvalidInsertion`] for non-BMP text.
	pub fn new(
		text: impl Into<String>,
		tracking: Option<TrackingProps>,
		comment_ids: impl IntoIterator<Item = impl Into<String>>,
	) -> Result<Self> {
		let text = text.into();
		if has_non_bmp(&text) {
			return Err(OtError::InvalidInsertion);
		}

		let mut ids = CommentIds::new();
		for id in comment_ids {
			let id = id.into();
			if !ids.contains(&id) {
				ids.push(id);
			}
		}

		Ok(Self {
			insertion: Insertion::new(text),
			tracking,
			comment_ids: ids,
		})
	}

	pub fn text(&self) -> &str {
		self.insertion.text()
	}

	pub fn char_len(&self) -> CharLen {
		self.insertion.char_len()
	}

	pub fn tracking(&self) -> Option<&TrackingProps> {
		self.tracking.as_ref()
	}

	pub fn comment_ids(&self) -> &[String] {
		&self.comment_ids
	}

	pub(crate) fn set_tracking(&mut self, tracking: Option<TrackingProps>) {
		self.tracking = tracking;
	}

	fn same_comment_ids(&self, other: &InsertOp) -> bool {
		self.comment_ids.len() == other.comment_ids.len() && self.comment_ids.iter().all(|id| other.comment_ids.contains(id))
	}

	pub(crate) fn can_merge_with(&self, other: &InsertOp) -> bool {
		self.tracking == other.tracking && self.same_comment_ids(other)
	}

	pub(crate) fn append(&mut self, other: InsertOp) {
		self.insertion.push_str(&other.insertion);
	}

	pub(crate) fn split_at(self, n: CharLen) -> (InsertOp, InsertOp) {
		let (head, tail) = self.insertion.split_at(n);
		(
			InsertOp {
				insertion: head,
				tracking: self.tracking.clone(),
				comment_ids: self.comment_ids.clone(),
			},
			InsertOp {
				insertion: tail,
				tracking: self.tracking,
				comment_ids: self.comment_ids,
			},
		)
	}
}

/// Comment ids are compared as a set.
impl PartialEq for InsertOp {
	fn eq(&self, other: &Self) -> bool {
		self.insertion == other.insertion && self.tracking == other.tracking && self.same_comment_ids(other)
	}
}

impl Eq for InsertOp {}

/// Length bookkeeping for applying operations to a length-only document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LengthState {
	/// Output length produced so far.
	pub length: CharLen,
	/// Input characters consumed so far.
	pub input_cursor: CharLen,
	/// Total input length.
	pub input_length: CharLen,
}

/// One step of a text operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOp {
	Retain(RetainOp),
	Insert(InsertOp),
	Remove(CharLen),
}

impl ScanOp {
	/// Characters retained, inserted or removed.
	pub fn len(&self) -> CharLen {
		match self {
			Self::Retain(retain) => retain.length,
			Self::Insert(insert) => insert.char_len(),
			Self::Remove(length) => *length,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Same kind with identical metadata. Removes always merge.
	pub fn can_merge_with(&self, other: &ScanOp) -> bool {
		match (self, other) {
			(Self::Retain(a), Self::Retain(b)) => a.tracking == b.tracking,
			(Self::Insert(a), Self::Insert(b)) => a.can_merge_with(b),
			(Self::Remove(_), Self::Remove(_)) => true,
			_ => false,
		}
	}

	/// Appends `other` to this op.
	pub fn merge_with(&mut self, other: ScanOp) -> Result<()> {
		if !self.can_merge_with(&other) {
			return Err(OtError::CannotMerge);
		}
		match (self, other) {
			(Self::Retain(a), Self::Retain(b)) => a.length += b.length,
			(Self::Insert(a), Self::Insert(b)) => a.append(b),
			(Self::Remove(a), Self::Remove(b)) => *a += b,
			_ => return Err(OtError::CannotMerge),
		}
		Ok(())
	}

	/// Projects this op onto document lengths.
	pub fn apply_to_length(&self, state: LengthState) -> Result<LengthState> {
		let mut next = state;
		match self {
			Self::Retain(retain) => {
				if state.input_cursor + retain.length > state.input_length {
					return Err(OtError::apply(
						"Operation can't retain more chars than are left in the string.",
					));
				}
				next.length += retain.length;
				next.input_cursor += retain.length;
			}
			Self::Insert(insert) => next.length += insert.char_len(),
			Self::Remove(length) => {
				if state.input_cursor + length > state.input_length {
					return Err(OtError::apply(
						"Operation can't remove more chars than are left in the string.",
					));
				}
				next.input_cursor += length;
			}
		}
		Ok(next)
	}

	/// Splits after `n` characters. The second half may be empty.
	pub(crate) fn split_at(self, n: CharLen) -> (ScanOp, ScanOp) {
		match self {
			Self::Retain(retain) => (
				Self::Retain(RetainOp::new(n, retain.tracking.clone())),
				Self::Retain(RetainOp::new(retain.length - n, retain.tracking)),
			),
			Self::Insert(insert) => {
				let (head, tail) = insert.split_at(n);
				(Self::Insert(head), Self::Insert(tail))
			}
			Self::Remove(length) => (Self::Remove(n), Self::Remove(length - n)),
		}
	}
}

impl fmt::Display for ScanOp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Retain(retain) => write!(f, "retain {}", retain.length),
			Self::Insert(insert) => write!(f, "insert '{}'", insert.text()),
			Self::Remove(length) => write!(f, "remove {length}"),
		}
	}
}

/// Wire form of a scan op.
///
/// Positive integers retain, negative integers remove, strings insert.
/// Objects carry attribution or comment ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawScanOp {
	Length(i64),
	Text(String),
	Retain {
		r: CharLen,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		tracking: Option<Tracking>,
	},
	Insert {
		i: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		tracking: Option<TrackingProps>,
		#[serde(rename = "commentIds", default, skip_serializing_if = "SmallVec::is_empty")]
		comment_ids: CommentIds,
	},
}

impl TryFrom<RawScanOp> for ScanOp {
	type Error = OtError;

	fn try_from(raw: RawScanOp) -> Result<Self> {
		match raw {
			RawScanOp::Length(n) if n > 0 => Ok(Self::Retain(RetainOp::new(length_of(n)?, None))),
			RawScanOp::Length(n) if n < 0 => Ok(Self::Remove(length_of(n)?)),
			RawScanOp::Length(n) => Err(OtError::UnknownOperation(n.to_string())),
			RawScanOp::Text(text) => Ok(Self::Insert(InsertOp::new(text, None, CommentIds::new())?)),
			RawScanOp::Retain { r, tracking } => Ok(Self::Retain(RetainOp::new(r, tracking))),
			RawScanOp::Insert { i, tracking, comment_ids } => Ok(Self::Insert(InsertOp::new(i, tracking, comment_ids)?)),
		}
	}
}

fn length_of(n: i64) -> Result<CharLen> {
	CharLen::try_from(n.unsigned_abs()).map_err(|_| OtError::UnknownOperation(n.to_string()))
}

impl From<&ScanOp> for RawScanOp {
	fn from(op: &ScanOp) -> Self {
		match op {
			ScanOp::Retain(RetainOp { length, tracking: None }) => Self::Length(*length as i64),
			ScanOp::Retain(RetainOp { length, tracking }) => Self::Retain {
				r: *length,
				tracking: tracking.clone(),
			},
			ScanOp::Insert(insert) if insert.tracking.is_none() && insert.comment_ids.is_empty() => {
				Self::Text(insert.text().to_owned())
			}
			ScanOp::Insert(insert) => Self::Insert {
				i: insert.text().to_owned(),
				tracking: insert.tracking.clone(),
				comment_ids: insert.comment_ids.clone(),
			},
			ScanOp::Remove(length) => Self::Length(-(*length as i64)),
		}
	}
}
