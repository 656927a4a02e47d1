//! Eager document materialization: full text plus annotations.

use serde::{Deserialize, Serialize};

use crate::comment::CommentList;
use crate::range::CharLen;
use crate::tracked_change::TrackedChangeList;
use crate::tracking::TrackingType;

/// A document held entirely in memory.
///
/// Content changes only through [`crate::TextOperation::apply`]; comments
/// and tracked changes move with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringFileData {
	content: String,
	#[serde(default, skip_serializing_if = "CommentList::is_empty")]
	comments: CommentList,
	#[serde(default, skip_serializing_if = "TrackedChangeList::is_empty")]
	tracked_changes: TrackedChangeList,
}

/// Annotations stored apart from the text, keyed by a ranges hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangesData {
	#[serde(default)]
	pub comments: CommentList,
	#[serde(default)]
	pub tracked_changes: TrackedChangeList,
}

impl RangesData {
	pub fn is_empty(&self) -> bool {
		self.comments.is_empty() && self.tracked_changes.is_empty()
	}
}

impl StringFileData {
	/// A document with no annotations.
	pub fn new(content: impl Into<String>) -> Self {
		Self {
			content: content.into(),
			..Self::default()
		}
	}

	pub fn with_annotations(content: impl Into<String>, comments: CommentList, tracked_changes: TrackedChangeList) -> Self {
		Self {
			content: content.into(),
			comments,
			tracked_changes,
		}
	}

	/// Rebuilds a document from separately stored text and annotations.
	pub fn from_parts(content: impl Into<String>, ranges: RangesData) -> Self {
		Self::with_annotations(content, ranges.comments, ranges.tracked_changes)
	}

	pub fn content(&self) -> &str {
		&self.content
	}

	/// The text with every tracked deletion filtered out.
	pub fn content_without_tracked_deletes(&self) -> String {
		let mut deleted = self
			.tracked_changes
			.iter()
			.filter(|c| c.tracking.kind == TrackingType::Delete)
			.map(|c| c.range)
			.peekable();

		let mut out = String::with_capacity(self.content.len());
		for (idx, ch) in self.content.chars().enumerate() {
			while deleted.next_if(|r| r.end() <= idx).is_some() {}
			if deleted.peek().is_some_and(|r| r.start() <= idx) {
				continue;
			}
			out.push(ch);
		}
		out
	}

	/// Length in characters.
	pub fn string_length(&self) -> CharLen {
		self.content.chars().count()
	}

	pub fn comments(&self) -> &CommentList {
		&self.comments
	}

	pub fn comments_mut(&mut self) -> &mut CommentList {
		&mut self.comments
	}

	pub fn tracked_changes(&self) -> &TrackedChangeList {
		&self.tracked_changes
	}

	/// Annotations for persisting next to the text.
	pub fn ranges(&self) -> RangesData {
		RangesData {
			comments: self.comments.clone(),
			tracked_changes: self.tracked_changes.clone(),
		}
	}

	pub(crate) fn replace(&mut self, content: String, comments: CommentList, tracked_changes: TrackedChangeList) {
		self.content = content;
		self.comments = comments;
		self.tracked_changes = tracked_changes;
	}
}
