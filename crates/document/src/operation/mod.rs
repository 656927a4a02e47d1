//! Document-level edits: text operations plus comment bookkeeping.

mod document_edit;
mod transform;

pub use document_edit::DocumentEdit;
use scribe_primitives::{CharLen, Comment, MAX_STRING_LENGTH, OtError, Range, StringFileData, TextOperation};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value, json};
use tracing::trace;
pub use transform::transform;

use crate::{DocumentError, Result};

/// One edit to a single document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOperation {
	/// Retain/insert/remove over the text.
	Text(TextOperation),
	/// Creates a comment, or replaces one with the same id.
	AddComment(Comment),
	/// Removes a comment. Absent ids are ignored.
	DeleteComment {
		comment_id: String,
	},
	/// Resolves or reopens a comment. Absent ids are ignored.
	SetCommentState {
		comment_id: String,
		resolved: bool,
	},
	NoOp,
}

impl EditOperation {
	/// Builds an add-comment edit, normalizing its ranges.
	pub fn add_comment(
		comment_id: impl Into<String>,
		ranges: impl IntoIterator<Item = Range>,
		resolved: bool,
	) -> Result<Self> {
		Ok(Self::AddComment(Comment::new(comment_id, ranges, resolved)?))
	}

	pub fn delete_comment(comment_id: impl Into<String>) -> Self {
		Self::DeleteComment {
			comment_id: comment_id.into(),
		}
	}

	pub fn set_comment_state(comment_id: impl Into<String>, resolved: bool) -> Self {
		Self::SetCommentState {
			comment_id: comment_id.into(),
			resolved,
		}
	}

	/// The comment this edit targets, if it is a comment edit.
	pub fn comment_id(&self) -> Option<&str> {
		match self {
			Self::AddComment(comment) => Some(comment.id()),
			Self::DeleteComment { comment_id } | Self::SetCommentState { comment_id, .. } => Some(comment_id),
			Self::Text(_) | Self::NoOp => None,
		}
	}

	pub fn is_noop(&self) -> bool {
		match self {
			Self::NoOp => true,
			Self::Text(op) => op.is_noop(),
			_ => false,
		}
	}

	/// Applies the edit to an eager document.
	pub fn apply(&self, file: &mut StringFileData) -> Result<()> {
		self.apply_with_limit(file, MAX_STRING_LENGTH)
	}

	/// [`EditOperation::apply`] with a caller-chosen length limit.
	pub fn apply_with_limit(&self, file: &mut StringFileData, max_length: CharLen) -> Result<()> {
		match self {
			Self::Text(op) => op.apply_with_limit(file, max_length)?,
			Self::AddComment(comment) => file.comments_mut().add(comment.clone()),
			Self::DeleteComment { comment_id } => {
				if file.comments_mut().delete(comment_id).is_none() {
					trace!(comment_id = %comment_id, "delete of absent comment ignored");
				}
			}
			Self::SetCommentState { comment_id, resolved } => {
				if !file.comments_mut().set_resolved(comment_id, *resolved) {
					trace!(comment_id = %comment_id, "state change of absent comment ignored");
				}
			}
			Self::NoOp => {}
		}
		Ok(())
	}

	/// Length of a document of `length` characters after this edit.
	pub fn apply_to_length(&self, length: CharLen) -> Result<CharLen> {
		self.apply_to_length_with_limit(length, MAX_STRING_LENGTH)
	}

	/// [`EditOperation::apply_to_length`] with a caller-chosen length limit.
	pub fn apply_to_length_with_limit(&self, length: CharLen, max_length: CharLen) -> Result<CharLen> {
		match self {
			Self::Text(op) => Ok(op.apply_to_length_with_limit(length, max_length)?),
			_ => Ok(length),
		}
	}

	/// Builds the edit that undoes this one, given the document before it.
	pub fn invert(&self, previous: &StringFileData) -> Result<EditOperation> {
		let inverse = match self {
			Self::Text(op) => Self::Text(op.invert(previous)?),
			Self::AddComment(comment) => match previous.comments().get(comment.id()) {
				Some(before) => Self::AddComment(before.clone()),
				None => Self::delete_comment(comment.id()),
			},
			Self::DeleteComment { comment_id } => match previous.comments().get(comment_id) {
				Some(before) => Self::AddComment(before.clone()),
				None => Self::NoOp,
			},
			Self::SetCommentState { comment_id, .. } => match previous.comments().get(comment_id) {
				Some(before) => Self::set_comment_state(comment_id.clone(), before.resolved()),
				None => Self::NoOp,
			},
			Self::NoOp => Self::NoOp,
		};
		Ok(inverse)
	}

	/// True if `other`, applied after this edit, can be folded into one edit.
	pub fn can_be_composed_with(&self, other: &EditOperation) -> bool {
		self.composed(other).is_some()
	}

	/// Folds `other`, applied after this edit, into a single edit.
	pub fn compose(&self, other: &EditOperation) -> Result<EditOperation> {
		match self.composed(other) {
			Some(result) => result,
			None => Err(DocumentError::CannotCompose),
		}
	}

	fn composed(&self, other: &EditOperation) -> Option<Result<EditOperation>> {
		match (self, other) {
			(Self::NoOp, _) => Some(Ok(other.clone())),
			(_, Self::NoOp) => Some(Ok(self.clone())),
			(Self::Text(a), Self::Text(b)) => a
				.can_be_composed_with(b)
				.then(|| a.compose(b).map(Self::Text).map_err(Into::into)),
			(Self::Text(_), _) | (_, Self::Text(_)) => None,
			_ if self.comment_id() != other.comment_id() => None,
			(Self::AddComment(comment), Self::SetCommentState { resolved, .. }) => {
				let mut comment = comment.clone();
				comment.set_resolved(*resolved);
				Some(Ok(Self::AddComment(comment)))
			}
			(Self::DeleteComment { .. }, Self::SetCommentState { .. }) => Some(Ok(self.clone())),
			_ => Some(Ok(other.clone())),
		}
	}

	/// Wire form.
	pub fn to_json(&self) -> Value {
		match self {
			Self::Text(op) => json!({ "textOperation": op.to_json() }),
			Self::AddComment(comment) => {
				let mut raw = Map::new();
				raw.insert("commentId".into(), comment.id().into());
				raw.insert("ranges".into(), json!(comment.ranges()));
				if comment.resolved() {
					raw.insert("resolved".into(), true.into());
				}
				Value::Object(raw)
			}
			Self::DeleteComment { comment_id } => json!({ "deleteComment": comment_id }),
			Self::SetCommentState { comment_id, resolved } => {
				json!({ "commentId": comment_id, "resolved": resolved })
			}
			Self::NoOp => json!({ "noOp": true }),
		}
	}

	/// Parses the wire form, dispatching on which keys are present.
	pub fn from_json(value: &Value) -> Result<Self> {
		let Value::Object(raw) = value else {
			return Err(OtError::UnknownOperation(value.to_string()).into());
		};

		if raw.contains_key("textOperation") {
			return Ok(Self::Text(TextOperation::from_json(value)?));
		}
		if let Some(id) = raw.get("deleteComment") {
			return Ok(Self::delete_comment(string_field(id, value)?));
		}
		if raw.get("noOp").is_some_and(|v| v == &Value::Bool(true)) {
			return Ok(Self::NoOp);
		}
		if let Some(id) = raw.get("commentId") {
			let id = string_field(id, value)?;
			let resolved = match raw.get("resolved") {
				None | Some(Value::Null) => None,
				Some(Value::Bool(resolved)) => Some(*resolved),
				Some(_) => return Err(OtError::UnknownOperation(value.to_string()).into()),
			};
			return match raw.get("ranges") {
				Some(ranges) => {
					let ranges: Vec<Range> = serde_json::from_value(ranges.clone())?;
					Self::add_comment(id, ranges, resolved.unwrap_or(false))
				}
				None => match resolved {
					Some(resolved) => Ok(Self::set_comment_state(id, resolved)),
					None => Err(OtError::UnknownOperation(value.to_string()).into()),
				},
			};
		}

		Err(OtError::UnknownOperation(value.to_string()).into())
	}
}

fn string_field(field: &Value, whole: &Value) -> Result<String> {
	field
		.as_str()
		.map(str::to_owned)
		.ok_or_else(|| OtError::UnknownOperation(whole.to_string()).into())
}

impl From<TextOperation> for EditOperation {
	fn from(op: TextOperation) -> Self {
		Self::Text(op)
	}
}

impl Serialize for EditOperation {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		self.to_json().serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for EditOperation {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		let value = Value::deserialize(deserializer)?;
		Self::from_json(&value).map_err(serde::de::Error::custom)
	}
}
