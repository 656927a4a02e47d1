//! Pairwise transformation of concurrent edit operations.

use scribe_primitives::{Comment, TextOperation};
use tracing::trace;

use super::EditOperation;
use crate::Result;

/// Transforms two edits made concurrently against the same document.
///
/// Returns `(a', b')` such that applying `a` then `b'` leaves the document in
/// the same state as applying `b` then `a'`.
pub fn transform(a: &EditOperation, b: &EditOperation) -> Result<(EditOperation, EditOperation)> {
	use EditOperation::{AddComment, DeleteComment, NoOp, SetCommentState, Text};

	let pair = match (a, b) {
		(NoOp, _) | (_, NoOp) => (a.clone(), b.clone()),
		(Text(x), Text(y)) => {
			let (x, y) = TextOperation::transform(x, y)?;
			(Text(x), Text(y))
		}
		(Text(text), AddComment(comment)) => (a.clone(), AddComment(shifted(comment, text))),
		(AddComment(_), Text(_)) => swapped(a, b)?,
		(Text(_), _) | (_, Text(_)) => (a.clone(), b.clone()),
		_ if a.comment_id() != b.comment_id() => (a.clone(), b.clone()),
		(AddComment(_), AddComment(_)) => (NoOp, b.clone()),
		(AddComment(_), DeleteComment { .. }) => (NoOp, b.clone()),
		(DeleteComment { .. }, AddComment(_)) => (a.clone(), NoOp),
		(AddComment(comment), SetCommentState { resolved, .. }) => (AddComment(with_state(comment, *resolved)), b.clone()),
		(SetCommentState { .. }, AddComment(_)) => swapped(a, b)?,
		(DeleteComment { .. }, DeleteComment { .. }) => (NoOp, NoOp),
		(DeleteComment { .. }, SetCommentState { .. }) => (a.clone(), NoOp),
		(SetCommentState { .. }, DeleteComment { .. }) => (NoOp, b.clone()),
		(SetCommentState { resolved: ra, .. }, SetCommentState { resolved: rb, .. }) => {
			if ra == rb || !ra {
				(a.clone(), NoOp)
			} else {
				(NoOp, b.clone())
			}
		}
	};

	trace!(a = ?a.comment_id(), b = ?b.comment_id(), "transformed edit operations");
	Ok(pair)
}

/// Transforms with the operands exchanged, then exchanges the results back.
fn swapped(a: &EditOperation, b: &EditOperation) -> Result<(EditOperation, EditOperation)> {
	let (b_prime, a_prime) = transform(b, a)?;
	Ok((a_prime, b_prime))
}

/// The comment's ranges as they stand after `text` is applied.
fn shifted(comment: &Comment, text: &TextOperation) -> Comment {
	let mut comment = comment.clone();
	text.apply_to_comment(&mut comment);
	comment
}

fn with_state(comment: &Comment, resolved: bool) -> Comment {
	let mut comment = comment.clone();
	comment.set_resolved(resolved);
	comment
}
