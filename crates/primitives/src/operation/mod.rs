//! Text operations: the retain/insert/remove kernel and its OT algebra.

mod scan_op;
#[cfg(test)]
mod tests;
mod text_operation;

pub use scan_op::{CommentIds, InsertOp, Insertion, LengthState, RetainOp, ScanOp};
pub use text_operation::{MAX_STRING_LENGTH, TextOperation};
