use serde::{Deserialize, Serialize};

use super::{EditOperation, transform};
use crate::{DocumentError, Result};

/// An edit addressed to a named document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEdit {
	/// Identifies the document being edited.
	pub document: String,
	pub operation: EditOperation,
}

impl DocumentEdit {
	pub fn new(document: impl Into<String>, operation: impl Into<EditOperation>) -> Self {
		Self {
			document: document.into(),
			operation: operation.into(),
		}
	}

	/// Edits to different documents never compose.
	pub fn can_be_composed_with(&self, other: &DocumentEdit) -> bool {
		self.document == other.document && self.operation.can_be_composed_with(&other.operation)
	}

	pub fn compose(&self, other: &DocumentEdit) -> Result<DocumentEdit> {
		if self.document != other.document {
			return Err(DocumentError::CannotCompose);
		}
		Ok(Self {
			document: self.document.clone(),
			operation: self.operation.compose(&other.operation)?,
		})
	}

	/// Transforms two concurrent edits. Edits to different documents are
	/// independent and come back unchanged.
	pub fn transform(a: &DocumentEdit, b: &DocumentEdit) -> Result<(DocumentEdit, DocumentEdit)> {
		if a.document != b.document {
			return Ok((a.clone(), b.clone()));
		}
		let (a_op, b_op) = transform(&a.operation, &b.operation)?;
		Ok((
			Self {
				document: a.document.clone(),
				operation: a_op,
			},
			Self {
				document: b.document.clone(),
				operation: b_op,
			},
		))
	}
}
