//! Content-addressed storage for document text and annotations.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::{DocumentError, Result};

/// Reference to a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
	/// Content hash, lowercase hex.
	pub hash: String,
	/// Size of the stored bytes.
	pub byte_length: usize,
	/// Length in characters when the blob holds text.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub string_length: Option<usize>,
}

/// Async content store used to hydrate and persist lazy documents.
#[async_trait]
pub trait BlobStore: Send + Sync {
	/// Loads text stored under `hash`.
	async fn get_string(&self, hash: &str) -> Result<String>;

	/// Loads a JSON value stored under `hash`.
	async fn get_object(&self, hash: &str) -> Result<Value>;

	/// Stores text and returns its reference.
	async fn put_string(&self, content: &str) -> Result<Blob>;

	/// Stores a JSON value and returns its reference.
	async fn put_object(&self, value: &Value) -> Result<Blob>;
}

/// Hex SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
	let mut hasher = Sha256::new();
	hasher.update(bytes);
	format!("{:x}", hasher.finalize())
}

/// In-memory [`BlobStore`].
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
	blobs: RwLock<HashMap<String, String>>,
}

impl MemoryBlobStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of distinct blobs held.
	pub fn len(&self) -> usize {
		self.blobs.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.blobs.read().is_empty()
	}

	fn insert(&self, content: String) -> Blob {
		let hash = content_hash(content.as_bytes());
		let blob = Blob {
			hash: hash.clone(),
			byte_length: content.len(),
			string_length: Some(content.chars().count()),
		};
		trace!(hash = %hash, bytes = blob.byte_length, "stored blob");
		self.blobs.write().entry(hash).or_insert(content);
		blob
	}

	fn lookup(&self, hash: &str) -> Result<String> {
		self.blobs
			.read()
			.get(hash)
			.cloned()
			.ok_or_else(|| DocumentError::BlobNotFound { hash: hash.to_owned() })
	}
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
	async fn get_string(&self, hash: &str) -> Result<String> {
		self.lookup(hash)
	}

	async fn get_object(&self, hash: &str) -> Result<Value> {
		Ok(serde_json::from_str(&self.lookup(hash)?)?)
	}

	async fn put_string(&self, content: &str) -> Result<Blob> {
		Ok(self.insert(content.to_owned()))
	}

	async fn put_object(&self, value: &Value) -> Result<Blob> {
		let mut blob = self.insert(serde_json::to_string(value)?);
		blob.string_length = None;
		Ok(blob)
	}
}
