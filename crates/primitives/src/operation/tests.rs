use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{Value, json};

use super::*;
use crate::comment::{Comment, CommentList};
use crate::error::OtError;
use crate::file_data::StringFileData;
use crate::range::Range;
use crate::tracked_change::{TrackedChange, TrackedChangeList};
use crate::tracking::{Tracking, TrackingProps, TrackingType};

fn ts(year: i32) -> DateTime<Utc> {
	Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap()
}

fn props(kind: TrackingType, user: &str, year: i32) -> TrackingProps {
	TrackingProps::new(kind, user, ts(year))
}

fn tracked(kind: TrackingType, user: &str, year: i32) -> Option<Tracking> {
	Some(Tracking::Props(props(kind, user, year)))
}

fn comments(entries: &[(&str, &[(usize, usize)])]) -> CommentList {
	entries
		.iter()
		.map(|(id, ranges)| Comment::new(*id, ranges.iter().map(|(p, l)| Range::new(*p, *l)), false).unwrap())
		.collect()
}

fn changes(entries: &[(usize, usize, TrackingProps)]) -> TrackedChangeList {
	TrackedChangeList::new(
		entries
			.iter()
			.map(|(pos, len, t)| TrackedChange::new(Range::new(*pos, *len), t.clone())),
	)
}

fn raw(file: &StringFileData) -> Value {
	serde_json::to_value(file).unwrap()
}

fn expect_inverse_restores(file: StringFileData, op: TextOperation) {
	let before = raw(&file);
	let inverse = op.invert(&file).unwrap();
	assert_eq!(inverse.base_length(), op.target_length());
	assert_eq!(inverse.target_length(), op.base_length());

	let mut file = file;
	op.apply(&mut file).unwrap();
	inverse.apply(&mut file).unwrap();
	assert_eq!(raw(&file), before);
}

/// Applies `a` then `b` and their composition, checks both agree, and
/// returns the result.
fn compose_and_apply(file: StringFileData, a: &TextOperation, b: &TextOperation) -> Value {
	let mut sequential = file.clone();
	a.apply(&mut sequential).unwrap();
	b.apply(&mut sequential).unwrap();

	let mut composed = file;
	a.compose(b).unwrap().apply(&mut composed).unwrap();

	assert_eq!(raw(&composed), raw(&sequential));
	raw(&sequential)
}

/// Applies both transform orders, checks they converge, and returns the
/// result.
fn transform_and_apply(file: StringFileData, a: &TextOperation, b: &TextOperation) -> Value {
	let (a_prime, b_prime) = TextOperation::transform(a, b).unwrap();

	let mut via_a = file.clone();
	a.apply(&mut via_a).unwrap();
	b_prime.apply(&mut via_a).unwrap();

	let mut via_b = file;
	b.apply(&mut via_b).unwrap();
	a_prime.apply(&mut via_b).unwrap();

	assert_eq!(raw(&via_a), raw(&via_b));
	raw(&via_a)
}

#[test]
fn tracks_base_and_target_lengths() {
	let op = TextOperation::new();
	assert_eq!((op.base_length(), op.target_length()), (0, 0));
	let op = op.retain(5);
	assert_eq!((op.base_length(), op.target_length()), (5, 5));
	let op = op.insert("abc").unwrap();
	assert_eq!((op.base_length(), op.target_length()), (5, 8));
	let op = op.retain(2);
	assert_eq!((op.base_length(), op.target_length()), (7, 10));
	let op = op.remove(2);
	assert_eq!((op.base_length(), op.target_length()), (9, 10));
}

#[test]
fn drops_empty_steps_and_merges_neighbours() {
	let op = TextOperation::new()
		.retain(5)
		.retain(0)
		.insert("lorem")
		.unwrap()
		.insert("")
		.unwrap()
		.remove(3)
		.remove(3)
		.remove(0);
	assert_eq!(op.ops().len(), 3);
	assert_eq!(op.ops()[2], ScanOp::Remove(6));
	assert!(TextOperation::new().retain(0).remove(0).ops().is_empty());
}

#[test]
fn insert_is_placed_before_remove() {
	let a = TextOperation::new().remove(1).insert("lo").unwrap().retain(2).retain(3);
	let b = TextOperation::new()
		.remove(1)
		.insert("l")
		.unwrap()
		.insert("o")
		.unwrap()
		.retain(5);
	assert_eq!(a, b);
	assert!(matches!(a.ops()[0], ScanOp::Insert(_)));
	assert_ne!(a.clone().remove(1), b.retain(1));
}

#[test]
fn inserts_with_different_metadata_stay_apart() {
	let op = TextOperation::new()
		.insert_with("a", None, ["c1"])
		.unwrap()
		.insert_with("b", None, ["c2"])
		.unwrap()
		.insert_with("c", Some(props(TrackingType::Insert, "u1", 2024)), ["c2"])
		.unwrap();
	assert_eq!(op.ops().len(), 3);

	let same = TextOperation::new()
		.insert_with("a", None, ["c1", "c2"])
		.unwrap()
		.insert_with("b", None, ["c2", "c1"])
		.unwrap();
	assert_eq!(same.ops().len(), 1);
}

#[test]
fn detects_noops() {
	assert!(TextOperation::new().is_noop());
	assert!(TextOperation::new().retain(5).retain(3).is_noop());
	assert!(!TextOperation::new().retain(5).insert("lorem").unwrap().is_noop());
	assert!(
		!TextOperation::new()
			.retain_with(3, Some(Tracking::Clear))
			.is_noop()
	);
}

#[test]
fn displays_steps() {
	let op = TextOperation::new()
		.retain(2)
		.insert("lorem")
		.unwrap()
		.remove(5)
		.retain(5);
	assert_eq!(op.to_string(), "retain 2, insert 'lorem', remove 5, retain 5");
}

#[test]
fn parses_wire_form() {
	let op = TextOperation::from_json(&json!({ "textOperation": [2, -1, -1, "cde"] })).unwrap();
	assert_eq!(op.ops().len(), 3);
	assert_eq!((op.base_length(), op.target_length()), (4, 5));
	assert_eq!(op.to_json(), json!([2, "cde", -2]));

	let bare = TextOperation::from_json(&json!([2, -1, -1, "cde"])).unwrap();
	assert_eq!(bare, op);

	assert!(TextOperation::from_json(&json!([2, -1, -1, "cde", { "insert": "x" }])).is_err());
	assert!(TextOperation::from_json(&json!([2, -1, -1, "cde", null])).is_err());
	assert!(matches!(
		TextOperation::from_json(&json!([0])),
		Err(OtError::UnknownOperation(_))
	));
}

#[test]
fn wire_form_carries_metadata() {
	let op = TextOperation::new()
		.retain_with(3, Some(Tracking::Clear))
		.retain_with(2, tracked(TrackingType::Delete, "user1", 2023))
		.insert_with("x", Some(props(TrackingType::Insert, "user1", 2024)), ["c1"])
		.unwrap();
	let value = op.to_json();
	assert_eq!(
		value,
		json!([
			{ "r": 3, "tracking": { "type": "none" } },
			{ "r": 2, "tracking": { "type": "delete", "userId": "user1", "ts": "2023-01-01T00:00:00.000Z" } },
			{ "i": "x", "tracking": { "type": "insert", "userId": "user1", "ts": "2024-01-01T00:00:00.000Z" }, "commentIds": ["c1"] },
		])
	);
	assert_eq!(TextOperation::from_json(&value).unwrap(), op);

	let via_serde: TextOperation = serde_json::from_value(value).unwrap();
	assert_eq!(via_serde, op);
	assert_eq!(serde_json::to_value(&op).unwrap(), op.to_json());
}

#[test]
fn rejects_retain_past_end() {
	let op = TextOperation::new().retain(1);
	let mut empty = StringFileData::new("");
	assert!(matches!(op.apply(&mut empty), Err(OtError::Apply(_))));
	let mut space = StringFileData::new(" ");
	op.apply(&mut space).unwrap();
	assert_eq!(space.content(), " ");
}

#[test]
fn rejects_non_bmp_text() {
	let err = TextOperation::new().insert("𝌆\n").unwrap_err();
	assert!(matches!(err, OtError::InvalidInsertion));
	assert!(err.to_string().contains("inserted text contains non BMP characters"));

	let mut file = StringFileData::new("𝌆\n");
	let err = TextOperation::new().apply(&mut file).unwrap_err();
	assert!(err.to_string().contains("string contains non BMP characters"));
	assert!(err.is_unprocessable());

	let err = TextOperation::from_json(&json!({ "textOperation": ["𝌆\n"] })).unwrap_err();
	assert!(matches!(err, OtError::InvalidInsertion));
}

#[test]
fn failed_apply_leaves_document_untouched() {
	let mut file = StringFileData::with_annotations("foo bar", comments(&[("c1", &[(0, 3)])]), TrackedChangeList::default());
	let before = file.clone();
	let op = TextOperation::new().remove(3).insert("x").unwrap().retain(5);
	assert!(op.apply(&mut file).is_err());
	assert_eq!(file, before);
}

#[test]
fn enforces_length_limit() {
	let op = TextOperation::new().retain(3).insert("abcd").unwrap();
	let mut file = StringFileData::new("foo");
	assert!(matches!(
		op.apply_with_limit(&mut file, 5),
		Err(OtError::TooLong { length: 7 })
	));
	assert_eq!(file.content(), "foo");
	assert!(matches!(
		op.apply_to_length_with_limit(3, 5),
		Err(OtError::TooLong { length: 7 })
	));
	assert_eq!(op.apply_to_length(3).unwrap(), 7);
}

#[test]
fn applies_to_length() {
	let op = TextOperation::new().retain(2).insert("abc").unwrap().remove(2).retain(1);
	assert_eq!(op.apply_to_length(5).unwrap(), 6);
	assert!(matches!(op.apply_to_length(4), Err(OtError::Apply(_))));
	assert!(matches!(op.apply_to_length(6), Err(OtError::Apply(_))));
	assert_eq!(TextOperation::new().apply_to_length(0).unwrap(), 0);
}

#[test]
fn undo_grouping() {
	let typed_a = TextOperation::new().retain(3).insert("a").unwrap().retain(2);
	let typed_b = TextOperation::new().retain(4).insert("b").unwrap().retain(2);
	assert!(typed_a.can_be_composed_with_for_undo(&typed_b));

	let elsewhere = TextOperation::new().insert("b").unwrap().retain(6);
	assert!(!typed_a.can_be_composed_with_for_undo(&elsewhere));

	let back_1 = TextOperation::new().retain(4).remove(1).retain(2);
	let back_2 = TextOperation::new().retain(3).remove(1).retain(2);
	assert!(back_1.can_be_composed_with_for_undo(&back_2));
	assert!(!back_2.can_be_composed_with_for_undo(&back_1));

	let forward_1 = TextOperation::new().retain(3).remove(1).retain(5);
	let forward_2 = TextOperation::new().retain(3).remove(1).retain(4);
	assert!(forward_1.can_be_composed_with_for_undo(&forward_2));
	let gap = TextOperation::new().retain(5).remove(1).retain(2);
	assert!(!forward_1.can_be_composed_with_for_undo(&gap));

	assert!(typed_a.can_be_composed_with_for_undo(&TextOperation::new().retain(6)));
	let complex = TextOperation::new().insert("x").unwrap().retain(1).insert("y").unwrap();
	assert!(!complex.can_be_composed_with_for_undo(&typed_a));
	assert!(!typed_a.can_be_composed_with_for_undo(&back_2));
}

#[test]
fn moves_comment_ranges() {
	let mut comment = Comment::new("c1", [Range::new(4, 3)], false).unwrap();
	let op = TextOperation::new()
		.remove(2)
		.retain(3)
		.insert_with("xx", None, ["c1"])
		.unwrap()
		.retain(6);
	op.apply_to_comment(&mut comment);
	assert_eq!(comment.ranges(), &[Range::new(2, 5)]);

	let mut other = Comment::new("c2", [Range::new(4, 3)], false).unwrap();
	op.apply_to_comment(&mut other);
	assert_eq!(other.ranges(), &[Range::new(2, 1), Range::new(5, 2)]);
}

#[test]
fn applies_across_comments_and_tracked_changes() {
	let mut file = StringFileData::with_annotations(
		"foo bar baz",
		comments(&[("c1", &[(4, 3)])]),
		changes(&[(0, 3, props(TrackingType::Insert, "user1", 2023))]),
	);
	TextOperation::new()
		.retain(3)
		.insert_with(" big", Some(props(TrackingType::Insert, "user1", 2024)), Vec::<String>::new())
		.unwrap()
		.retain(2)
		.remove(2)
		.retain(4)
		.apply(&mut file)
		.unwrap();

	assert_eq!(file.content(), "foo big b baz");
	assert_eq!(
		raw(&file),
		json!({
			"content": "foo big b baz",
			"comments": [{ "id": "c1", "ranges": [{ "pos": 8, "length": 1 }] }],
			"trackedChanges": [
				{
					"range": { "pos": 0, "length": 3 },
					"tracking": { "type": "insert", "userId": "user1", "ts": "2023-01-01T00:00:00.000Z" },
				},
				{
					"range": { "pos": 3, "length": 4 },
					"tracking": { "type": "insert", "userId": "user1", "ts": "2024-01-01T00:00:00.000Z" },
				},
			],
		})
	);
}

#[test]
fn invert_reinserts_removed_range_and_comment() {
	expect_inverse_restores(
		StringFileData::with_annotations(
			"foo bar baz",
			comments(&[("comment1", &[(4, 3)])]),
			changes(&[(4, 3, props(TrackingType::Insert, "user1", 2024))]),
		),
		TextOperation::new().retain(4).remove(4).retain(3),
	);
}

#[test]
fn invert_deletes_inserted_range_and_comment() {
	expect_inverse_restores(
		StringFileData::with_annotations("foo baz", comments(&[("comment1", &[])]), TrackedChangeList::default()),
		TextOperation::new()
			.retain(4)
			.insert_with("bar", Some(props(TrackingType::Insert, "user1", 2024)), ["comment1"])
			.unwrap()
			.insert(" ")
			.unwrap()
			.retain(3),
	);
}

#[test]
fn invert_removes_tracked_delete() {
	expect_inverse_restores(
		StringFileData::new("foo bar baz"),
		TextOperation::new()
			.retain(4)
			.retain_with(4, tracked(TrackingType::Delete, "user1", 2023))
			.retain(3),
	);
}

#[test]
fn invert_restores_removed_comments() {
	expect_inverse_restores(
		StringFileData::with_annotations("foo bar baz", comments(&[("comment1", &[(4, 3)])]), TrackedChangeList::default()),
		TextOperation::new().retain(4).remove(4).retain(3),
	);
	expect_inverse_restores(
		StringFileData::with_annotations("foo bar baz", comments(&[("comment1", &[(0, 11)])]), TrackedChangeList::default()),
		TextOperation::new().retain(4).remove(4).retain(3),
	);
}

#[test]
fn invert_restores_partially_removed_tracked_change() {
	expect_inverse_restores(
		StringFileData::with_annotations(
			"foo bar baz",
			CommentList::new(),
			changes(&[(0, 11, props(TrackingType::Delete, "user1", 2023))]),
		),
		TextOperation::new().retain(4).remove(4).retain(3),
	);
}

#[test]
fn invert_of_tracked_delete_restores_tracked_changes() {
	expect_inverse_restores(
		StringFileData::with_annotations(
			"the quick brown fox jumps over the lazy dog",
			CommentList::new(),
			changes(&[
				(5, 5, props(TrackingType::Insert, "user1", 2023)),
				(12, 3, props(TrackingType::Delete, "user1", 2023)),
				(18, 5, props(TrackingType::Insert, "user1", 2023)),
			]),
		),
		TextOperation::new()
			.retain(7)
			.retain_with(13, tracked(TrackingType::Delete, "user1", 2025))
			.retain(23),
	);
}

#[test]
fn invert_restores_timestamp_next_to_later_insert() {
	expect_inverse_restores(
		StringFileData::with_annotations(
			"abcdef",
			CommentList::new(),
			changes(&[(0, 3, props(TrackingType::Insert, "user1", 2023))]),
		),
		TextOperation::new()
			.retain(3)
			.insert_with("x", Some(props(TrackingType::Insert, "user1", 2024)), Vec::<String>::new())
			.unwrap()
			.retain(3),
	);
}

#[test]
fn invert_restores_timestamp_next_to_later_tracked_retain() {
	expect_inverse_restores(
		StringFileData::with_annotations(
			"abcdef",
			CommentList::new(),
			changes(&[(0, 3, props(TrackingType::Delete, "user1", 2023))]),
		),
		TextOperation::new()
			.retain(3)
			.retain_with(2, tracked(TrackingType::Delete, "user1", 2024))
			.retain(1),
	);
}

#[test]
fn invert_restores_changes_joined_by_remove() {
	expect_inverse_restores(
		StringFileData::with_annotations(
			"abcdef",
			CommentList::new(),
			changes(&[
				(0, 2, props(TrackingType::Insert, "user1", 2023)),
				(4, 2, props(TrackingType::Insert, "user1", 2024)),
			]),
		),
		TextOperation::new().retain(2).remove(2).retain(2),
	);
}

#[test]
fn invert_requires_matching_document() {
	let op = TextOperation::new().retain(3);
	assert!(matches!(op.invert(&StringFileData::new("ab")), Err(OtError::Apply(_))));
}

#[test]
fn compose_requires_matching_lengths() {
	let a = TextOperation::new().retain(3).insert("x").unwrap();
	let b = TextOperation::new().retain(3);
	assert!(!a.can_be_composed_with(&b));
	assert!(matches!(a.compose(&b), Err(OtError::LengthMismatch(_))));
}

#[test]
fn compose_with_comments() {
	let result = compose_and_apply(
		StringFileData::with_annotations("foo baz", comments(&[("comment1", &[])]), TrackedChangeList::default()),
		&TextOperation::new()
			.retain(4)
			.insert_with("bar", Some(props(TrackingType::Insert, "user1", 2024)), ["comment1"])
			.unwrap()
			.insert(" ")
			.unwrap()
			.retain(3),
		&TextOperation::new().retain(4).remove(4).retain(3),
	);
	assert_eq!(
		result,
		json!({ "content": "foo baz", "comments": [{ "id": "comment1", "ranges": [] }] })
	);
}

#[test]
fn compose_prefers_later_tracking() {
	let result = compose_and_apply(
		StringFileData::new("foo bar baz"),
		&TextOperation::new()
			.retain(4)
			.retain_with(4, tracked(TrackingType::Delete, "user1", 2023))
			.retain(3),
		&TextOperation::new()
			.retain(4)
			.retain_with(4, tracked(TrackingType::Delete, "user2", 2024))
			.retain(3),
	);
	assert_eq!(
		result,
		json!({
			"content": "foo bar baz",
			"trackedChanges": [{
				"range": { "pos": 4, "length": 4 },
				"tracking": { "type": "delete", "userId": "user2", "ts": "2024-01-01T00:00:00.000Z" },
			}],
		})
	);
}

#[test]
fn compose_keeps_tracking_not_overridden() {
	let result = compose_and_apply(
		StringFileData::new("foo bar baz"),
		&TextOperation::new()
			.retain(4)
			.retain_with(4, tracked(TrackingType::Delete, "user1", 2023))
			.retain(3),
		&TextOperation::new().retain(11),
	);
	assert_eq!(
		result,
		json!({
			"content": "foo bar baz",
			"trackedChanges": [{
				"range": { "pos": 4, "length": 4 },
				"tracking": { "type": "delete", "userId": "user1", "ts": "2023-01-01T00:00:00.000Z" },
			}],
		})
	);
}

#[test]
fn compose_adds_comment_ranges_from_both() {
	let result = compose_and_apply(
		StringFileData::with_annotations(
			"foo bar baz",
			comments(&[("comment1", &[(4, 3)]), ("comment2", &[(8, 3)])]),
			TrackedChangeList::default(),
		),
		&TextOperation::new()
			.retain(5)
			.insert_with("aa", None, ["comment1"])
			.unwrap()
			.retain(6),
		&TextOperation::new()
			.retain(11)
			.insert_with("bb", None, ["comment2"])
			.unwrap()
			.retain(2),
	);
	assert_eq!(
		result,
		json!({
			"content": "foo baaar bbbaz",
			"comments": [
				{ "id": "comment1", "ranges": [{ "pos": 4, "length": 5 }] },
				{ "id": "comment2", "ranges": [{ "pos": 10, "length": 5 }] },
			],
		})
	);
}

#[test]
fn compose_clear_resolves_tracked_delete() {
	let result = compose_and_apply(
		StringFileData::new("foo bar baz"),
		&TextOperation::new()
			.retain(4)
			.retain_with(4, tracked(TrackingType::Delete, "user1", 2023))
			.retain(3),
		&TextOperation::new()
			.retain(4)
			.retain_with(4, Some(Tracking::Clear))
			.retain(3),
	);
	assert_eq!(result, json!({ "content": "foo bar baz" }));
}

#[test]
fn compose_clear_resolves_part_of_tracked_insert() {
	let result = compose_and_apply(
		StringFileData::new("foo bar baz"),
		&TextOperation::new()
			.retain(4)
			.insert_with("quux ", Some(props(TrackingType::Insert, "user1", 2023)), Vec::<String>::new())
			.unwrap()
			.retain(7),
		&TextOperation::new()
			.retain(6)
			.retain_with(5, Some(Tracking::Clear))
			.retain(5),
	);
	assert_eq!(
		result,
		json!({
			"content": "foo quux bar baz",
			"trackedChanges": [{
				"range": { "pos": 4, "length": 2 },
				"tracking": { "type": "insert", "userId": "user1", "ts": "2023-01-01T00:00:00.000Z" },
			}],
		})
	);
}

#[test]
fn compose_clear_after_tracked_insert_keeps_neighbour_timestamp() {
	let file = StringFileData::with_annotations(
		"abcdef",
		CommentList::new(),
		changes(&[(0, 3, props(TrackingType::Insert, "user1", 2023))]),
	);
	let insert = TextOperation::new()
		.retain(3)
		.insert_with("x", Some(props(TrackingType::Insert, "user1", 2024)), Vec::<String>::new())
		.unwrap()
		.retain(3);
	let expected = json!({
		"content": "abcxdef",
		"trackedChanges": [{
			"range": { "pos": 0, "length": 3 },
			"tracking": { "type": "insert", "userId": "user1", "ts": "2023-01-01T00:00:00.000Z" },
		}],
	});

	let clear = TextOperation::new().retain(3).retain_with(1, Some(Tracking::Clear)).retain(3);
	assert_eq!(compose_and_apply(file.clone(), &insert, &clear), expected);

	let undo = TextOperation::new().retain(3).remove(1).retain(3);
	assert_eq!(compose_and_apply(file.clone(), &insert, &undo), raw(&file));
}

#[test]
fn transform_clear_against_tracked_insert_converges() {
	let result = transform_and_apply(
		StringFileData::with_annotations(
			"abcd",
			CommentList::new(),
			changes(&[(0, 4, props(TrackingType::Insert, "user1", 2024))]),
		),
		&TextOperation::new().retain_with(4, Some(Tracking::Clear)),
		&TextOperation::new()
			.retain(2)
			.insert_with("x", Some(props(TrackingType::Insert, "user1", 2023)), Vec::<String>::new())
			.unwrap()
			.retain(2),
	);
	assert_eq!(
		result,
		json!({
			"content": "abxcd",
			"trackedChanges": [{
				"range": { "pos": 2, "length": 1 },
				"tracking": { "type": "insert", "userId": "user1", "ts": "2023-01-01T00:00:00.000Z" },
			}],
		})
	);
}

#[test]
fn transform_requires_same_base() {
	let a = TextOperation::new().retain(3);
	let b = TextOperation::new().retain(4);
	assert!(matches!(
		TextOperation::transform(&a, &b),
		Err(OtError::LengthMismatch(_))
	));
}

#[test]
fn transform_keeps_tracked_insert_from_first() {
	let result = transform_and_apply(
		StringFileData::new("foo baz"),
		&TextOperation::new()
			.retain(4)
			.insert_with("bar", Some(props(TrackingType::Insert, "user1", 2024)), Vec::<String>::new())
			.unwrap()
			.insert(" ")
			.unwrap()
			.retain(3),
		&TextOperation::new().retain(7).insert(" qux").unwrap(),
	);
	assert_eq!(
		result,
		json!({
			"content": "foo bar baz qux",
			"trackedChanges": [{
				"range": { "pos": 4, "length": 3 },
				"tracking": { "type": "insert", "userId": "user1", "ts": "2024-01-01T00:00:00.000Z" },
			}],
		})
	);
}

#[test]
fn transform_prefers_first_tracking() {
	let result = transform_and_apply(
		StringFileData::new("foo bar baz"),
		&TextOperation::new()
			.retain(4)
			.retain_with(4, tracked(TrackingType::Delete, "user1", 2023))
			.retain(3),
		&TextOperation::new()
			.retain(4)
			.retain_with(4, tracked(TrackingType::Delete, "user2", 2024))
			.retain(3),
	);
	assert_eq!(
		result,
		json!({
			"content": "foo bar baz",
			"trackedChanges": [{
				"range": { "pos": 4, "length": 4 },
				"tracking": { "type": "delete", "userId": "user1", "ts": "2023-01-01T00:00:00.000Z" },
			}],
		})
	);
}

#[test]
fn transform_splits_conflicting_tracking() {
	let result = transform_and_apply(
		StringFileData::new("foo bar baz"),
		&TextOperation::new()
			.retain(4)
			.retain_with(4, tracked(TrackingType::Delete, "user1", 2023))
			.retain(3),
		&TextOperation::new()
			.retain(4)
			.retain_with(5, tracked(TrackingType::Delete, "user2", 2024))
			.retain(2),
	);
	assert_eq!(
		result,
		json!({
			"content": "foo bar baz",
			"trackedChanges": [
				{
					"range": { "pos": 4, "length": 4 },
					"tracking": { "type": "delete", "userId": "user1", "ts": "2023-01-01T00:00:00.000Z" },
				},
				{
					"range": { "pos": 8, "length": 1 },
					"tracking": { "type": "delete", "userId": "user2", "ts": "2024-01-01T00:00:00.000Z" },
				},
			],
		})
	);
}

#[test]
fn transform_orders_concurrent_inserts() {
	let result = transform_and_apply(
		StringFileData::new("aaabbbccc"),
		&TextOperation::new()
			.retain(3)
			.insert_with("xxx", Some(props(TrackingType::Insert, "user1", 2023)), Vec::<String>::new())
			.unwrap()
			.retain(6),
		&TextOperation::new()
			.retain(3)
			.insert_with("yyy", Some(props(TrackingType::Insert, "user2", 2024)), Vec::<String>::new())
			.unwrap()
			.retain(6),
	);
	assert_eq!(
		result,
		json!({
			"content": "aaaxxxyyybbbccc",
			"trackedChanges": [
				{
					"range": { "pos": 3, "length": 3 },
					"tracking": { "type": "insert", "userId": "user1", "ts": "2023-01-01T00:00:00.000Z" },
				},
				{
					"range": { "pos": 6, "length": 3 },
					"tracking": { "type": "insert", "userId": "user2", "ts": "2024-01-01T00:00:00.000Z" },
				},
			],
		})
	);
}

#[test]
fn transform_preserves_fully_removed_comment() {
	let result = transform_and_apply(
		StringFileData::with_annotations("foo bar baz", comments(&[("comment1", &[(4, 3)])]), TrackedChangeList::default()),
		&TextOperation::new().retain(4).remove(4).retain(3),
		&TextOperation::new()
			.retain(7)
			.insert_with("qux ", None, ["comment1"])
			.unwrap()
			.retain(4),
	);
	assert_eq!(
		result,
		json!({
			"content": "foo qux baz",
			"comments": [{ "id": "comment1", "ranges": [{ "pos": 4, "length": 4 }] }],
		})
	);
}

#[test]
fn transform_extends_comment_from_both_sides() {
	let result = transform_and_apply(
		StringFileData::with_annotations("foo bar baz", comments(&[("comment1", &[(4, 3)])]), TrackedChangeList::default()),
		&TextOperation::new()
			.retain(4)
			.insert_with("qux ", None, ["comment1"])
			.unwrap()
			.retain(7),
		&TextOperation::new()
			.retain(4)
			.insert_with("corge ", None, ["comment1"])
			.unwrap()
			.retain(7),
	);
	assert_eq!(
		result,
		json!({
			"content": "foo qux corge bar baz",
			"comments": [{ "id": "comment1", "ranges": [{ "pos": 4, "length": 13 }] }],
		})
	);
}

#[test]
fn transform_tracks_inserts_at_different_places() {
	let result = transform_and_apply(
		StringFileData::new("foo bar baz"),
		&TextOperation::new()
			.retain(4)
			.insert_with("qux ", Some(props(TrackingType::Insert, "user1", 2023)), Vec::<String>::new())
			.unwrap()
			.retain(7),
		&TextOperation::new()
			.retain(8)
			.insert_with("corge ", Some(props(TrackingType::Insert, "user2", 2024)), Vec::<String>::new())
			.unwrap()
			.retain(3),
	);
	assert_eq!(
		result,
		json!({
			"content": "foo qux bar corge baz",
			"trackedChanges": [
				{
					"range": { "pos": 4, "length": 4 },
					"tracking": { "type": "insert", "userId": "user1", "ts": "2023-01-01T00:00:00.000Z" },
				},
				{
					"range": { "pos": 12, "length": 6 },
					"tracking": { "type": "insert", "userId": "user2", "ts": "2024-01-01T00:00:00.000Z" },
				},
			],
		})
	);
}

const USERS: [&str; 2] = ["user1", "user2"];
const COMMENT_IDS: [&str; 3] = ["c0", "c1", "c2"];

/// Attribution from independent picks of actor, kind and year, so the same
/// actor shows up with different timestamps.
fn picked_props(pick: u8, year: u8) -> TrackingProps {
	let kind = if pick % 2 == 0 {
		TrackingType::Insert
	} else {
		TrackingType::Delete
	};
	let user = USERS[usize::from(pick / 2) % USERS.len()];
	props(kind, user, 2020 + i32::from(year % 4))
}

#[derive(Debug, Clone)]
enum Step {
	Retain(usize, u8, u8),
	Insert(String, u8, u8, Vec<u8>),
	Remove(usize),
}

fn arb_step() -> impl Strategy<Value = Step> {
	prop_oneof![
		(1..6usize, 0..7u8, 0..4u8).prop_map(|(n, t, y)| Step::Retain(n, t, y)),
		("[a-z]{1,4}", 0..5u8, 0..4u8, prop::collection::vec(0..3u8, 0..2))
			.prop_map(|(s, t, y, ids)| Step::Insert(s, t, y, ids)),
		(1..6usize).prop_map(Step::Remove),
	]
}

/// Folds steps into an operation over a document of `len` characters.
fn build_op(len: usize, steps: &[Step]) -> TextOperation {
	let mut op = TextOperation::new();
	let mut remaining = len;
	for step in steps {
		op = match step {
			Step::Retain(n, pick, year) => {
				let n = (*n).min(remaining);
				remaining -= n;
				let tracking = match pick {
					0..=2 => None,
					3 => Some(Tracking::Clear),
					p => Some(Tracking::Props(picked_props(*p, *year))),
				};
				op.retain_with(n, tracking)
			}
			Step::Insert(text, pick, year, ids) => {
				let tracking = (*pick > 1).then(|| picked_props(*pick, *year));
				let ids: Vec<&str> = ids.iter().map(|i| COMMENT_IDS[usize::from(*i)]).collect();
				op.insert_with(text.as_str(), tracking, ids).unwrap()
			}
			Step::Remove(n) => {
				let n = (*n).min(remaining);
				remaining -= n;
				op.remove(n)
			}
		};
	}
	op.retain(remaining)
}

fn arb_file() -> impl Strategy<Value = StringFileData> {
	"[a-z ]{0,16}"
		.prop_flat_map(|content| {
			let len = content.chars().count();
			(
				Just(content),
				prop::collection::vec((0..=len, 0..=len), 0..3),
				prop::collection::vec((0..=len, 0..=len, 0..4u8, 0..4u8), 0..3),
			)
		})
		.prop_map(|(content, comment_spans, tracked_spans)| {
			let comments: CommentList = comment_spans
				.into_iter()
				.enumerate()
				.map(|(i, (a, b))| {
					let (lo, hi) = (a.min(b), a.max(b));
					Comment::new(COMMENT_IDS[i], [Range::new(lo, hi - lo)], false).unwrap()
				})
				.collect();
			let mut tracked = TrackedChangeList::default();
			for (a, b, pick, year) in tracked_spans {
				let (lo, hi) = (a.min(b), a.max(b));
				tracked.apply_retain(lo, hi - lo, Some(&Tracking::Props(picked_props(pick, year))));
			}
			StringFileData::with_annotations(content, comments, tracked)
		})
}

fn arb_file_and_op() -> impl Strategy<Value = (StringFileData, TextOperation)> {
	(arb_file(), prop::collection::vec(arb_step(), 0..6)).prop_map(|(file, steps)| {
		let op = build_op(file.string_length(), &steps);
		(file, op)
	})
}

fn arb_file_and_concurrent_ops() -> impl Strategy<Value = (StringFileData, TextOperation, TextOperation)> {
	(
		arb_file(),
		prop::collection::vec(arb_step(), 0..6),
		prop::collection::vec(arb_step(), 0..6),
	)
		.prop_map(|(file, a, b)| {
			let len = file.string_length();
			(file, build_op(len, &a), build_op(len, &b))
		})
}

fn arb_file_and_sequential_ops() -> impl Strategy<Value = (StringFileData, TextOperation, Vec<Step>)> {
	(
		arb_file_and_op(),
		prop::collection::vec(arb_step(), 0..6),
	)
		.prop_map(|((file, a), b)| (file, a, b))
}

proptest! {
	#[test]
	fn prop_apply_reaches_target_length((file, op) in arb_file_and_op()) {
		let mut file = file;
		op.apply(&mut file).unwrap();
		prop_assert_eq!(file.string_length(), op.target_length());
		prop_assert_eq!(op.apply_to_length(op.base_length()).unwrap(), op.target_length());
	}

	#[test]
	fn prop_wire_form_is_lossless((_file, op) in arb_file_and_op()) {
		prop_assert_eq!(TextOperation::from_json(&op.to_json()).unwrap(), op);
	}

	#[test]
	fn prop_invert_restores((file, op) in arb_file_and_op()) {
		let inverse = op.invert(&file).unwrap();
		prop_assert_eq!(inverse.base_length(), op.target_length());
		prop_assert_eq!(inverse.target_length(), op.base_length());

		let mut edited = file.clone();
		op.apply(&mut edited).unwrap();
		inverse.apply(&mut edited).unwrap();
		prop_assert_eq!(edited, file);
	}

	#[test]
	fn prop_compose_matches_sequential((file, a, b_steps) in arb_file_and_sequential_ops()) {
		let mut sequential = file.clone();
		a.apply(&mut sequential).unwrap();
		let b = build_op(sequential.string_length(), &b_steps);
		b.apply(&mut sequential).unwrap();

		let ab = a.compose(&b).unwrap();
		prop_assert_eq!(ab.base_length(), a.base_length());
		prop_assert_eq!(ab.target_length(), b.target_length());

		let mut composed = file;
		ab.apply(&mut composed).unwrap();
		prop_assert_eq!(composed, sequential);
	}

	#[test]
	fn prop_transform_converges((file, a, b) in arb_file_and_concurrent_ops()) {
		let (a_prime, b_prime) = TextOperation::transform(&a, &b).unwrap();
		let ab = a.compose(&b_prime).unwrap();
		let ba = b.compose(&a_prime).unwrap();

		let mut via_a = file.clone();
		ab.apply(&mut via_a).unwrap();
		let mut via_b = file;
		ba.apply(&mut via_b).unwrap();
		prop_assert_eq!(via_a, via_b);
	}
}
