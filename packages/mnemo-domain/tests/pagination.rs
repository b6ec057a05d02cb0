use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use mnemo_config::BackwardHasMore;
use mnemo_domain::pagination::{
	self, Cursor, CursorKey, Direction, PageError, PageWindow,
};

#[test]
fn both_cursors_are_rejected() {
	let err = PageWindow::new(Some(10), 10, Some(Uuid::new_v4()), Some(Uuid::new_v4()))
		.expect_err("Both cursors must fail.");

	assert_eq!(err, PageError::ConflictingCursors);
	assert!(err.to_string().contains("simultaneously"));
}

#[test]
fn limit_is_clamped() {
	assert_eq!(pagination::clamp_limit(Some(0), 10), 1);
	assert_eq!(pagination::clamp_limit(Some(-5), 10), 1);
	assert_eq!(pagination::clamp_limit(Some(500), 10), 100);
	assert_eq!(pagination::clamp_limit(None, 10), 10);
	assert_eq!(pagination::clamp_limit(Some(42), 10), 42);
}

#[test]
fn cursor_selects_direction() {
	let id = Uuid::new_v4();

	assert_eq!(Cursor::new(None, None).expect("cursor").direction(), Direction::Forward);
	assert_eq!(Cursor::new(Some(id), None).expect("cursor").direction(), Direction::Forward);
	assert_eq!(Cursor::new(None, Some(id)).expect("cursor").direction(), Direction::Backward);
	assert_eq!(Cursor::new(None, Some(id)).expect("cursor").id(), Some(id));
}

#[test]
fn cursor_key_breaks_timestamp_ties_by_id() {
	let ts = OffsetDateTime::UNIX_EPOCH + Duration::days(1);
	let low = Uuid::from_u128(1);
	let high = Uuid::from_u128(2);
	let key = CursorKey { created_at: ts, id: high };

	assert!(key.admits(Direction::Forward, ts, low));
	assert!(!key.admits(Direction::Forward, ts, high));
	assert!(!key.admits(Direction::Backward, ts, low));
	assert!(key.admits(Direction::Backward, ts + Duration::seconds(1), low));
	assert!(key.admits(Direction::Forward, ts - Duration::seconds(1), Uuid::from_u128(9)));
}

#[test]
fn forward_page_trims_probe_row() {
	let window = PageWindow::new(Some(3), 10, None, None).expect("window");
	let page = pagination::finish_page(vec![5, 4, 3, 2], &window);

	assert_eq!(page.data, vec![5, 4, 3]);
	assert!(page.has_more);

	let last = pagination::finish_page(vec![2, 1], &window);

	assert_eq!(last.data, vec![2, 1]);
	assert!(!last.has_more);
}

#[test]
fn backward_page_is_reversed_to_newest_first() {
	let window = PageWindow::new(Some(2), 10, None, Some(Uuid::new_v4())).expect("window");
	// Rows newer than the cursor, oldest first.
	let page = pagination::finish_page(vec![6, 7, 8], &window);

	assert_eq!(page.data, vec![7, 6]);
	assert!(page.has_more);
}

#[test]
fn backward_policy_controls_reporting() {
	let backward = PageWindow::new(Some(2), 10, None, Some(Uuid::new_v4())).expect("window");
	let forward = PageWindow::new(Some(2), 10, Some(Uuid::new_v4()), None).expect("window");

	assert!(!pagination::report_has_more(false, &backward, BackwardHasMore::Exact));
	assert!(pagination::report_has_more(false, &backward, BackwardHasMore::Always));
	assert!(!pagination::report_has_more(false, &forward, BackwardHasMore::Always));
	assert!(pagination::report_has_more(true, &forward, BackwardHasMore::Exact));
}
