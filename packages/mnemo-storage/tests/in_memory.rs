use std::collections::HashSet;

use uuid::Uuid;

use mnemo_config::Message;
use mnemo_domain::pagination::PageWindow;
use mnemo_storage::{
	Error, MemoryStore, PromptStore,
	in_memory::InMemoryStore,
	models::{MemoryFilter, NewMemory, PageQuery, VectorQuery},
};

fn new_memory(org_id: &str, user_id: &str, text: &str, embedding: Vec<f32>) -> NewMemory {
	NewMemory {
		id: None,
		org_id: org_id.to_string(),
		user_id: user_id.to_string(),
		agent_id: String::new(),
		memory_text: text.to_string(),
		embedding,
	}
}

async fn seed(store: &InMemoryStore, org_id: &str, user_id: &str, count: usize) -> Vec<Uuid> {
	let mut ids = Vec::with_capacity(count);

	// One row per batch so every row gets its own timestamp.
	for i in 0..count {
		let item = new_memory(org_id, user_id, &format!("fact {i}"), vec![1.0, i as f32]);

		ids.extend(store.add(vec![item]).await.expect("Failed to add memory."));
	}

	ids
}

fn page_query(org_id: &str, limit: i64, after: Option<Uuid>, before: Option<Uuid>) -> PageQuery {
	PageQuery {
		filter: MemoryFilter::org(org_id),
		window: PageWindow::new(Some(limit), 10, after, before).expect("Failed to build window."),
		include_total: false,
	}
}

#[tokio::test]
async fn upsert_keeps_created_at_and_bumps_updated_at() {
	let store = InMemoryStore::new();
	let ids = store
		.add(vec![new_memory("org-a", "u1", "likes apples", vec![1.0, 0.0])])
		.await
		.expect("Failed to add memory.");
	let before = store.get_all_by_ids("org-a", &ids).await.expect("Failed to read.")[0].clone();
	let mut update = new_memory("org-a", "u1", "likes bananas", vec![0.0, 1.0]);

	update.id = Some(ids[0]);

	let updated_ids = store.add(vec![update]).await.expect("Failed to upsert memory.");
	let after = store.get_all_by_ids("org-a", &ids).await.expect("Failed to read.")[0].clone();

	assert_eq!(updated_ids, ids);
	assert_eq!(after.memory_text, "likes bananas");
	assert_eq!(after.created_at, before.created_at);
	assert!(after.updated_at > before.updated_at);
	assert_eq!(store.embedding_of(ids[0]).await, Some(vec![0.0, 1.0]));
}

#[tokio::test]
async fn rows_are_invisible_across_orgs() {
	let store = InMemoryStore::new();
	let ids = store
		.add(vec![new_memory("org-a", "u1", "likes apples", vec![1.0, 0.0])])
		.await
		.expect("Failed to add memory.");

	assert!(store.get_all_by_ids("org-b", &ids).await.expect("Failed to read.").is_empty());
	assert_eq!(MemoryStore::delete(&store, "org-b", &ids).await.expect("Failed to delete."), 0);

	let hits = store
		.query(VectorQuery {
			embedding: vec![1.0, 0.0],
			limit: 10,
			filter: MemoryFilter::org("org-b"),
		})
		.await
		.expect("Failed to query.");

	assert!(hits.is_empty());

	let err = store
		.get_by_filters(page_query("org-b", 10, Some(ids[0]), None))
		.await
		.expect_err("Foreign cursor must not resolve.");

	assert!(matches!(err, Error::NotFound(message) if message == "cursor record not found"));
}

#[tokio::test]
async fn foreign_upsert_fails_and_writes_nothing() {
	let store = InMemoryStore::new();
	let ids = store
		.add(vec![new_memory("org-a", "u1", "likes apples", vec![1.0, 0.0])])
		.await
		.expect("Failed to add memory.");
	let mut hijack = new_memory("org-b", "u9", "owned now", vec![0.0, 1.0]);

	hijack.id = Some(ids[0]);

	let batch = vec![new_memory("org-b", "u9", "fresh row", vec![1.0, 1.0]), hijack];
	let err = store.add(batch).await.expect_err("Foreign upsert must fail.");

	assert!(matches!(err, Error::NotFound(_)));
	assert_eq!(store.len().await, 1);

	let kept = store.get_all_by_ids("org-a", &ids).await.expect("Failed to read.");

	assert_eq!(kept[0].memory_text, "likes apples");
}

#[tokio::test]
async fn invalid_rows_are_rejected() {
	let store = InMemoryStore::new();
	let err = store
		.add(vec![new_memory("org-a", " ", "likes apples", vec![1.0])])
		.await
		.expect_err("Blank user must fail.");

	assert!(matches!(err, Error::InvalidArgument(_)));

	let err = store
		.add(vec![new_memory("org-a", "u1", "likes apples", Vec::new())])
		.await
		.expect_err("Empty embedding must fail.");

	assert!(matches!(err, Error::InvalidArgument(_)));
	assert!(store.is_empty().await);
}

#[tokio::test]
async fn query_ranks_by_cosine_similarity_under_filters() {
	let store = InMemoryStore::new();

	store
		.add(vec![
			new_memory("org-a", "u1", "north", vec![0.0, 1.0]),
			new_memory("org-a", "u1", "east", vec![1.0, 0.0]),
			new_memory("org-a", "u1", "north-east", vec![1.0, 1.0]),
			new_memory("org-a", "u2", "other user", vec![1.0, 0.0]),
		])
		.await
		.expect("Failed to add memories.");

	let hits = store
		.query(VectorQuery {
			embedding: vec![1.0, 0.1],
			limit: 2,
			filter: MemoryFilter { user_id: Some("u1".to_string()), ..MemoryFilter::org("org-a") },
		})
		.await
		.expect("Failed to query.");
	let texts: Vec<&str> = hits.iter().map(|hit| hit.record.memory_text.as_str()).collect();

	assert_eq!(texts, vec!["east", "north-east"]);
	assert!(hits[0].score >= hits[1].score);
}

#[tokio::test]
async fn delete_is_idempotent() {
	let store = InMemoryStore::new();
	let ids = seed(&store, "org-a", "u1", 1).await;

	assert_eq!(MemoryStore::delete(&store, "org-a", &ids).await.expect("Failed to delete."), 1);
	assert_eq!(MemoryStore::delete(&store, "org-a", &ids).await.expect("Failed to delete."), 0);
	assert!(store.get_all_by_ids("org-a", &ids).await.expect("Failed to read.").is_empty());
}

#[tokio::test]
async fn forward_pages_cover_every_row_once() {
	let store = InMemoryStore::new();
	let ids = seed(&store, "org-a", "u1", 23).await;
	let mut seen = Vec::new();
	let mut cursor = None;

	loop {
		let page = store
			.get_by_filters(page_query("org-a", 5, cursor, None))
			.await
			.expect("Failed to page.");

		for pair in page.data.windows(2) {
			assert!((pair[0].created_at, pair[0].id) > (pair[1].created_at, pair[1].id));
		}

		seen.extend(page.data.iter().map(|record| record.id));
		cursor = page.data.last().map(|record| record.id);

		if !page.has_more {
			break;
		}
	}

	let unique: HashSet<Uuid> = seen.iter().copied().collect();
	let mut newest_first = ids.clone();

	newest_first.reverse();

	assert_eq!(seen.len(), 23);
	assert_eq!(unique.len(), 23);
	assert_eq!(seen, newest_first);
}

#[tokio::test]
async fn backward_page_returns_newer_rows_newest_first() {
	let store = InMemoryStore::new();
	// ids[0] is the oldest.
	let ids = seed(&store, "org-a", "u1", 6).await;
	let page = store
		.get_by_filters(page_query("org-a", 2, None, Some(ids[1])))
		.await
		.expect("Failed to page.");
	let data: Vec<Uuid> = page.data.iter().map(|record| record.id).collect();

	assert_eq!(data, vec![ids[3], ids[2]]);
	assert!(page.has_more);

	let newest = store
		.get_by_filters(page_query("org-a", 2, None, Some(ids[3])))
		.await
		.expect("Failed to page.");
	let data: Vec<Uuid> = newest.data.iter().map(|record| record.id).collect();

	assert_eq!(data, vec![ids[5], ids[4]]);
	assert!(!newest.has_more);
}

#[tokio::test]
async fn total_ignores_cursor_but_honors_filters() {
	let store = InMemoryStore::new();
	let ids = seed(&store, "org-a", "u1", 4).await;

	seed(&store, "org-a", "u2", 3).await;

	let page = store
		.get_by_filters(PageQuery {
			filter: MemoryFilter { user_id: Some("u1".to_string()), ..MemoryFilter::org("org-a") },
			window: PageWindow::new(Some(2), 10, Some(ids[2]), None).expect("window"),
			include_total: true,
		})
		.await
		.expect("Failed to page.");

	assert_eq!(page.total, Some(4));
	assert_eq!(page.data.len(), 2);
	assert!(!page.has_more);
}

#[tokio::test]
async fn prompt_overrides_are_per_org() {
	let store = InMemoryStore::new();
	let custom = vec![Message::system("Only extract food preferences.")];
	let default = vec![Message::system("Default prompt.")];

	assert!(PromptStore::get(&store, "org-a").await.expect("Failed to read prompt.").is_none());
	assert!(store.insert_if_absent("org-a", &default).await.expect("Failed to init prompt."));

	store.upsert("org-a", &custom).await.expect("Failed to set prompt.");

	assert!(!store.insert_if_absent("org-a", &default).await.expect("Failed to init prompt."));
	assert_eq!(
		PromptStore::get(&store, "org-a").await.expect("Failed to read prompt."),
		Some(custom)
	);
	assert!(PromptStore::get(&store, "org-b").await.expect("Failed to read prompt.").is_none());
	assert!(PromptStore::delete(&store, "org-a").await.expect("Failed to reset prompt."));
	assert!(!PromptStore::delete(&store, "org-a").await.expect("Failed to reset prompt."));
}
