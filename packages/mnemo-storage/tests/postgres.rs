use uuid::Uuid;

use mnemo_config::{Message, Postgres};
use mnemo_domain::pagination::PageWindow;
use mnemo_storage::{
	Error, MemoryStore, PromptStore,
	db::Db,
	models::{MemoryFilter, NewMemory, PageQuery, VectorQuery},
	vector,
};
use mnemo_testkit::TestDatabase;

const DIM: u32 = 3;

async fn test_db() -> Option<(TestDatabase, Db)> {
	let base_dsn = mnemo_testkit::env_dsn()?;
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema(DIM).await.expect("Failed to ensure schema.");

	Some((test_db, db))
}

fn new_memory(org_id: &str, text: &str, embedding: Vec<f32>) -> NewMemory {
	NewMemory {
		id: None,
		org_id: org_id.to_string(),
		user_id: "u1".to_string(),
		agent_id: String::new(),
		memory_text: text.to_string(),
		embedding,
	}
}

fn page_query(org_id: &str, limit: i64, after: Option<Uuid>, before: Option<Uuid>) -> PageQuery {
	PageQuery {
		filter: MemoryFilter::org(org_id),
		window: PageWindow::new(Some(limit), 10, after, before).expect("Failed to build window."),
		include_total: true,
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres with pgvector. Set MNEMO_PG_DSN to run."]
async fn schema_bootstrap_is_idempotent() {
	let Some((test_db, db)) = test_db().await else {
		eprintln!("Skipping schema_bootstrap_is_idempotent; set MNEMO_PG_DSN to run this test.");

		return;
	};

	db.ensure_schema(DIM).await.expect("Second bootstrap failed.");

	let count: i64 = sqlx::query_scalar(
		"SELECT count(*) FROM information_schema.tables WHERE table_name IN ('memories', 'prompts')",
	)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to query schema tables.");

	assert_eq!(count, 2);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres with pgvector. Set MNEMO_PG_DSN to run."]
async fn upsert_reembeds_and_scopes_by_org() {
	let Some((test_db, db)) = test_db().await else {
		eprintln!("Skipping upsert_reembeds_and_scopes_by_org; set MNEMO_PG_DSN to run this test.");

		return;
	};
	let ids = db
		.add(vec![new_memory("org-a", "likes apples", vec![1.0, 0.0, 0.0])])
		.await
		.expect("Failed to add memory.");
	let mut update = new_memory("org-a", "likes bananas", vec![0.0, 1.0, 0.0]);

	update.id = Some(ids[0]);
	db.add(vec![update]).await.expect("Failed to upsert memory.");

	let stored: String = sqlx::query_scalar("SELECT embedding::text FROM memories WHERE id = $1")
		.bind(ids[0])
		.fetch_one(&db.pool)
		.await
		.expect("Failed to read embedding.");

	assert_eq!(stored, vector::vector_to_pg(&[0.0, 1.0, 0.0]));

	let records = db.get_all_by_ids("org-a", &ids).await.expect("Failed to read.");

	assert_eq!(records[0].memory_text, "likes bananas");
	assert!(records[0].updated_at > records[0].created_at);
	assert!(db.get_all_by_ids("org-b", &ids).await.expect("Failed to read.").is_empty());

	let mut hijack = new_memory("org-b", "owned now", vec![0.0, 0.0, 1.0]);

	hijack.id = Some(ids[0]);

	let err = db.add(vec![hijack]).await.expect_err("Foreign upsert must fail.");

	assert!(matches!(err, Error::NotFound(_)));

	let hits = db
		.query(VectorQuery {
			embedding: vec![0.0, 1.0, 0.1],
			limit: 5,
			filter: MemoryFilter::org("org-a"),
		})
		.await
		.expect("Failed to query.");

	assert_eq!(hits.len(), 1);
	assert!(hits[0].score > 0.9);
	assert_eq!(MemoryStore::delete(&db, "org-b", &ids).await.expect("Failed to delete."), 0);
	assert_eq!(MemoryStore::delete(&db, "org-a", &ids).await.expect("Failed to delete."), 1);
	assert_eq!(MemoryStore::delete(&db, "org-a", &ids).await.expect("Failed to delete."), 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres with pgvector. Set MNEMO_PG_DSN to run."]
async fn pages_walk_both_directions() {
	let Some((test_db, db)) = test_db().await else {
		eprintln!("Skipping pages_walk_both_directions; set MNEMO_PG_DSN to run this test.");

		return;
	};
	let mut ids = Vec::new();

	for i in 0..5 {
		let item = new_memory("org-a", &format!("fact {i}"), vec![1.0, i as f32, 0.0]);

		ids.extend(db.add(vec![item]).await.expect("Failed to add memory."));
	}

	let first = db.get_by_filters(page_query("org-a", 2, None, None)).await.expect("page");
	let first_ids: Vec<Uuid> = first.data.iter().map(|record| record.id).collect();

	assert_eq!(first_ids, vec![ids[4], ids[3]]);
	assert!(first.has_more);
	assert_eq!(first.total, Some(5));

	let second =
		db.get_by_filters(page_query("org-a", 2, Some(ids[3]), None)).await.expect("page");
	let second_ids: Vec<Uuid> = second.data.iter().map(|record| record.id).collect();

	assert_eq!(second_ids, vec![ids[2], ids[1]]);
	assert!(second.has_more);

	let back = db.get_by_filters(page_query("org-a", 2, None, Some(ids[2]))).await.expect("page");
	let back_ids: Vec<Uuid> = back.data.iter().map(|record| record.id).collect();

	assert_eq!(back_ids, vec![ids[4], ids[3]]);
	assert!(!back.has_more);

	let err = db
		.get_by_filters(page_query("org-a", 2, Some(Uuid::new_v4()), None))
		.await
		.expect_err("Unknown cursor must fail.");

	assert!(matches!(err, Error::NotFound(_)));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres with pgvector. Set MNEMO_PG_DSN to run."]
async fn prompt_override_round_trip() {
	let Some((test_db, db)) = test_db().await else {
		eprintln!("Skipping prompt_override_round_trip; set MNEMO_PG_DSN to run this test.");

		return;
	};
	let messages = vec![Message::system("Only extract food preferences.")];

	assert!(PromptStore::get(&db, "org-a").await.expect("Failed to read prompt.").is_none());
	assert!(db.insert_if_absent("org-a", &messages).await.expect("Failed to init prompt."));
	assert!(!db.insert_if_absent("org-a", &messages).await.expect("Failed to init prompt."));

	db.upsert("org-a", &[Message::system("Replaced.")]).await.expect("Failed to set prompt.");

	let stored = PromptStore::get(&db, "org-a").await.expect("Failed to read prompt.");

	assert_eq!(stored, Some(vec![Message::system("Replaced.")]));
	assert!(PromptStore::delete(&db, "org-a").await.expect("Failed to reset prompt."));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
