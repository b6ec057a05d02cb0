use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use mnemo_domain::pagination::{self, CursorKey, Direction, Page};

use crate::{
	BoxFuture, Error, MemoryStore, Result,
	db::Db,
	models::{MemoryFilter, MemoryRecord, NewMemory, PageQuery, ScoredMemory, VectorQuery},
	vector,
};

const RECORD_COLUMNS: &str = "id, org_id, user_id, agent_id, memory_text, created_at, updated_at";

impl MemoryStore for Db {
	fn add<'a>(&'a self, items: Vec<NewMemory>) -> BoxFuture<'a, Result<Vec<Uuid>>> {
		Box::pin(add_memories(self, items))
	}

	fn query<'a>(&'a self, query: VectorQuery) -> BoxFuture<'a, Result<Vec<ScoredMemory>>> {
		Box::pin(query_memories(self, query))
	}

	fn get_all_by_ids<'a>(
		&'a self,
		org_id: &'a str,
		ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<Vec<MemoryRecord>>> {
		Box::pin(get_memories(self, org_id, ids))
	}

	fn delete<'a>(&'a self, org_id: &'a str, ids: &'a [Uuid]) -> BoxFuture<'a, Result<u64>> {
		Box::pin(delete_memories(self, org_id, ids))
	}

	fn get_by_filters<'a>(&'a self, query: PageQuery) -> BoxFuture<'a, Result<Page<MemoryRecord>>> {
		Box::pin(page_memories(self, query))
	}
}

async fn add_memories(db: &Db, items: Vec<NewMemory>) -> Result<Vec<Uuid>> {
	for item in &items {
		item.validate()?;
	}

	let mut tx = db.pool.begin().await?;
	let mut ids = Vec::with_capacity(items.len());

	for item in &items {
		let id = item.id.unwrap_or_else(Uuid::new_v4);
		// The conditional update turns an id owned by another organization into "no row".
		let written: Option<Uuid> = sqlx::query_scalar(
			"\
INSERT INTO memories (id, org_id, user_id, agent_id, memory_text, embedding)
VALUES ($1, $2, $3, $4, $5, $6::text::vector)
ON CONFLICT (id) DO UPDATE
SET
	user_id = EXCLUDED.user_id,
	agent_id = EXCLUDED.agent_id,
	memory_text = EXCLUDED.memory_text,
	embedding = EXCLUDED.embedding,
	updated_at = clock_timestamp()
WHERE memories.org_id = EXCLUDED.org_id
RETURNING id",
		)
		.bind(id)
		.bind(item.org_id.as_str())
		.bind(item.user_id.as_str())
		.bind(item.agent_id.as_str())
		.bind(item.memory_text.as_str())
		.bind(vector::vector_to_pg(&item.embedding))
		.fetch_optional(&mut *tx)
		.await?;
		let Some(id) = written else {
			return Err(Error::NotFound(format!("memory {id}")));
		};

		ids.push(id);
	}

	tx.commit().await?;

	Ok(ids)
}

async fn query_memories(db: &Db, query: VectorQuery) -> Result<Vec<ScoredMemory>> {
	if query.embedding.is_empty() {
		return Err(Error::InvalidArgument("Query embedding must be non-empty.".to_string()));
	}

	let vec_text = vector::vector_to_pg(&query.embedding);
	let mut builder = QueryBuilder::<Postgres>::new("SELECT ");

	builder.push(RECORD_COLUMNS);
	builder.push(", (1 - (embedding <=> ");
	builder.push_bind(vec_text.clone());
	builder.push("::text::vector))::real AS score FROM memories");
	push_filter(&mut builder, &query.filter);
	builder.push(" ORDER BY embedding <=> ");
	builder.push_bind(vec_text);
	builder.push("::text::vector LIMIT ");
	builder.push_bind(i64::from(query.limit));

	let mut rows = builder.build_query_as::<ScoredMemory>().fetch_all(&db.pool).await?;

	// Equal distances come back in index order; settle them by id.
	rows.sort_by(|lhs, rhs| {
		rhs.score.total_cmp(&lhs.score).then_with(|| lhs.record.id.cmp(&rhs.record.id))
	});

	Ok(rows)
}

async fn get_memories(db: &Db, org_id: &str, ids: &[Uuid]) -> Result<Vec<MemoryRecord>> {
	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let mut rows: Vec<MemoryRecord> = sqlx::query_as(
		"\
SELECT id, org_id, user_id, agent_id, memory_text, created_at, updated_at
FROM memories
WHERE org_id = $1 AND id = ANY($2)",
	)
	.bind(org_id)
	.bind(ids)
	.fetch_all(&db.pool)
	.await?;

	rows.sort_by_key(|row| ids.iter().position(|id| *id == row.id));

	Ok(rows)
}

async fn delete_memories(db: &Db, org_id: &str, ids: &[Uuid]) -> Result<u64> {
	if ids.is_empty() {
		return Ok(0);
	}

	let result = sqlx::query("DELETE FROM memories WHERE org_id = $1 AND id = ANY($2)")
		.bind(org_id)
		.bind(ids)
		.execute(&db.pool)
		.await?;

	Ok(result.rows_affected())
}

async fn page_memories(db: &Db, query: PageQuery) -> Result<Page<MemoryRecord>> {
	let PageQuery { filter, window, include_total } = query;
	let cursor = match window.cursor.id() {
		Some(id) => Some(resolve_cursor(db, &filter.org_id, id).await?),
		None => None,
	};
	let direction = window.direction();
	let mut builder = QueryBuilder::<Postgres>::new("SELECT ");

	builder.push(RECORD_COLUMNS);
	builder.push(" FROM memories");
	push_filter(&mut builder, &filter);

	if let Some(key) = cursor {
		builder.push(match direction {
			Direction::Forward => " AND (created_at, id) < (",
			Direction::Backward => " AND (created_at, id) > (",
		});
		builder.push_bind(key.created_at);
		builder.push(", ");
		builder.push_bind(key.id);
		builder.push(")");
	}

	builder.push(match direction {
		Direction::Forward => " ORDER BY created_at DESC, id DESC LIMIT ",
		Direction::Backward => " ORDER BY created_at ASC, id ASC LIMIT ",
	});
	builder.push_bind(i64::from(window.fetch_limit()));

	let rows = builder.build_query_as::<MemoryRecord>().fetch_all(&db.pool).await?;
	let mut page = pagination::finish_page(rows, &window);

	if include_total {
		let mut count = QueryBuilder::<Postgres>::new("SELECT count(*) FROM memories");

		push_filter(&mut count, &filter);

		let total: i64 = count.build_query_scalar().fetch_one(&db.pool).await?;

		page.total = Some(total);
	}

	Ok(page)
}

async fn resolve_cursor(db: &Db, org_id: &str, id: Uuid) -> Result<CursorKey> {
	let row: Option<(OffsetDateTime, Uuid)> =
		sqlx::query_as("SELECT created_at, id FROM memories WHERE org_id = $1 AND id = $2")
			.bind(org_id)
			.bind(id)
			.fetch_optional(&db.pool)
			.await?;
	let (created_at, id) = row.ok_or_else(|| Error::NotFound("cursor record not found".to_string()))?;

	Ok(CursorKey { created_at, id })
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &MemoryFilter) {
	builder.push(" WHERE org_id = ");
	builder.push_bind(filter.org_id.clone());

	if let Some(user_id) = &filter.user_id {
		builder.push(" AND user_id = ");
		builder.push_bind(user_id.clone());
	}
	if let Some(agent_id) = &filter.agent_id {
		builder.push(" AND agent_id = ");
		builder.push_bind(agent_id.clone());
	}
}
