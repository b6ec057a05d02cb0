use sqlx::types::Json;

use mnemo_config::Message;

use crate::{BoxFuture, PromptStore, Result, db::Db};

impl PromptStore for Db {
	fn get<'a>(&'a self, org_id: &'a str) -> BoxFuture<'a, Result<Option<Vec<Message>>>> {
		Box::pin(async move {
			let row: Option<Json<Vec<Message>>> =
				sqlx::query_scalar("SELECT messages FROM prompts WHERE org_id = $1")
					.bind(org_id)
					.fetch_optional(&self.pool)
					.await?;

			Ok(row.map(|Json(messages)| messages))
		})
	}

	fn upsert<'a>(&'a self, org_id: &'a str, messages: &'a [Message]) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			sqlx::query(
				"\
INSERT INTO prompts (org_id, messages)
VALUES ($1, $2)
ON CONFLICT (org_id) DO UPDATE
SET messages = EXCLUDED.messages, updated_at = now()",
			)
			.bind(org_id)
			.bind(Json(messages))
			.execute(&self.pool)
			.await?;

			Ok(())
		})
	}

	fn insert_if_absent<'a>(
		&'a self,
		org_id: &'a str,
		messages: &'a [Message],
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let result = sqlx::query(
				"\
INSERT INTO prompts (org_id, messages)
VALUES ($1, $2)
ON CONFLICT (org_id) DO NOTHING",
			)
			.bind(org_id)
			.bind(Json(messages))
			.execute(&self.pool)
			.await?;

			Ok(result.rows_affected() > 0)
		})
	}

	fn delete<'a>(&'a self, org_id: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let result = sqlx::query("DELETE FROM prompts WHERE org_id = $1")
				.bind(org_id)
				.execute(&self.pool)
				.await?;

			Ok(result.rows_affected() > 0)
		})
	}
}
