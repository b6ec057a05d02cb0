use std::sync::Arc;

use mnemo_service::MnemoService;
use mnemo_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<MnemoService>,
}
impl AppState {
	/// Connects to Postgres and bootstraps the schema before serving.
	pub async fn new(config: mnemo_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema(config.memory.vector_dim).await?;

		Ok(Self::from_service(MnemoService::with_db(config, db)))
	}

	pub fn from_service(service: MnemoService) -> Self {
		Self { service: Arc::new(service) }
	}
}
