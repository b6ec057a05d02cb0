mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	BackwardHasMore, Config, EmbeddingProviderConfig, LlmProviderConfig, Memory, Message,
	Postgres, Prompts, Providers, Role, Service, Storage,
};

use std::{fs, path::Path};

/// Largest page `list` will ever return.
pub const MAX_PAGE_SIZE: u32 = 100;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);
	validate(&cfg)?;

	Ok(cfg)
}

pub fn from_toml_str(raw: &str) -> Result<Config> {
	let mut cfg: Config =
		toml::from_str(raw).map_err(|err| Error::ParseConfigStr { source: err })?;

	normalize(&mut cfg);
	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.memory.vector_dim == 0 {
		return Err(Error::Validation {
			message: "memory.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.memory.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match memory.vector_dim.".to_string(),
		});
	}
	if cfg.memory.candidate_k == 0 {
		return Err(Error::Validation {
			message: "memory.candidate_k must be greater than zero.".to_string(),
		});
	}
	if cfg.memory.search_limit == 0 {
		return Err(Error::Validation {
			message: "memory.search_limit must be greater than zero.".to_string(),
		});
	}
	if !(1..=MAX_PAGE_SIZE).contains(&cfg.memory.default_page_size) {
		return Err(Error::Validation {
			message: format!("memory.default_page_size must be in the range 1-{MAX_PAGE_SIZE}."),
		});
	}
	if !cfg.providers.llm.temperature.is_finite() {
		return Err(Error::Validation {
			message: "providers.llm.temperature must be a finite number.".to_string(),
		});
	}

	for (label, key) in
		[("embedding", &cfg.providers.embedding.api_key), ("llm", &cfg.providers.llm.api_key)]
	{
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	if cfg.prompts.fact_extraction.is_empty() {
		return Err(Error::Validation {
			message: "prompts.fact_extraction must contain at least one message.".to_string(),
		});
	}
	if cfg.prompts.fact_extraction.iter().any(|message| message.content.trim().is_empty()) {
		return Err(Error::Validation {
			message: "prompts.fact_extraction messages must have non-empty content.".to_string(),
		});
	}
	if cfg.prompts.reconciliation.trim().is_empty() {
		return Err(Error::Validation {
			message: "prompts.reconciliation must be non-empty.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for api_base in [&mut cfg.providers.embedding.api_base, &mut cfg.providers.llm.api_base] {
		while api_base.ends_with('/') {
			api_base.pop();
		}
	}

	cfg.service.log_level = cfg.service.log_level.trim().to_string();
}
