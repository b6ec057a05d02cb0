pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	pub(crate) fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into() }
	}

	pub(crate) fn provider(message: impl Into<String>) -> Self {
		Self::Provider { message: message.into() }
	}
}

impl From<mnemo_storage::Error> for Error {
	fn from(err: mnemo_storage::Error) -> Self {
		match err {
			mnemo_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			mnemo_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			mnemo_storage::Error::NotFound(message) => Self::NotFound { message },
		}
	}
}

impl From<mnemo_providers::Error> for Error {
	fn from(err: mnemo_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<mnemo_domain::pagination::PageError> for Error {
	fn from(err: mnemo_domain::pagination::PageError) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}
