pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Query compilation failed: {message}")]
	CompileFailure { message: String },
	#[error("Statement timed out.")]
	ExecutionTimeout,
	#[error("Query syntax error: {message}")]
	ExecutionSyntaxError { message: String },
	#[error("Search failed after exhausting all fallbacks: {message}")]
	ExecutionFailure { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Internal error: {message}")]
	Internal { message: String },
	/// User-initiated stop. Reported distinctly so callers can suppress
	/// error UI for it.
	#[error("Run was stopped.")]
	Canceled,
}

impl Error {
	pub fn is_canceled(&self) -> bool {
		matches!(self, Self::Canceled)
	}
}

impl From<scout_storage::Error> for Error {
	fn from(err: scout_storage::Error) -> Self {
		match err {
			scout_storage::Error::StatementTimeout => Self::ExecutionTimeout,
			scout_storage::Error::Syntax(message) => Self::ExecutionSyntaxError { message },
			scout_storage::Error::NotFound(message) => Self::NotFound { message },
			scout_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			scout_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
		}
	}
}

impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
