#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Statement timed out.")]
	StatementTimeout,
	#[error("Syntax error: {0}")]
	Syntax(String),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
}

impl Error {
	/// Classifies a query failure so callers can distinguish a statement
	/// timeout (SQLSTATE 57014) and a syntax/access error (class 42) from
	/// everything else. The escalation controller branches on exactly this.
	pub fn classify_query_error(err: sqlx::Error) -> Self {
		if let sqlx::Error::Database(db_err) = &err
			&& let Some(code) = db_err.code()
		{
			if code == "57014" {
				return Self::StatementTimeout;
			}
			if code.starts_with("42") {
				return Self::Syntax(db_err.message().to_string());
			}
		}

		Self::Sqlx(err)
	}

	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::StatementTimeout)
	}

	pub fn is_syntax(&self) -> bool {
		matches!(self, Self::Syntax(_))
	}
}
