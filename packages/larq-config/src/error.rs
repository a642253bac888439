pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read larq config from {path:?}.")]
	Read { path: std::path::PathBuf, source: std::io::Error },
	#[error("larq config at {path:?} is not valid TOML.")]
	Parse { path: std::path::PathBuf, source: toml::de::Error },
	/// `field` is the dotted config path (`status.status_ttl_ms`), so callers
	/// can point straight at the offending line.
	#[error("Invalid config field {field}: {reason}.")]
	Validation { field: &'static str, reason: String },
}

pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Error {
	Error::Validation { field, reason: reason.into() }
}
