pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Http(#[from] reqwest::Error),
	#[error("Search backend error: {0}")]
	Backend(String),
	#[error("Malformed response: {0}")]
	Decode(String),
}
