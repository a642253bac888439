use std::sync::Arc;

use larq_service::{ArchiveService, MemoryResponseStore};
use larq_storage::{ElasticStore, StatusClient};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<ArchiveService>,
}
impl AppState {
	pub fn new(config: larq_config::Config) -> color_eyre::Result<Self> {
		let search = Arc::new(ElasticStore::new(&config.elastic)?);
		let status = Arc::new(StatusClient::new(&config.status)?);
		let responses = Arc::new(MemoryResponseStore::new());
		let service = ArchiveService::new(config, search, status, responses);

		Ok(Self { service: Arc::new(service) })
	}

	/// Wires the state around an already built service; used by tests that
	/// swap the collaborators for scripted ones.
	pub fn from_service(service: Arc<ArchiveService>) -> Self {
		Self { service }
	}
}
