pub mod elastic;
pub mod models;
pub mod status;

mod error;

pub use elastic::{ElasticStore, SearchHits};
pub use error::{Error, Result};
pub use models::{EmptyTicksDoc, Event, TickData, Transaction};
pub use status::StatusClient;
