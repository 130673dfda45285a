//! Cache statistics: `GET api/cache/stats`.

use crate::errors::SourceError;
use crate::ingestors::StatsSource;
use crate::model::TelemetrySnapshot;
use crate::retrieve::ApiClient;

/// The cache statistics endpoint, as a `StatsSource`.
#[derive(Clone)]
pub struct CacheStatsEndpoint {
    client: ApiClient,
}

impl CacheStatsEndpoint {
    /// Wraps a client; the endpoint accepts authorized and anonymous calls.
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

impl StatsSource for CacheStatsEndpoint {
    async fn fetch_stats(&self) -> Result<TelemetrySnapshot, SourceError> {
        self.client.get_json("api/cache/stats", &[]).await
    }
}
