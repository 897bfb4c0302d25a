//! Free text place search

use tracing::{debug, warn};

use crate::{Coordinate, Geocoder, TrackingError};

/// Resolves place queries through the geocoding service
pub struct PlaceResolver<G> {
    geocoder: G,
    /// Place index resource name on the search service
    index: String,
}

impl<G> PlaceResolver<G>
where
    G: Geocoder,
{
    pub fn new(geocoder: G, index: String) -> Self {
        Self { geocoder, index }
    }

    /// First candidate returned by the service, `None` when nothing matched.
    ///
    /// Rejecting blank queries is left to the caller.
    pub async fn resolve(&self, query: &str) -> Result<Option<Coordinate>, TrackingError> {
        let candidates = self
            .geocoder
            .search_text(&self.index, query)
            .await
            .map_err(|e| {
                warn!(query, index = %self.index, error = %e, "Place search failed");
                TrackingError::from(e)
            })?;

        debug!(query, candidates = candidates.len(), "Place search answered");

        Ok(candidates.first().copied())
    }
}
