//! Venue storage and search.

use crate::models::{Venue, VenuePage, VenueSearch};
use crate::repositories::RepositoryError;
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait::async_trait]
pub trait VenueRepository: Send + Sync {
    /// Insert a venue. A non-empty `google_place_id` must be unique.
    async fn insert(&self, venue: Venue) -> Result<Venue, RepositoryError>;

    async fn get(&self, id: Uuid) -> Option<Venue>;

    async fn find_by_google_place_id(&self, google_place_id: &str) -> Option<Venue>;

    /// Venues matching city and sport, oldest first, keyset-paginated.
    async fn search(&self, search: &VenueSearch) -> VenuePage;
}

/// Venues kept in insertion order.
#[derive(Default)]
pub struct InMemoryVenueRepository {
    venues: RwLock<Vec<Venue>>,
}

impl InMemoryVenueRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl VenueRepository for InMemoryVenueRepository {
    async fn insert(&self, venue: Venue) -> Result<Venue, RepositoryError> {
        let mut venues = self.venues.write().await;

        if let Some(place_id) = venue.google_place_id.as_deref() {
            if venues
                .iter()
                .any(|v| v.google_place_id.as_deref() == Some(place_id))
            {
                return Err(RepositoryError::Conflict(format!(
                    "Place with google place id {place_id} already exists"
                )));
            }
        }

        venues.push(venue.clone());
        tracing::debug!(target: "venue.repositories.venues", venue_id = %venue.id, "Venue stored");
        Ok(venue)
    }

    async fn get(&self, id: Uuid) -> Option<Venue> {
        self.venues.read().await.iter().find(|v| v.id == id).cloned()
    }

    async fn find_by_google_place_id(&self, google_place_id: &str) -> Option<Venue> {
        self.venues
            .read()
            .await
            .iter()
            .find(|v| v.google_place_id.as_deref() == Some(google_place_id))
            .cloned()
    }

    async fn search(&self, search: &VenueSearch) -> VenuePage {
        let venues = self.venues.read().await;

        let matching = venues.iter().filter(|v| {
            v.city_id == search.city_id && v.sport_type.eq_ignore_ascii_case(&search.sport)
        });

        // Skip through the cursor venue. An unknown cursor yields an empty
        // page rather than restarting.
        let mut after_cursor = matching
            .skip_while(|v| search.cursor.is_some_and(|c| v.id != c))
            .skip(usize::from(search.cursor.is_some()));

        let results: Vec<Venue> = after_cursor
            .by_ref()
            .take(search.page_size)
            .cloned()
            .collect();
        let has_more = after_cursor.next().is_some();

        let cursor = if has_more {
            results.last().map(|v| v.id.to_string())
        } else {
            None
        };

        VenuePage { results, cursor }
    }
}
