//! Venue validation, creation and search.

use crate::errors::ServiceError;
use crate::models::{NewVenue, Venue, VenuePage, VenueSearch, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::repositories::VenueRepository;
use chrono::Utc;
use reqwest::Url;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

const NAME_LEN: RangeInclusive<usize> = 3..=200;
const CITY_ID_LEN: RangeInclusive<usize> = 2..=255;
const SPORT_TYPE_LEN: RangeInclusive<usize> = 2..=50;
const MIN_THUMBNAIL_URL_LEN: usize = 10;
const LONG_TEXT_LEN: RangeInclusive<usize> = 50..=8000;

pub struct VenueService {
    venues: Arc<dyn VenueRepository>,
}

impl VenueService {
    pub fn new(venues: Arc<dyn VenueRepository>) -> Self {
        Self { venues }
    }

    #[instrument(skip_all, name = "venue.services.venues.create")]
    pub async fn create(&self, created_by: &str, input: NewVenue) -> Result<Venue, ServiceError> {
        let input = normalize(input);
        validate_new_venue(&input)?;

        if let Some(place_id) = input.google_place_id.as_deref() {
            if self.venues.find_by_google_place_id(place_id).await.is_some() {
                return Err(ServiceError::Conflict(format!(
                    "Place with google place id {place_id} already exists"
                )));
            }
        }

        let now = Utc::now();
        let venue = self
            .venues
            .insert(Venue {
                id: Uuid::new_v4(),
                created_on: now,
                updated_on: now,
                created_by: created_by.to_string(),
                updated_by: created_by.to_string(),
                name: input.name,
                address: input.address,
                website: input.website,
                city_id: input.city_id,
                google_place_id: input.google_place_id,
                sport_type: input.sport_type,
                thumbnail_url: input.thumbnail_url,
                description: input.description,
                note: input.note,
            })
            .await?;

        tracing::info!(target: "venue.services.venues", venue_id = %venue.id, "Venue created");
        Ok(venue)
    }

    /// Search one city for one sport.
    ///
    /// `cursor` is the id of the last venue already shown. `page_size`
    /// defaults to 15 and is clamped to `1..=100`.
    pub async fn search(
        &self,
        city_id: &str,
        sport: &str,
        cursor: Option<&str>,
        page_size: Option<usize>,
    ) -> Result<VenuePage, ServiceError> {
        let city_id = city_id.trim();
        let sport = sport.trim();
        if city_id.is_empty() || sport.is_empty() {
            return Err(ServiceError::BadRequest(
                "Pick a sport and city!".to_string(),
            ));
        }

        let cursor = match cursor.map(str::trim).filter(|c| !c.is_empty()) {
            Some(raw) => Some(
                Uuid::parse_str(raw)
                    .map_err(|_| ServiceError::BadRequest("Invalid cursor".to_string()))?,
            ),
            None => None,
        };

        let search = VenueSearch {
            city_id: city_id.to_string(),
            sport: sport.to_string(),
            cursor,
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        };

        Ok(self.venues.search(&search).await)
    }

    /// Look a venue up by its id. Malformed ids are simply not found.
    pub async fn get(&self, id: &str) -> Option<Venue> {
        let id = Uuid::parse_str(id).ok()?;
        self.venues.get(id).await
    }
}

fn normalize(mut input: NewVenue) -> NewVenue {
    input.name = input.name.trim().to_string();
    input.address = input.address.trim().to_string();
    input.website = input.website.trim().to_string();
    input.city_id = input.city_id.trim().to_string();
    input.sport_type = input.sport_type.trim().to_string();
    input.thumbnail_url = input.thumbnail_url.trim().to_string();
    input.description = input.description.trim().to_string();
    input.note = input.note.trim().to_string();
    input.google_place_id = input
        .google_place_id
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    input
}

fn check_len(field: &str, value: &str, range: &RangeInclusive<usize>) -> Result<(), ServiceError> {
    if range.contains(&value.chars().count()) {
        Ok(())
    } else {
        Err(ServiceError::BadRequest(format!(
            "{field} must be {} to {} characters",
            range.start(),
            range.end()
        )))
    }
}

/// True for an absolute `http` or `https` URL. Anything else must never
/// reach an `href` or `src` attribute.
pub fn is_http_url(value: &str) -> bool {
    Url::parse(value).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

fn check_http_url(field: &str, value: &str) -> Result<(), ServiceError> {
    if is_http_url(value) {
        Ok(())
    } else {
        Err(ServiceError::BadRequest(format!(
            "{field} must be an http or https URL"
        )))
    }
}

/// Field rules for a new venue. The note is optional but, when present,
/// held to the same length rule as the description.
pub fn validate_new_venue(input: &NewVenue) -> Result<(), ServiceError> {
    check_len("name", &input.name, &NAME_LEN)?;
    check_len("city_id", &input.city_id, &CITY_ID_LEN)?;
    check_len("sport_type", &input.sport_type, &SPORT_TYPE_LEN)?;

    if input.thumbnail_url.chars().count() < MIN_THUMBNAIL_URL_LEN {
        return Err(ServiceError::BadRequest(format!(
            "thumbnail_url must be at least {MIN_THUMBNAIL_URL_LEN} characters"
        )));
    }

    check_http_url("thumbnail_url", &input.thumbnail_url)?;

    if !input.website.is_empty() {
        check_http_url("website", &input.website)?;
    }

    check_len("description", &input.description, &LONG_TEXT_LEN)?;

    if !input.note.is_empty() {
        check_len("note", &input.note, &LONG_TEXT_LEN)?;
    }

    Ok(())
}
