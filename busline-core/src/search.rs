use async_trait::async_trait;
use busline_shared::Trip;
use chrono::NaiveDate;
use serde::Serialize;

use crate::BoxError;

/// Catalog search criteria.
///
/// Text fields are trimmed and lower-cased on construction; blank input
/// means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchFilter {
    pub from: Option<String>,
    pub to: Option<String>,
    pub date: Option<NaiveDate>,
}

impl SearchFilter {
    pub fn new(from: &str, to: &str, date: Option<NaiveDate>) -> Self {
        Self {
            from: normalize(from),
            to: normalize(to),
            date,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none() && self.date.is_none()
    }

    /// Query-string pairs for the listing endpoint; empty fields are omitted
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(from) = &self.from {
            pairs.push(("from", from.clone()));
        }
        if let Some(to) = &self.to {
            pairs.push(("to", to.clone()));
        }
        if let Some(date) = self.date {
            pairs.push(("date", date.format("%Y-%m-%d").to_string()));
        }
        pairs
    }

    /// Local mirror of the server's filter: substring on origin and
    /// destination, same calendar day (UTC) on date
    pub fn matches(&self, trip: &Trip) -> bool {
        let contains = |field: &str, needle: &Option<String>| match needle {
            Some(n) => field.to_lowercase().contains(n.as_str()),
            None => true,
        };

        contains(&trip.origin().name, &self.from)
            && contains(&trip.destination().name, &self.to)
            && self
                .date
                .map(|d| trip.starts_at.date_naive() == d)
                .unwrap_or(true)
    }
}

fn normalize(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Anything that can list trips for a filter
#[async_trait]
pub trait TripSource: Send + Sync {
    async fn list_trips(&self, filter: &SearchFilter) -> Result<Vec<Trip>, BoxError>;
}

/// State behind the search page: the listing on screen, the unfiltered
/// listing seen at load, and the last error for the banner.
#[derive(Debug, Default)]
pub struct CatalogView {
    baseline: Vec<Trip>,
    trips: Vec<Trip>,
    filter: SearchFilter,
    has_searched: bool,
    error: Option<String>,
}

impl CatalogView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the unfiltered catalog and remember it as the baseline
    pub async fn load(&mut self, source: &dyn TripSource) -> Result<&[Trip], BoxError> {
        self.filter = SearchFilter::default();
        self.has_searched = false;

        match source.list_trips(&self.filter).await {
            Ok(trips) => {
                tracing::debug!("Loaded {} trips", trips.len());
                self.error = None;
                self.baseline = trips.clone();
                self.trips = trips;
                Ok(&self.trips)
            }
            Err(e) => {
                self.error = Some("Failed to load buses.".to_string());
                Err(e)
            }
        }
    }

    /// Run a filtered search through the source
    pub async fn search(
        &mut self,
        source: &dyn TripSource,
        filter: SearchFilter,
    ) -> Result<&[Trip], BoxError> {
        self.has_searched = true;
        self.filter = filter;

        match source.list_trips(&self.filter).await {
            Ok(trips) => {
                tracing::debug!("Search {:?} returned {} trips", self.filter, trips.len());
                self.error = None;
                if self.filter.is_empty() {
                    self.baseline = trips.clone();
                }
                self.trips = trips;
                Ok(&self.trips)
            }
            Err(e) => {
                self.error = Some("Failed to load buses.".to_string());
                Err(e)
            }
        }
    }

    /// Clear the filters and restore the unfiltered listing. No request is made.
    pub fn reset(&mut self) -> &[Trip] {
        self.filter = SearchFilter::default();
        self.has_searched = false;
        self.error = None;
        self.trips = self.baseline.clone();
        &self.trips
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn filter(&self) -> &SearchFilter {
        &self.filter
    }

    pub fn has_searched(&self) -> bool {
        self.has_searched
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
