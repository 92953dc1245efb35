//! Place lookup by name, postal code or coordinates.

use chrono::{DateTime, Utc};
use skycast_core::EndpointsConfig;
use tracing::instrument;

use crate::api::{ApiPlace, PlaceResults, QueryApi};
use crate::position::{GeoPosition, PlaceInfo, Region};
use crate::query::{build_query, QueryKind};
use crate::types::WeatherError;

/// Looks places up through the places data source.
///
/// Accepts the same search terms as the forecast client:
/// - a latitude and longitude pair
/// - a `<city>, <state>, <country>` string
/// - a postal code
#[derive(Debug, Clone)]
pub struct PlaceFinder {
    api: QueryApi,
}

impl PlaceFinder {
    pub fn new(endpoints: &EndpointsConfig) -> Result<Self, WeatherError> {
        Ok(Self {
            api: QueryApi::new(endpoints)?,
        })
    }

    /// Find `place_query`, returning every candidate the API sent back.
    ///
    /// A single upstream match yields a one-element vector.
    ///
    /// # Errors
    ///
    /// [`WeatherError::PlaceNotFound`] when nothing matched; network, API and
    /// parse failures otherwise.
    #[instrument(skip(self), level = "info")]
    pub async fn find(&self, place_query: &str) -> Result<Vec<GeoPosition>, WeatherError> {
        let query = build_query(QueryKind::Location, place_query, None, None);

        let results: PlaceResults = self
            .api
            .run(&query)
            .await?
            .ok_or_else(|| WeatherError::PlaceNotFound(place_query.to_string()))?;

        let resolved_at = Utc::now();
        let positions: Vec<GeoPosition> = results
            .place
            .into_vec()
            .into_iter()
            .map(|place| place_to_position(place, resolved_at))
            .collect();

        if positions.is_empty() {
            return Err(WeatherError::PlaceNotFound(place_query.to_string()));
        }

        tracing::debug!("Found {} candidate(s) for {:?}", positions.len(), place_query);
        Ok(positions)
    }

    /// Like [`find`](Self::find), keeping only the first candidate.
    pub async fn find_one(&self, place_query: &str) -> Result<GeoPosition, WeatherError> {
        self.find(place_query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::PlaceNotFound(place_query.to_string()))
    }
}

fn place_to_position(place: ApiPlace, resolved_at: DateTime<Utc>) -> GeoPosition {
    let info = PlaceInfo {
        id: place.woeid,
        country: Region {
            code: place.country.code,
            name: place.country.content,
        },
        region: Region {
            code: place.admin1.code,
            name: place.admin1.content,
        },
        county: place.admin2.map(|n| n.content),
        city: place.locality1.map(|n| n.content),
        suburb: place.locality2.map(|n| n.content),
    };

    GeoPosition::new(
        place.centroid.latitude,
        place.centroid.longitude,
        Some(info),
        resolved_at,
    )
}
