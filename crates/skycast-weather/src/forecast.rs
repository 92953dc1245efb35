//! Current conditions and weekly forecast.

use chrono::{DateTime, Utc};
use skycast_core::{EndpointsConfig, Units};
use tracing::instrument;

use crate::api::{ApiChannel, ApiDay, ChannelResults, QueryApi};
use crate::position::coordinate_literal;
use crate::query::{build_query, QueryKind};
use crate::types::{
    Atmosphere, DailyForecast, ForecastLocation, ForecastResult, Today, TodayCondition,
    UnitSystem, WeatherError, Wind,
};

/// Fetches forecasts from the weather data source.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    api: QueryApi,
}

impl WeatherClient {
    pub fn new(endpoints: &EndpointsConfig) -> Result<Self, WeatherError> {
        Ok(Self {
            api: QueryApi::new(endpoints)?,
        })
    }

    /// Forecast for a place name, postal code or `latitude,longitude` string.
    ///
    /// # Errors
    ///
    /// Always [`WeatherError::ForecastUnavailable`], carrying the upstream cause.
    #[instrument(skip(self), level = "info")]
    pub async fn forecast_for(
        &self,
        place: &str,
        units: Option<Units>,
    ) -> Result<ForecastResult, WeatherError> {
        let query = build_query(QueryKind::Weather, place, None, units);

        self.fetch(place, &query).await.map_err(|e| {
            tracing::warn!("Forecast for {:?} unavailable: {}", place, e);
            WeatherError::forecast_unavailable(e)
        })
    }

    /// Forecast for an explicit coordinate pair.
    ///
    /// # Errors
    ///
    /// Always [`WeatherError::ForecastUnavailable`], carrying the upstream cause.
    pub async fn forecast_for_location(
        &self,
        latitude: f64,
        longitude: f64,
        units: Option<Units>,
    ) -> Result<ForecastResult, WeatherError> {
        let place = format!(
            "{},{}",
            coordinate_literal(latitude),
            coordinate_literal(longitude)
        );
        self.forecast_for(&place, units).await
    }

    async fn fetch(&self, place: &str, query: &str) -> Result<ForecastResult, WeatherError> {
        let results: ChannelResults = self
            .api
            .run(query)
            .await?
            .ok_or_else(|| WeatherError::PlaceNotFound(place.to_string()))?;

        ForecastResult::from_channel(results.channel, Utc::now())
    }
}

impl From<ApiDay> for DailyForecast {
    fn from(day: ApiDay) -> Self {
        Self {
            code: day.code,
            date: day.date,
            day: day.day,
            high: day.high,
            low: day.low,
            text: day.text,
        }
    }
}

impl ForecastResult {
    /// Normalize a forecast channel. The first forecast entry is today: its
    /// range is folded into `today.condition` and it is left out of `week`.
    pub(crate) fn from_channel(
        channel: ApiChannel,
        resolved_at: DateTime<Utc>,
    ) -> Result<Self, WeatherError> {
        let ApiChannel {
            units,
            location,
            wind,
            atmosphere,
            item,
        } = channel;

        let mut days = item.forecast.into_iter();
        let today = days
            .next()
            .ok_or_else(|| WeatherError::Parse("forecast sequence is empty".to_string()))?;

        Ok(Self {
            date: resolved_at,
            units: UnitSystem {
                distance: units.distance,
                pressure: units.pressure,
                speed: units.speed,
                temperature: units.temperature,
            },
            location: ForecastLocation {
                city: location.city,
                region: location.region.trim().to_string(),
                country: location.country,
                latitude: item.lat,
                longitude: item.long,
            },
            today: Today {
                wind: Wind {
                    chill: wind.chill,
                    direction: wind.direction,
                    speed: wind.speed,
                },
                atmosphere: Atmosphere {
                    humidity: atmosphere.humidity,
                    pressure: atmosphere.pressure,
                    rising: atmosphere.rising,
                    visibility: atmosphere.visibility,
                },
                condition: TodayCondition {
                    code: item.condition.code,
                    date: item.condition.date,
                    temperature: item.condition.temp,
                    text: item.condition.text,
                    high: today.high,
                    low: today.low,
                },
            },
            week: days.map(DailyForecast::from).collect(),
        })
    }
}
