use std::process::ExitCode;

use clap::{Parser, Subcommand};
use skycast_core::{AppError, Config, Units};
use skycast_weather::{
    DailyForecast, ForecastResult, GeoPosition, GeolocationService, LocationError, PlaceFinder, WeatherClient,
    WeatherError,
};

#[derive(Debug, Parser)]
#[command(name = "skycast", version, about = "Weather forecasts from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show current conditions and the coming week
    Forecast {
        /// Place name, postal code or `latitude,longitude`
        place: Option<String>,

        /// Forecast for the current location instead of a named place
        #[arg(long, conflicts_with = "place")]
        here: bool,

        /// Unit system: c or f
        #[arg(short, long)]
        units: Option<Units>,
    },
    /// Show where the location services think you are
    Locate,
    /// Look a place up
    Place {
        /// Place name, postal code or `latitude,longitude`
        query: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = skycast_core::init() {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let (config, _) = Config::load_validated()?;

    match cli.command {
        Command::Forecast { place, here, units } => {
            let units = units.unwrap_or(config.weather.units);
            let client = WeatherClient::new(&config.endpoints)?;

            let forecast = if here {
                let position = locate(&config).await?;
                client
                    .forecast_for_location(position.latitude(), position.longitude(), Some(units))
                    .await?
            } else {
                let place = place.unwrap_or_else(|| config.weather.default_location.clone());
                client.forecast_for(&place, Some(units)).await?
            };

            print_forecast(&forecast);
        }
        Command::Locate => {
            let position = locate(&config).await?;
            let finder = PlaceFinder::new(&config.endpoints)?;

            match finder.find_one(&position.coordinate_query()).await {
                Ok(place) => println!("{place}"),
                Err(e) => tracing::warn!("Could not name the current position: {}", e),
            }
            println!("{:.4}, {:.4}", position.latitude(), position.longitude());
        }
        Command::Place { query } => {
            let finder = PlaceFinder::new(&config.endpoints)?;
            for place in finder.find(&query).await? {
                let id = place.info().map(|i| i.id.as_str()).unwrap_or("-");
                println!(
                    "{place} ({:.4}, {:.4}) [{id}]",
                    place.latitude(),
                    place.longitude()
                );
            }
        }
    }

    Ok(())
}

/// Current position, retrying once on the IP locator when the device
/// provider refuses access.
async fn locate(config: &Config) -> Result<GeoPosition, WeatherError> {
    let service = GeolocationService::from_config(config).await?;

    match service.current().await {
        Err(LocationError::PermissionDenied) => {
            eprintln!("{}", LocationError::PermissionDenied.user_message());
            Ok(service.current().await?)
        }
        other => Ok(other?),
    }
}

fn print_forecast(forecast: &ForecastResult) {
    let degrees = &forecast.units.temperature;
    let location = &forecast.location;
    let now = &forecast.today.condition;

    let place: Vec<&str> = [&location.city, &location.region, &location.country]
        .into_iter()
        .map(String::as_str)
        .filter(|part| !part.is_empty())
        .collect();
    println!("{}", place.join(", "));
    println!(
        "Now: {}°{degrees} {} (high {}°, low {}°)",
        now.temperature, now.text, now.high, now.low
    );

    let wind = &forecast.today.wind;
    if let Some(speed) = wind.speed {
        println!("Wind: {speed} {}", forecast.units.speed);
    }
    if let Some(humidity) = forecast.today.atmosphere.humidity {
        println!("Humidity: {humidity}%");
    }

    if !forecast.week.is_empty() {
        println!();
    }
    for day in &forecast.week {
        println!(
            "{:<12}{:>5}°{:>5}°  {}",
            day_label(day),
            day.high,
            day.low,
            day.text
        );
    }
}

/// `Tue 20 Oct` when the date parses, otherwise the day and date as sent.
fn day_label(day: &DailyForecast) -> String {
    match day.calendar_date() {
        Some(date) => date.format("%a %d %b").to_string(),
        None => format!("{} {}", day.day, day.date),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_forecast_options() {
        let cli = Cli::try_parse_from(["skycast", "forecast", "Paris", "--units", "f"]).unwrap();
        match cli.command {
            Command::Forecast { place, here, units } => {
                assert_eq!(place.as_deref(), Some("Paris"));
                assert!(!here);
                assert_eq!(units, Some(Units::Fahrenheit));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_here_conflicts_with_place() {
        assert!(Cli::try_parse_from(["skycast", "forecast", "Paris", "--here"]).is_err());
    }

    #[test]
    fn test_rejects_unknown_units() {
        assert!(Cli::try_parse_from(["skycast", "forecast", "--units", "kelvin"]).is_err());
    }

    fn day(date: &str) -> DailyForecast {
        DailyForecast {
            code: 32,
            date: date.into(),
            day: "Tue".into(),
            high: 24.0,
            low: 15.0,
            text: "Sunny".into(),
        }
    }

    #[test]
    fn test_day_label_uses_calendar_date() {
        assert_eq!(day_label(&day("20 Oct 2026")), "Tue 20 Oct");
        assert_eq!(day_label(&day("tomorrow")), "Tue tomorrow");
    }

    #[test]
    fn test_errors_report_user_messages() {
        let err: AppError = WeatherError::PlaceNotFound("Atlantis".into()).into();
        assert_eq!(err.user_message(), "Location not found. Check and try again.");

        let err: AppError = WeatherError::Location(LocationError::Timeout).into();
        assert_eq!(err.user_message(), "Sorry! we ran out of time localizing you.");
    }
}
