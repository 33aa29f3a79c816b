use citypulse_core::Aggregator;

use crate::cli::{OutputFormat, SnapshotArgs};
use crate::error::CliError;
use crate::output;

pub async fn run(
    args: &SnapshotArgs,
    aggregator: &Aggregator,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    println!("{}", render(args, aggregator, format, pretty).await?.trim_end());
    Ok(())
}

async fn render(
    args: &SnapshotArgs,
    aggregator: &Aggregator,
    format: OutputFormat,
    pretty: bool,
) -> Result<String, CliError> {
    let snapshot = aggregator.aggregate(&args.city_name()).await?;
    output::render_snapshot(&snapshot, format, pretty)
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;

    use citypulse_core::{
        CityPulseConfig, HttpClient, HttpError, HttpRequest, HttpResponse,
    };

    use super::*;

    /// Weather answers, every other provider is missing.
    struct WeatherOnly {
        status: u16,
    }

    impl HttpClient for WeatherOnly {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            let response = if request.url.contains("/weather?") {
                HttpResponse::with_status(
                    self.status,
                    r#"{"main": {"temp": 19.5, "humidity": 55}, "weather": [{"description": "mist"}]}"#,
                )
            } else {
                HttpResponse::with_status(404, "not found")
            };
            Box::pin(async move { Ok(response) })
        }
    }

    fn aggregator(status: u16) -> Aggregator {
        Aggregator::builder(CityPulseConfig::default())
            .with_http_client(Arc::new(WeatherOnly { status }))
            .with_seed(3)
            .build()
            .expect("built-in catalog")
    }

    fn args(words: &[&str]) -> SnapshotArgs {
        SnapshotArgs {
            city: words.iter().map(|word| (*word).to_owned()).collect(),
        }
    }

    #[tokio::test]
    async fn renders_snapshot_for_multi_word_city() {
        let rendered = render(&args(&["New", "Delhi"]), &aggregator(200), OutputFormat::Json, false)
            .await
            .expect("weather is up");
        let value: serde_json::Value = serde_json::from_str(&rendered).expect("json");

        assert_eq!(value["city_name"], "New Delhi");
        assert_eq!(value["weather"]["condition"], "mist");
        assert_eq!(value["energy"]["region"], "Delhi");
    }

    #[tokio::test]
    async fn weather_outage_maps_to_exit_code_three() {
        let error = render(&args(&["Pune"]), &aggregator(401), OutputFormat::Table, false)
            .await
            .expect_err("weather is down");

        assert_eq!(error.exit_code(), 3);
    }
}
