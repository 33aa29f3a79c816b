//! Scripted HTTP double shared by the behavior suites.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use citypulse_core::{HttpClient, HttpError, HttpRequest, HttpResponse};

pub type Outcome = Result<HttpResponse, HttpError>;

pub const WEATHER_OK: &str = r#"{
    "main": {"temp": 28.0, "feels_like": 31.5, "humidity": 70, "pressure": 1008},
    "wind": {"speed": 3.6},
    "weather": [{"description": "haze", "icon": "50d"}],
    "sys": {"country": "IN"},
    "dt": 1709600000
}"#;

pub const GEOCODE_DELHI: &str = r#"{"results": [{
    "latitude": 28.65, "longitude": 77.23, "name": "Delhi",
    "country": "India", "admin1": "Delhi"
}]}"#;

pub const AIR_QUALITY_DELHI: &str = r#"{"current": {
    "us_aqi": 178, "pm2_5": 96.0, "pm10": 160.0, "ozone": 30.0,
    "nitrogen_dioxide": 41.0, "sulphur_dioxide": 12.0, "carbon_monoxide": 900.0, "dust": 4.0
}}"#;

pub const FLOW_DELHI: &str = r#"{"flowSegmentData": {
    "frc": "FRC2", "currentSpeed": 20, "freeFlowSpeed": 50,
    "currentTravelTime": 600, "freeFlowTravelTime": 300,
    "confidence": 0.92, "roadClosure": false
}}"#;

pub const INCIDENTS_THREE: &str = r#"{"incidents": [{"type": "Feature"}, {"type": "Feature"}, {"type": "Feature"}]}"#;

struct Route {
    pattern: String,
    outcomes: VecDeque<Outcome>,
    delay: Option<Duration>,
}

/// Answers each request from the first route whose pattern occurs in the URL.
///
/// A route plays its outcomes in order and then keeps repeating the last one.
/// Unmatched URLs get a 404.
#[derive(Default)]
pub struct ScriptedHttpClient {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, pattern: &str, outcomes: Vec<Outcome>) -> Self {
        self.push(pattern, outcomes, None)
    }

    pub fn json(self, pattern: &str, body: &str) -> Self {
        self.script(pattern, vec![Ok(HttpResponse::ok_json(body))])
    }

    pub fn fail(self, pattern: &str, error: HttpError) -> Self {
        self.script(pattern, vec![Err(error)])
    }

    pub fn status(self, pattern: &str, status: u16) -> Self {
        self.script(pattern, vec![Ok(HttpResponse::with_status(status, "scripted"))])
    }

    /// Answers after `delay`, measured on the tokio clock.
    pub fn delayed(self, pattern: &str, delay: Duration, outcome: Outcome) -> Self {
        self.push(pattern, vec![outcome], Some(delay))
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request log").clone()
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.requests()
            .iter()
            .filter(|url| url.contains(pattern))
            .count()
    }

    fn push(self, pattern: &str, outcomes: Vec<Outcome>, delay: Option<Duration>) -> Self {
        self.routes.lock().expect("routes").push(Route {
            pattern: pattern.to_owned(),
            outcomes: outcomes.into(),
            delay,
        });
        self
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let (outcome, delay) = {
            let mut routes = self.routes.lock().expect("routes");
            match routes
                .iter_mut()
                .find(|route| request.url.contains(route.pattern.as_str()))
            {
                Some(route) => {
                    let outcome = if route.outcomes.len() > 1 {
                        route.outcomes.pop_front()
                    } else {
                        route.outcomes.front().cloned()
                    };
                    (
                        outcome.unwrap_or_else(|| Ok(HttpResponse::with_status(404, "exhausted"))),
                        route.delay,
                    )
                }
                None => (Ok(HttpResponse::with_status(404, "no route")), None),
            }
        };
        self.requests.lock().expect("request log").push(request.url);

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            outcome
        })
    }
}
