//! Aggregation backend client.

use async_trait::async_trait;
use auroracast_core::{NetworkError, ReqwestErrorExt};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::aurora::{kp_description, visibility_probability};
use crate::types::{
    AuroraForecast, ForecastBundle, ForecastRequest, KpForecastEntry, Language, SummaryRequest,
    WeatherError,
};

const USER_AGENT: &str = "Auroracast/0.1.0";

/// Source of weather, aurora and summary data.
///
/// The sync routine only talks to this trait so tests can script responses.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn get_weather_forecast(
        &self,
        request: &ForecastRequest,
    ) -> Result<ForecastBundle, WeatherError>;

    async fn get_aurora_forecast(
        &self,
        latitude: f64,
        language: Language,
    ) -> Result<AuroraForecast, WeatherError>;

    async fn get_smart_summary(&self, request: &SummaryRequest) -> Result<String, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct AuroraResponse {
    #[serde(default)]
    error: Option<String>,
    current_kp: Option<f64>,
    current_description: Option<String>,
    visibility_probability: Option<f64>,
    max_forecast_kp: Option<f64>,
    max_visibility_probability: Option<f64>,
    best_viewing_time: Option<String>,
    best_viewing_kp: Option<f64>,
    #[serde(default)]
    forecast: Vec<KpForecastEntry>,
}

impl AuroraResponse {
    /// Fill gaps the backend leaves when NOAA data is partial.
    fn into_forecast(
        self,
        latitude: f64,
        language: Language,
    ) -> Result<AuroraForecast, WeatherError> {
        if let Some(err) = self.error {
            return Err(WeatherError::Api(err));
        }
        let current_kp = self
            .current_kp
            .ok_or_else(|| WeatherError::Parse("aurora response without current_kp".into()))?;

        let max_forecast_kp = self.max_forecast_kp.unwrap_or_else(|| {
            self.forecast
                .iter()
                .take(8)
                .map(|f| f.kp)
                .fold(current_kp, f64::max)
        });

        let percent = |p: Option<f64>, kp: f64| match p {
            Some(p) => p.round().clamp(0.0, 100.0) as u8,
            None => visibility_probability(kp, latitude),
        };

        Ok(AuroraForecast {
            current_description: self
                .current_description
                .unwrap_or_else(|| kp_description(current_kp, language).to_string()),
            visibility_probability: percent(self.visibility_probability, current_kp),
            max_visibility_probability: percent(self.max_visibility_probability, max_forecast_kp),
            best_viewing_kp: self.best_viewing_kp.unwrap_or(current_kp),
            best_viewing_time: self.best_viewing_time,
            current_kp,
            max_forecast_kp,
            forecast: self.forecast,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    summary: String,
}

/// HTTP client for the aggregation backend
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Arc<Client>,
    base_url: String,
}

impl WeatherClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<T, WeatherError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        self.handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, WeatherError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| WeatherError::Parse(format!("JSON parse error: {}", e)))
        } else if status.is_server_error() || status.as_u16() == 429 {
            let text = response.text().await.unwrap_or_default();
            Err(WeatherError::Network(NetworkError::ServerError {
                status: status.as_u16(),
                message: text,
            }))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(WeatherError::Api(format!("{}: {}", status, text)))
        }
    }
}

#[async_trait]
impl WeatherSource for WeatherClient {
    #[instrument(skip(self, request), level = "info", fields(days = request.days))]
    async fn get_weather_forecast(
        &self,
        request: &ForecastRequest,
    ) -> Result<ForecastBundle, WeatherError> {
        let body = serde_json::json!({
            "latitude": request.location.latitude,
            "longitude": request.location.longitude,
            "days": request.days,
            "language": request.language.code(),
            "tier": request.tier.code(),
            "confidence_bias": request.confidence_bias,
        });

        let bundle: ForecastBundle = self.post("/weather/coordinates", body).await?;
        tracing::debug!(
            "Forecast for {} from {} sources",
            bundle.location.name,
            bundle.sources.len()
        );
        Ok(bundle)
    }

    #[instrument(skip(self), level = "info")]
    async fn get_aurora_forecast(
        &self,
        latitude: f64,
        language: Language,
    ) -> Result<AuroraForecast, WeatherError> {
        let body = serde_json::json!({
            "latitude": latitude,
            "language": language.code(),
        });

        let response: AuroraResponse = self.post("/aurora", body).await?;
        response.into_forecast(latitude, language)
    }

    #[instrument(skip(self, request), level = "info")]
    async fn get_smart_summary(&self, request: &SummaryRequest) -> Result<String, WeatherError> {
        let body = serde_json::json!({
            "latitude": request.location.latitude,
            "longitude": request.location.longitude,
            "language": request.language.code(),
            "tier": request.tier.code(),
        });

        let response: SummaryResponse = self.post("/summary", body).await?;
        let summary = response.summary.trim().to_string();
        if summary.is_empty() {
            return Err(WeatherError::Parse("empty summary".into()));
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: serde_json::Value) -> AuroraResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_backend_error_body_is_api_error() {
        let r = response(serde_json::json!({
            "error": "NOAA unreachable",
            "current_kp": null,
            "visibility_probability": null
        }));
        assert!(matches!(
            r.into_forecast(50.0, Language::En),
            Err(WeatherError::Api(msg)) if msg.contains("NOAA")
        ));
    }

    #[test]
    fn test_missing_probability_is_backfilled() {
        let r = response(serde_json::json!({
            "current_kp": 6.0,
            "forecast": [
                {"time": "2024-01-02 21:00:00", "kp": 7.0, "scale": "G3"}
            ]
        }));
        let forecast = r.into_forecast(50.08, Language::En).unwrap();
        assert_eq!(forecast.visibility_probability, 50);
        assert_eq!(forecast.max_forecast_kp, 7.0);
        assert_eq!(forecast.max_visibility_probability, 75);
        assert_eq!(forecast.best_viewing_kp, 6.0);
        assert_eq!(forecast.current_description, "Moderate Storm (G2)");
    }

    #[test]
    fn test_backend_values_are_kept() {
        let r = response(serde_json::json!({
            "current_kp": 5.2,
            "current_description": "Slabá bouře (G1)",
            "visibility_probability": 10,
            "max_forecast_kp": 5.7,
            "max_visibility_probability": 18,
            "best_viewing_time": "2024-01-02 21:00:00",
            "best_viewing_kp": 5.7,
            "forecast": []
        }));
        let forecast = r.into_forecast(50.08, Language::Cs).unwrap();
        assert_eq!(forecast.visibility_probability, 10);
        assert_eq!(forecast.max_visibility_probability, 18);
        assert_eq!(forecast.best_viewing_time.as_deref(), Some("2024-01-02 21:00:00"));
        assert_eq!(forecast.current_description, "Slabá bouře (G1)");
    }

    #[test]
    fn test_client_trims_base_url() {
        let client = WeatherClient::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url, "http://localhost:8000");
    }
}
