use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::{
    auth::TokenProvider,
    models::{
        AttendanceAck, BusLocation, MarkAttendanceRequest, OtpSession, RouteStops, Stop,
        TodayTrips,
    },
    settings::AppConfig,
};

use super::{ApiError, ApiResponse, AuthApi, TransportApi};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// REST client for the BusBeacon PHP backend.
///
/// The bearer token is pulled from the injected `TokenProvider` on every
/// request, so a sign-in or sign-out takes effect without rebuilding the client.
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl RestClient {
    pub fn new(config: &AppConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<ApiResponse<T>, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self.http.request(method.clone(), &url);

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = self.tokens.token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        log_debug!("{method} {url}");
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        // The backend answers most errors with an envelope and a 4xx code, so
        // the body is tried first and the status only reported when it is not
        // readable.
        match serde_json::from_slice::<ApiResponse<T>>(&bytes) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => {
                log_warn!("{method} {endpoint} failed with HTTP {}", status.as_u16());
                Err(ApiError::Status(status.as_u16()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send(Method::GET, endpoint, query, None).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send(Method::POST, endpoint, &[], body).await
    }
}

impl TransportApi for RestClient {
    async fn route_stops(&self, route_id: &str) -> Result<Vec<Stop>, ApiError> {
        let payload: RouteStops = self
            .get(&format!("/routes/{route_id}/students"), &[])
            .await?
            .into_result()?;
        Ok(payload.stops)
    }

    async fn today_trips(&self, bus_id: Option<&str>) -> Result<TodayTrips, ApiError> {
        let query: Vec<(&str, String)> = bus_id
            .map(|id| vec![("busId", id.to_string())])
            .unwrap_or_default();
        self.get("/trips/today", &query).await?.into_result()
    }

    async fn bus_location(&self, route_id: &str) -> Result<BusLocation, ApiError> {
        self.get(&format!("/routes/{route_id}/bus-location"), &[])
            .await?
            .into_result()
    }

    async fn mark_attendance(
        &self,
        request: MarkAttendanceRequest,
    ) -> Result<AttendanceAck, ApiError> {
        let body = serde_json::to_value(&request)?;
        self.post("/attendance/mark", Some(body))
            .await?
            .into_result()
    }
}

impl AuthApi for RestClient {
    async fn send_otp(&self, phone_number: &str) -> Result<String, ApiError> {
        self.post::<Value>("/auth/send-otp", Some(json!({ "phoneNumber": phone_number })))
            .await?
            .into_message()
    }

    async fn verify_otp(&self, phone_number: &str, otp: &str) -> Result<OtpSession, ApiError> {
        self.post(
            "/auth/verify-otp",
            Some(json!({ "phoneNumber": phone_number, "otp": otp })),
        )
        .await?
        .into_result()
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.post::<Value>("/auth/logout", None)
            .await?
            .into_message()
            .map(|_| ())
    }
}
