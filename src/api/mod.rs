//! Backend contract for the route screen.
//!
//! `TransportApi` is the seam the sync and attendance components are generic
//! over. `RestClient` talks to the PHP backend; `InMemoryBackend` serves the
//! same contract from memory for offline demos and tests.

pub mod client;
pub mod error;
pub mod memory;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::models::{
    AttendanceAck, BusLocation, MarkAttendanceRequest, OtpSession, Stop, TodayTrips,
};

pub use client::RestClient;
pub use error::ApiError;
pub use memory::InMemoryBackend;

/// Uniform `{success, message, data}` envelope every endpoint responds with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// `success=false` and a missing payload are both failures of the call.
    pub fn into_result(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::backend(self.message));
        }
        self.data.ok_or(ApiError::MissingPayload)
    }

    /// For endpoints whose payload is irrelevant (logout, OTP dispatch).
    pub fn into_message(self) -> Result<String, ApiError> {
        if self.success {
            Ok(self.message)
        } else {
            Err(ApiError::backend(self.message))
        }
    }
}

/// Calls the route screen depends on.
pub trait TransportApi: Send + Sync + 'static {
    fn route_stops(
        &self,
        route_id: &str,
    ) -> impl Future<Output = Result<Vec<Stop>, ApiError>> + Send;

    fn today_trips(
        &self,
        bus_id: Option<&str>,
    ) -> impl Future<Output = Result<TodayTrips, ApiError>> + Send;

    fn bus_location(
        &self,
        route_id: &str,
    ) -> impl Future<Output = Result<BusLocation, ApiError>> + Send;

    fn mark_attendance(
        &self,
        request: MarkAttendanceRequest,
    ) -> impl Future<Output = Result<AttendanceAck, ApiError>> + Send;
}

/// Phone/OTP sign-in calls.
pub trait AuthApi: Send + Sync + 'static {
    fn send_otp(&self, phone_number: &str)
        -> impl Future<Output = Result<String, ApiError>> + Send;

    fn verify_otp(
        &self,
        phone_number: &str,
        otp: &str,
    ) -> impl Future<Output = Result<OtpSession, ApiError>> + Send;

    fn logout(&self) -> impl Future<Output = Result<(), ApiError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_failure_maps_to_backend_error() {
        let response: ApiResponse<TodayTrips> =
            serde_json::from_str(r#"{"success":false,"message":"Unauthorized","data":null}"#)
                .unwrap();
        match response.into_result() {
            Err(ApiError::Backend { message }) => assert_eq!(message, "Unauthorized"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn envelope_without_payload_is_an_error() {
        let response: ApiResponse<TodayTrips> =
            serde_json::from_str(r#"{"success":true,"message":"ok"}"#).unwrap();
        assert!(matches!(response.into_result(), Err(ApiError::MissingPayload)));
    }

    #[test]
    fn envelope_with_payload_unwraps() {
        let response: ApiResponse<BusLocation> = serde_json::from_str(
            r#"{
                "success": true,
                "message": "ok",
                "data": {"isLive": true, "currentStopIndex": 2, "progress": 0.4}
            }"#,
        )
        .unwrap();
        let location = response.into_result().unwrap();
        assert!(location.is_live);
        assert_eq!(location.current_stop_index, 2);
    }
}
