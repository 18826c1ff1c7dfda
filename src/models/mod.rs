pub mod attendance;
pub mod route;
pub mod trip;
pub mod user;

use serde::{Deserialize, Deserializer};

pub use attendance::{AttendanceAck, MarkAttendanceRequest};
pub use route::{AttendanceStatus, Route, RouteStops, Stop, Student};
pub use trip::{
    clamp_progress, BusLocation, GeoPoint, NearestStop, TodayTrips, Trip, TripStatus, TripType,
};
pub use user::{AppRole, Bus, OtpSession, UserProfile};

/// Reads an explicit `null` the same as a missing key. The PHP backend passes
/// NULL columns through uncast.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
