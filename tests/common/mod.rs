#![allow(dead_code)]

use std::sync::Arc;

use busbeacon_lib::{
    api::InMemoryBackend,
    events::ScreenEvent,
    models::{BusLocation, Stop, Student, Trip, TripStatus},
    screen::RouteScreen,
    settings::AppConfig,
};
use tokio::sync::broadcast::Receiver;

pub const ROUTE_ID: &str = "route-7";
pub const TRIP_ID: &str = "trip-7-am";

/// One stop per entry, with that many pending students. Student ids are
/// `s{stop}-{n}`.
pub fn stops(students_per_stop: &[usize]) -> Vec<Stop> {
    students_per_stop
        .iter()
        .enumerate()
        .map(|(idx, count)| Stop {
            id: format!("stop-{idx}"),
            route_id: ROUTE_ID.into(),
            name: format!("Stop {}", idx + 1),
            order: idx as i64 + 1,
            students: (0..*count)
                .map(|n| Student {
                    id: format!("s{idx}-{n}"),
                    name: format!("Student {idx}.{n}"),
                    stop_id: format!("stop-{idx}"),
                    ..Default::default()
                })
                .collect(),
            students_count: *count,
            ..Default::default()
        })
        .collect()
}

/// Backend with an active trip and the bus at `current_stop_index`.
pub fn backend(
    students_per_stop: &[usize],
    current_stop_index: i64,
    progress: f64,
) -> Arc<InMemoryBackend> {
    Arc::new(
        InMemoryBackend::new()
            .with_route(ROUTE_ID, stops(students_per_stop))
            .with_trips(vec![Trip {
                id: TRIP_ID.into(),
                status: TripStatus::Active,
                current_stop_index,
                ..Default::default()
            }])
            .with_location(
                ROUTE_ID,
                BusLocation {
                    trip_id: Some(TRIP_ID.into()),
                    is_live: true,
                    current_stop_index,
                    progress,
                    ..Default::default()
                },
            ),
    )
}

pub fn screen(backend: Arc<InMemoryBackend>) -> RouteScreen<InMemoryBackend> {
    RouteScreen::new(backend, ROUTE_ID, &AppConfig::default())
}

/// Everything published so far.
pub fn drain(events: &mut Receiver<ScreenEvent>) -> Vec<ScreenEvent> {
    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    received
}
