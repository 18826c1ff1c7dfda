mod common;

use std::time::Duration;

use busbeacon_lib::{
    api::memory::FailurePlan,
    attendance::WriteError,
    events::{NoticeSeverity, ScreenEvent},
    models::AttendanceStatus,
    progress::{MarkerStyle, StopStatus},
    sync::PollPolicy,
};

use common::{backend, drain, screen};

fn blocking_notices(events: &[ScreenEvent]) -> usize {
    events
        .iter()
        .filter(|event| {
            matches!(
                event,
                ScreenEvent::Notice {
                    severity: NoticeSeverity::Blocking,
                    ..
                }
            )
        })
        .count()
}

#[tokio::test]
async fn fresh_route_starts_at_first_stop() {
    let screen = screen(backend(&[2, 1, 3, 1, 2], 0, 0.0));

    assert!(screen.focus().await.unwrap());

    let views = screen.stop_views().await;
    let statuses: Vec<StopStatus> = views.iter().map(|view| view.status).collect();
    assert_eq!(
        statuses,
        vec![
            StopStatus::Current,
            StopStatus::Pending,
            StopStatus::Pending,
            StopStatus::Pending,
            StopStatus::Pending,
        ]
    );
    assert!(views.iter().all(|view| !view.fully_marked));
    assert_eq!(views[0].marker, MarkerStyle::CurrentIncomplete);

    let snapshot = screen.snapshot().await.unwrap();
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.active_trip_id.as_deref(), Some(common::TRIP_ID));
    assert_eq!(snapshot.student_count(), 9);
}

#[tokio::test]
async fn marking_every_student_completes_current_stop_locally() {
    let backend = backend(&[3, 2], 0, 0.5);
    let screen = screen(backend.clone());
    screen.focus().await.unwrap();

    // Writes are rejected, so only the local overlay can complete the stop
    backend.set_failures(FailurePlan {
        writes: Some("offline".into()),
        ..Default::default()
    });

    for n in 0..2 {
        screen
            .mark_attendance(&format!("s0-{n}"), AttendanceStatus::Present)
            .await
            .unwrap();
    }
    assert_eq!(screen.stop_views().await[0].marker, MarkerStyle::CurrentIncomplete);

    screen
        .mark_attendance("s0-2", AttendanceStatus::Absent)
        .await
        .unwrap();

    let views = screen.stop_views().await;
    assert_eq!(views[0].marker, MarkerStyle::CurrentComplete);
    assert_eq!(views[0].marked_count, 3);
    assert_eq!(views[1].marker, MarkerStyle::NotReached);
    assert_eq!(backend.server_status("s0-2"), Some(AttendanceStatus::Pending));
}

#[tokio::test]
async fn failed_stops_fetch_surfaces_blocking_notice() {
    let backend = backend(&[1, 1], 0, 0.0);
    backend.set_failures(FailurePlan {
        stops: Some("Route not found".into()),
        ..Default::default()
    });
    let screen = screen(backend);
    let mut events = screen.subscribe();

    assert!(!screen.focus().await.unwrap());

    let received = drain(&mut events);
    assert_eq!(blocking_notices(&received), 1);
    assert_eq!(
        received.last(),
        Some(&ScreenEvent::Loading {
            is_loading: false,
            is_refreshing: false,
        })
    );

    let snapshot = screen.snapshot().await.unwrap();
    assert!(!snapshot.is_loading);
    assert!(snapshot.stops.is_empty());
    assert!(snapshot.has_active_trip);
    assert!(screen.stop_views().await.is_empty());
}

#[tokio::test]
async fn server_truth_replaces_local_mark_on_next_load() {
    let backend = backend(&[2], 0, 0.0);
    let screen = screen(backend.clone());
    screen.focus().await.unwrap();

    let pending = screen
        .mark_attendance("s0-0", AttendanceStatus::Absent)
        .await
        .unwrap();
    assert!(pending.settled().await);
    assert_eq!(backend.server_status("s0-0"), Some(AttendanceStatus::Absent));

    // Another device corrects the mark
    backend.set_server_status("s0-0", AttendanceStatus::Present);
    assert!(screen.refresh().await.unwrap());

    let snapshot = screen.snapshot().await.unwrap();
    assert_eq!(snapshot.attendance_of("s0-0"), AttendanceStatus::Present);
}

#[tokio::test]
async fn silent_failure_keeps_previous_snapshot() {
    let backend = backend(&[2, 1], 1, 0.3);
    let screen = screen(backend.clone());
    screen.focus().await.unwrap();
    screen
        .mark_attendance("s1-0", AttendanceStatus::HalfDay)
        .await
        .unwrap()
        .settled()
        .await;
    let before = screen.snapshot().await.unwrap();

    backend.set_failures(FailurePlan {
        stops: Some("timeout".into()),
        trips: Some("timeout".into()),
        tracking: Some("timeout".into()),
        writes: None,
    });
    let mut events = screen.subscribe();
    assert!(!screen.refresh().await.unwrap());

    let after = screen.snapshot().await.unwrap();
    assert_eq!(after.stops, before.stops);
    assert_eq!(after.attendance, before.attendance);
    assert_eq!(after.active_trip_id, before.active_trip_id);
    assert_eq!(after.current_stop_index, 1);
    assert_eq!(after.progress, 0.3);
    assert_eq!(after.last_synced_at, before.last_synced_at);
    assert_eq!(blocking_notices(&drain(&mut events)), 0);
}

#[tokio::test]
async fn refresh_toggles_refreshing_flag() {
    let screen = screen(backend(&[1], 0, 0.0));
    screen.focus().await.unwrap();
    let mut events = screen.subscribe();

    assert!(screen.refresh().await.unwrap());

    let loading: Vec<ScreenEvent> = drain(&mut events)
        .into_iter()
        .filter(|event| matches!(event, ScreenEvent::Loading { .. }))
        .collect();
    assert_eq!(
        loading,
        vec![
            ScreenEvent::Loading {
                is_loading: false,
                is_refreshing: true,
            },
            ScreenEvent::Loading {
                is_loading: false,
                is_refreshing: false,
            },
        ]
    );
    assert!(!screen.snapshot().await.unwrap().is_refreshing);
}

#[tokio::test(start_paused = true)]
async fn unfocus_stops_polling_and_discards_snapshot() {
    let backend = backend(&[1, 1], 0, 0.0);
    let screen =
        screen(backend.clone()).with_poll_policy(PollPolicy::fixed(Duration::from_secs(10)));

    screen.focus().await.unwrap();
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(backend.call_counts().stops, 3);

    screen.unfocus().await.unwrap();
    assert!(!screen.is_focused().await);
    assert!(screen.snapshot().await.is_none());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(backend.call_counts().stops, 3);
}

#[tokio::test]
async fn refocus_starts_from_a_fresh_snapshot() {
    let backend = backend(&[1], 0, 0.0);
    let screen = screen(backend.clone());
    screen.focus().await.unwrap();
    assert!(screen.focus().await.is_err());

    backend.set_failures(FailurePlan {
        writes: Some("offline".into()),
        ..Default::default()
    });
    screen
        .mark_attendance("s0-0", AttendanceStatus::Present)
        .await
        .unwrap();
    screen.unfocus().await.unwrap();

    assert_eq!(
        screen
            .mark_attendance("s0-0", AttendanceStatus::Present)
            .await
            .err(),
        Some(WriteError::NotFocused)
    );

    // The rejected local mark does not survive the lost focus
    screen.focus().await.unwrap();
    let snapshot = screen.snapshot().await.unwrap();
    assert_eq!(snapshot.attendance_of("s0-0"), AttendanceStatus::Pending);
}

#[tokio::test]
async fn finished_route_marks_every_stop_completed() {
    let screen = screen(backend(&[1, 1, 1], 3, 0.0));
    screen.focus().await.unwrap();

    let views = screen.stop_views().await;
    assert!(views.iter().all(|view| view.status == StopStatus::Completed));
    assert!(views.iter().all(|view| view.marker == MarkerStyle::ReachedIncomplete));
    assert_eq!(views[0].connector_fill, Some(1.0));
    assert_eq!(views[2].connector_fill, None);
}
