pub mod tracker;

pub use tracker::{
    stop_status_for, EmptyStopPolicy, MarkerStyle, StopProgressTracker, StopStatus, StopView,
};
