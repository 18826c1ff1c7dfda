pub mod controller;

pub use controller::RouteScreen;
