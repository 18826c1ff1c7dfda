pub mod controller;
pub mod poller;
pub mod state;

pub use controller::TripAttendanceSync;
pub use poller::{PollPolicy, Poller};
pub use state::{RouteSnapshot, SharedSnapshot};
