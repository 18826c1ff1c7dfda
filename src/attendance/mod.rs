pub mod writer;

pub use writer::{OptimisticAttendanceWriter, PendingWrite, WriteError};
