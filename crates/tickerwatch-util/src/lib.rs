pub mod clock;
pub mod fs;
pub mod storage;

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::fs::FileStorage;
pub use crate::storage::{MemoryStorage, Storage};
