pub mod calendar;
pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use calendar::GameCalendar;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{load_config, CalendarConfig};
pub use error::{CalendarError, CalendarResult};
pub use types::*;
