use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::builder;
use crate::commands::executable::Executable;
use crate::commands::fakes::Fakes;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Returns the current unix time in seconds, and the microseconds elapsed since UTC midnight,
/// as a two element array of bulk strings.
#[derive(Debug, PartialEq)]
pub struct Time;

impl Time {
    fn reply(since_epoch: Duration) -> String {
        let seconds = since_epoch.as_secs();
        let micros_of_day =
            (seconds % SECONDS_PER_DAY) * 1_000_000 + u64::from(since_epoch.subsec_micros());

        builder::strings(&[seconds.to_string(), micros_of_day.to_string()])
    }
}

impl Executable for Time {
    fn exec(self, _fakes: &Fakes) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        Self::reply(now)
    }
}
