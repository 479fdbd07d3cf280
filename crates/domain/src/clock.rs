//! Entity timestamps.

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at microsecond precision, the resolution of a PostgreSQL
/// `TIMESTAMPTZ`, so a stored entity reloads equal to the one saved.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
