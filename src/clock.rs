//! Wall-clock access with a test-only offset.

use crate::types::MillisecondsSince1970;

/// The current wall-clock time in milliseconds since the UNIX epoch.
pub(crate) fn now_ms() -> MillisecondsSince1970 {
    chrono::Utc::now().timestamp_millis().max(0) as MillisecondsSince1970
}

/// `now_ms` shifted by a signed offset, saturating at zero.
///
/// The offset is only ever non-zero in tests, which use it to travel in time
/// without sleeping.
pub(crate) fn offset_now_ms(offset_ms: i64) -> MillisecondsSince1970 {
    let now = now_ms() as i64;
    now.saturating_add(offset_ms).max(0) as MillisecondsSince1970
}
