//! Date/time helpers shared by the inventory writer and the signer.
//!
//! The legacy Ruby CA renders inventory timestamps with the pattern
//! `YYY-MM-dd'T'HH:mm:ssz` — a three-`Y` year field that most formatting
//! libraries, including the Ruby one that originated it, simply render as
//! a four-digit year. We reproduce that observable output byte-for-byte
//! rather than the literal pattern: four-digit year, ISO-like layout, and
//! a `+HHMM`-style numeric offset in place of a timezone abbreviation.

use time::OffsetDateTime;

/// Certificate validity back-dating: tolerates mild clock skew between the
/// CA and agents.
pub const NOT_BEFORE_SKEW: time::Duration = time::Duration::days(1);

/// Formats `when` the way the legacy CA's inventory file does.
pub fn format_inventory_timestamp(when: OffsetDateTime) -> String {
    let offset = when.offset();
    let sign = if offset.whole_seconds() < 0 { '-' } else { '+' };
    let total_minutes = offset.whole_minutes().unsigned_abs();
    let (oh, om) = (total_minutes / 60, total_minutes % 60);

    format!(
        "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}{sign}{oh:02}{om:02}",
        year = when.year(),
        month = u8::from(when.month()),
        day = when.day(),
        hour = when.hour(),
        minute = when.minute(),
        second = when.second(),
    )
}
