use chrono::{DateTime, Local, TimeZone};

/// Format used in backup file names: `YYYYMMDD-HHMMSS`, second precision.
pub const BACKUP_STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Render `time` as a backup stamp.
///
/// Takes any timezone so callers (and tests) can pin the value; the run
/// itself always passes [`Local::now`].
pub fn backup_stamp<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format(BACKUP_STAMP_FORMAT).to_string()
}

pub fn now_stamp() -> String {
    backup_stamp(&Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn stamp_has_second_precision() {
        let time = Utc.with_ymd_and_hms(2025, 3, 7, 9, 4, 5).unwrap();
        assert_eq!(backup_stamp(&time), "20250307-090405");
    }

    #[test]
    fn now_stamp_is_fifteen_chars() {
        let stamp = now_stamp();
        assert_eq!(stamp.len(), 15);
        assert_eq!(stamp.as_bytes()[8], b'-');
    }
}
