use chrono::{DateTime, Utc};
use mongodb::bson::DateTime as BsonDateTime;

pub fn chrono_to_bson(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

/// Whole days until `target`, rounded up; 0 once `target` has passed.
pub fn days_until(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = target.signed_duration_since(now).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;
    (millis + MS_PER_DAY - 1) / MS_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn bson_conversion_keeps_millis() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 4, 5, 6, 7).unwrap() + Duration::milliseconds(89);
        assert_eq!(chrono_to_bson(dt).timestamp_millis(), dt.timestamp_millis());
    }

    #[test]
    fn days_until_rounds_up_and_floors_at_zero() {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();
        assert_eq!(days_until(now - Duration::hours(1), now), 0);
        assert_eq!(days_until(now, now), 0);
        assert_eq!(days_until(now + Duration::minutes(1), now), 1);
        assert_eq!(days_until(now + Duration::days(1), now), 1);
        assert_eq!(days_until(now + Duration::days(2) + Duration::seconds(1), now), 3);
    }
}
