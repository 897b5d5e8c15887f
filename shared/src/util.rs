//! Utility functions: clock, IDs and business numbers

use crate::models::CardKind;

/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a Snowflake-style i64 for use as resource ID.
///
/// Layout (53 bits, fits in JavaScript's Number.MAX_SAFE_INTEGER):
///   - 41 bits: milliseconds since 2024-01-01 UTC (~69 years)
///   - 12 bits: random (4096 values per ms)
pub fn snowflake_id() -> i64 {
    use rand::Rng;
    // Custom epoch: 2024-01-01 00:00:00 UTC
    const EPOCH_MS: i64 = 1_704_067_200_000;
    let now = now_millis();
    let ts = (now - EPOCH_MS) & 0x1FF_FFFF_FFFF; // 41 bits
    let rand_bits: i64 = rand::thread_rng().gen_range(0..0x1000); // 12 bits
    (ts << 12) | rand_bits
}

/// Generate a booking business number: `BKyyyymmdd-XXXXXX`
pub fn booking_no(now_ms: i64) -> String {
    format!("BK{}-{:06}", date_part(now_ms), random_suffix())
}

/// Generate a card business number: `<prefix>yyyymmdd-XXXXXX`
pub fn card_number(kind: CardKind, now_ms: i64) -> String {
    format!("{}{}-{:06}", kind.number_prefix(), date_part(now_ms), random_suffix())
}

fn date_part(now_ms: i64) -> String {
    use chrono::TimeZone;
    chrono::Utc
        .timestamp_millis_opt(now_ms)
        .single()
        .map(|dt| dt.format("%Y%m%d").to_string())
        .unwrap_or_else(|| "00000000".to_string())
}

fn random_suffix() -> u32 {
    use rand::Rng;
    rand::thread_rng().gen_range(0..1_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_monotonic_prefix() {
        let a = snowflake_id();
        let b = snowflake_id();
        // Same-millisecond IDs share the timestamp prefix; later IDs never sort earlier
        assert!(b >> 12 >= a >> 12);
    }

    #[test]
    fn test_booking_no_shape() {
        // 2025-06-01 00:00:00 UTC
        let no = booking_no(1_748_736_000_000);
        assert!(no.starts_with("BK20250601-"));
        assert_eq!(no.len(), "BK20250601-".len() + 6);
    }

    #[test]
    fn test_card_number_prefixes() {
        let ms = 1_748_736_000_000;
        assert!(card_number(CardKind::Membership, ms).starts_with("MC20250601-"));
        assert!(card_number(CardKind::PersonalTraining, ms).starts_with("PT20250601-"));
        assert!(card_number(CardKind::GroupClass, ms).starts_with("GC20250601-"));
    }
}
