use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Human-readable booking number: "BK" + trailing timestamp digits + random
/// uppercase suffix. Uniqueness is enforced by the unique column; the random
/// tail keeps same-millisecond collisions out of normal operation.
pub fn generate_booking_number() -> String {
    let millis = Utc::now().timestamp_millis().to_string();
    let tail = &millis[millis.len().saturating_sub(6)..];
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(4)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect();

    format!("BK{tail}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_number_has_expected_shape() {
        let number = generate_booking_number();
        assert!(number.starts_with("BK"));
        assert_eq!(number.len(), 12);
        assert!(number[2..].chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(!number.chars().any(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn booking_numbers_rarely_repeat() {
        let numbers: std::collections::HashSet<String> =
            (0..100).map(|_| generate_booking_number()).collect();
        assert!(numbers.len() > 90);
    }
}
