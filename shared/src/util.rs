/// Random row id (UUID v4, hyphenated)
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Human-facing order number: `{prefix}-{1000..=9999}`.
///
/// Not unique on its own; the row id is the key. Collisions only make two
/// tickets share a number.
pub fn order_number(prefix: &str) -> String {
    use rand::Rng;
    let n: u32 = rand::thread_rng().gen_range(1000..=9999);
    let prefix = prefix.trim();
    if prefix.is_empty() {
        n.to_string()
    } else {
        format!("{prefix}-{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_shape() {
        for _ in 0..50 {
            let number = order_number("ORD");
            let digits = number.strip_prefix("ORD-").unwrap();
            let n: u32 = digits.parse().unwrap();
            assert!((1000..=9999).contains(&n));
        }
        assert_eq!(order_number("  ").len(), 4);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(new_id(), new_id());
    }
}
