/// Value for a NOT NULL text column: missing or null source values become `""`.
pub fn or_empty(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

/// Identifier usable as a primary key: present and not blank. The id is not trimmed.
pub fn non_empty_id(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_text_is_coerced_to_empty() {
        assert_eq!(or_empty(None), "");
        assert_eq!(or_empty(Some("Europe/London")), "Europe/London");
    }

    #[test]
    fn blank_ids_are_rejected() {
        assert_eq!(non_empty_id(None), None);
        assert_eq!(non_empty_id(Some("  ")), None);
        assert_eq!(non_empty_id(Some("sr:competitor:1")).as_deref(), Some("sr:competitor:1"));
    }
}
