use chrono::{DateTime, Utc};

/// Upper bound on bound parameters per statement; SQLite builds before 3.32 cap at 999.
pub const MAX_BIND_PARAMS: usize = 500;

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// `?,?,?` for an `IN (...)` list of `count` items.
pub fn placeholders(count: usize) -> String {
    std::iter::repeat("?").take(count).collect::<Vec<_>>().join(",")
}

/// Trimmed, non-empty display name or `None`.
pub fn clean_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_placeholder_lists() {
        assert_eq!(placeholders(0), "");
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?,?,?");
    }

    #[test]
    fn clean_name_rejects_blank() {
        assert_eq!(clean_name("  Reports "), Some("Reports".to_string()));
        assert_eq!(clean_name("   "), None);
    }
}
