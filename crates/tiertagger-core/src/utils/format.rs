use chrono::Duration;

/// Normalize a player name into a cache key: trimmed and lower-cased.
/// Returns `None` for blank input.
pub fn normalize_player_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Format an age for log and CLI output ("just now", "5m ago", "3h ago", "2d ago").
pub fn format_age(age: Duration) -> String {
    let minutes = age.num_minutes();
    if minutes < 1 {
        // Negative ages come from clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        let remaining_mins = minutes % 60;
        if remaining_mins >= 30 {
            // Round up: 1h 30m+ becomes 2h
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        let remaining_hours = (minutes % 1440) / 60;
        if remaining_hours >= 12 {
            // Round up: 1d 12h+ becomes 2d
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_player_name() {
        assert_eq!(normalize_player_name("  Steve "), Some("steve".to_string()));
        assert_eq!(normalize_player_name("ALEX"), Some("alex".to_string()));
        assert_eq!(normalize_player_name(""), None);
        assert_eq!(normalize_player_name("   "), None);
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::seconds(10)), "just now");
        assert_eq!(format_age(Duration::minutes(-5)), "just now");
        assert_eq!(format_age(Duration::minutes(5)), "5m ago");
        assert_eq!(format_age(Duration::minutes(89)), "1h ago");
        assert_eq!(format_age(Duration::minutes(90)), "2h ago");
        assert_eq!(format_age(Duration::hours(30)), "1d ago");
        assert_eq!(format_age(Duration::hours(36)), "2d ago");
    }
}
