// src/timeparse.rs
// Best-effort extraction of a "how far back" window, in hours, from free-form
// query text. Explicit "last N hours/days/weeks" phrases win over keywords.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Extract a time period from the query, in hours. Returns `None` when the
/// query carries no recognizable time reference.
pub fn extract_time_period(query: &str) -> Option<i64> {
    let lower = query.to_lowercase();

    static RE_RELATIVE: OnceCell<Regex> = OnceCell::new();
    let re = RE_RELATIVE.get_or_init(|| {
        Regex::new(r"(?:last|past|previous)\s+(\d+)\s*(hour|day|week|month)s?").unwrap()
    });

    if let Some(caps) = re.captures(&lower) {
        let n: i64 = caps[1].parse().ok()?;
        let hours = match &caps[2] {
            "hour" => n,
            "day" => n * 24,
            "week" => n * 168,
            "month" => n * 720,
            _ => return None,
        };
        return Some(hours.max(1));
    }

    // Keyword table, most specific phrases first.
    const KEYWORDS: &[(&str, i64)] = &[
        ("right now", 12),
        ("this week", 168),
        ("last week", 336),
        ("this month", 720),
        ("last month", 1440),
        ("this year", 8760),
        ("yesterday", 48),
        ("today", 24),
        ("recent", 72),
        ("latest", 24),
        ("currently", 12),
        ("hourly", 1),
        ("now", 12),
    ];
    for (keyword, hours) in KEYWORDS {
        if lower.contains(keyword) {
            return Some(*hours);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_phrases_beat_keywords() {
        assert_eq!(extract_time_period("news from the last 6 hours today"), Some(6));
        assert_eq!(extract_time_period("past 2 days of bitcoin"), Some(48));
        assert_eq!(extract_time_period("previous 1 week"), Some(168));
    }

    #[test]
    fn keyword_table_matches() {
        assert_eq!(extract_time_period("what happened today"), Some(24));
        assert_eq!(extract_time_period("eth price right now"), Some(12));
        assert_eq!(extract_time_period("recent solana rallies"), Some(72));
    }

    #[test]
    fn no_time_reference_yields_none() {
        assert_eq!(extract_time_period("bitcoin etf inflows"), None);
    }
}
