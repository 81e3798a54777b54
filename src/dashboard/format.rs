use chrono::NaiveDate;

pub(crate) const MASK_VISIBLE: usize = 5;
const MASK_BULLETS: usize = 20;

/// `Nd Nh`, `Nh Nm` or `Nm`.
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Shows the first characters of a key and hides the rest.
///
/// `secret` is the full key when it is still held in memory, otherwise the
/// prefix the backend stores.
pub fn mask_key(secret: &str) -> String {
    let visible: String = secret.chars().take(MASK_VISIBLE).collect();
    format!("{}{}", visible, "•".repeat(MASK_BULLETS))
}

/// Short weekday name for chart axes.
pub fn weekday_label(date: NaiveDate) -> String {
    date.format("%a").to_string()
}

/// `updated Ns ago`, measured from a backend timestamp.
pub fn updated_ago(measured_at: i64, now: i64) -> String {
    format!("updated {}s ago", (now - measured_at).max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(0), "0m");
        assert_eq!(format_uptime(59), "0m");
        assert_eq!(format_uptime(3_660), "1h 1m");
        assert_eq!(format_uptime(90_000), "1d 1h");
        assert_eq!(format_uptime(3 * 86_400 + 59 * 60), "3d 0h");
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_000), "1,000");
        assert_eq!(format_thousands(12_450), "12,450");
        assert_eq!(format_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("sk-abcdef123456"), format!("sk-ab{}", "•".repeat(20)));
        assert_eq!(mask_key("ab"), format!("ab{}", "•".repeat(20)));
        assert_eq!(mask_key(""), "•".repeat(20));
    }

    #[test]
    fn test_labels() {
        let monday = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        assert_eq!(weekday_label(monday), "Mon");
        assert_eq!(updated_ago(100, 112), "updated 12s ago");
        assert_eq!(updated_ago(100, 90), "updated 0s ago");
    }
}
