/// Mask a token for logging: keep a short prefix, drop the rest.
/// Tokens shorter than the prefix are fully masked.
pub fn mask_token(token: &str) -> String {
    const VISIBLE: usize = 4;
    if token.len() <= VISIBLE {
        "****".to_string()
    } else {
        let prefix: String = token.chars().take(VISIBLE).collect();
        format!("{prefix}****")
    }
}

/// Format a price in cents for display, e.g. 1999 -> "$19.99".
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{}${}.{:02}", sign, cents / 100, cents % 100)
}
