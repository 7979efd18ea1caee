//! Display formatting for prices, percentages and large amounts

/// Groups the integer digits of `value` with commas, keeping `decimals`
/// fractional digits and trimming trailing zeros
fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part.trim_end_matches('0')),
        None => (formatted.as_str(), ""),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}

/// Price without currency sign: four decimals under one dollar,
/// comma-grouped with up to two decimals otherwise
pub fn format_price(price: f64) -> String {
    if price < 1.0 {
        format!("{:.4}", price)
    } else {
        group_thousands(price, 2)
    }
}

/// Prefixes `$`, placing any minus sign in front of it
fn with_currency(value: f64, body: impl FnOnce(f64) -> String) -> String {
    let digits = body(value.abs());
    if value < 0.0 && digits.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-${}", digits)
    } else {
        format!("${}", digits)
    }
}

/// Price with a leading dollar sign
pub fn format_usd(value: f64) -> String {
    with_currency(value, format_price)
}

/// Comma-grouped whole dollar amount, for market caps and volumes
pub fn format_usd_whole(value: f64) -> String {
    with_currency(value, |v| group_thousands(v, 0))
}

/// Percentage with two decimals
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}

/// Compact amount with a T/B/M suffix
pub fn format_compact(value: f64) -> String {
    with_currency(value, |abs| {
        if abs >= 1e12 {
            format!("{:.2}T", abs / 1e12)
        } else if abs >= 1e9 {
            format!("{:.2}B", abs / 1e9)
        } else if abs >= 1e6 {
            format!("{:.2}M", abs / 1e6)
        } else {
            group_thousands(abs, 0)
        }
    })
}
