//! Display formatting for prices, percent changes and money amounts.

/// Formats `value` with `decimals` fraction digits and `,` thousands separators.
pub fn format_grouped(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    let is_negative = value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    if is_negative {
        grouped.push('-');
    }
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(frac_part) = frac_part {
        grouped.push('.');
        grouped.push_str(frac_part);
    }
    grouped
}

/// Formats a trade price: grouped, at least two decimals.
///
/// Sub-unit prices keep up to eight decimals so small-cap quotes stay readable;
/// zeros past the second decimal are trimmed.
pub fn format_price(price: f64) -> String {
    if price.abs() >= 1.0 {
        return format_grouped(price, 2);
    }
    let mut text = format_grouped(price, 8);
    while text.ends_with('0') && text.split_once('.').is_some_and(|(_, f)| f.len() > 2) {
        text.pop();
    }
    text
}

/// Formats a 24h change as `+1.25%` / `-1.32%`.
pub fn format_change(percent: f64) -> String {
    let rounded = (percent * 100.0).round() / 100.0;
    // -0.00 renders as +0.00
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    let sign = if rounded >= 0.0 { "+" } else { "" };
    format!("{}{:.2}%", sign, rounded)
}
