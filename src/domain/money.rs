use thiserror::Error;

/// Balances and amounts are integer minor units (cents) of a two-decimal currency.
pub type MinorUnits = i64;

/// Minor units per major unit.
pub const MINOR_PER_MAJOR: MinorUnits = 100;

/// Convert minor units to the human-facing major amount.
/// Example: 1030 -> 10.3
pub fn to_major(minor: MinorUnits) -> f64 {
    minor as f64 / MINOR_PER_MAJOR as f64
}

/// Render minor units with exactly two decimals.
/// Example: 1030 -> "10.30", -5 -> "-0.05"
pub fn format_major(minor: MinorUnits) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    let per = MINOR_PER_MAJOR as u64;
    format!("{sign}{}.{:02}", abs / per, abs % per)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseAmountError {
    #[error("empty amount")]
    Empty,

    #[error("invalid amount format: {0}")]
    InvalidFormat(String),

    #[error("at most two decimal places are allowed: {0}")]
    TooPrecise(String),

    #[error("amount out of range: {0}")]
    Overflow(String),
}

/// Parse a major-unit decimal string into minor units.
/// Example: "10.10" -> 1010, "7" -> 700, ".5" -> 50
pub fn parse_major(input: &str) -> Result<MinorUnits, ParseAmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseAmountError::Empty);
    }

    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let invalid = || ParseAmountError::InvalidFormat(trimmed.to_string());

    let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac.len() > 2 {
        return Err(ParseAmountError::TooPrecise(trimmed.to_string()));
    }

    let whole: MinorUnits = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| ParseAmountError::Overflow(trimmed.to_string()))?
    };
    let frac: MinorUnits = match frac.len() {
        0 => 0,
        1 => frac.parse::<MinorUnits>().map_err(|_| invalid())? * 10,
        _ => frac.parse().map_err(|_| invalid())?,
    };

    let minor = whole
        .checked_mul(MINOR_PER_MAJOR)
        .and_then(|m| m.checked_add(frac))
        .ok_or_else(|| ParseAmountError::Overflow(trimmed.to_string()))?;
    Ok(if negative { -minor } else { minor })
}
