//! Permissive numeric parsing for balances, counters and earnings.
//!
//! Accepts things tools actually print: `45.00`, `$1,234.50`, `0 GLM (0)`,
//! `USD 12`, `-3`. Rejects anything where the number is not the leading
//! token (`about 12`, `N/A`, `1.2.3`).

/// Parse the leading number of `input`, tolerating currency markers, unit
/// suffixes and thousands separators.
pub fn parse_number(input: &str) -> Option<f64> {
    let s = input.trim();
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let (prefix, rest) = s.split_at(start);

    let negative = prefix.trim_end().ends_with('-');
    if !prefix_is_currency(prefix.trim_end_matches('-').trim_end_matches('+')) {
        return None;
    }

    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == ',' || c == '.' || c == '_'))
        .unwrap_or(rest.len());
    if !suffix_is_unit(&rest[end..]) {
        return None;
    }
    let token = rest[..end].trim_end_matches(['.', ',']);

    let normalized = normalize_separators(token)?;
    let value: f64 = normalized.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Allowed text before the number: whitespace, currency symbols, or a short
/// upper-case currency/unit code (`USD`, `GLM`).
fn prefix_is_currency(prefix: &str) -> bool {
    let trimmed = prefix.trim();
    if trimmed.is_empty() {
        return true;
    }
    let symbols_only = trimmed
        .chars()
        .all(|c| matches!(c, '$' | '€' | '£' | '¥' | '₿' | '~' | '≈') || c.is_whitespace());
    if symbols_only {
        return true;
    }
    let code = trimmed.trim_end_matches(['$', '€', '£', '¥']).trim();
    !code.is_empty() && code.len() <= 5 && code.chars().all(|c| c.is_ascii_uppercase())
}

/// Allowed text right after the number: nothing, whitespace, `(`, `%`, a
/// currency symbol, or an attached upper-case unit code (`45GLM`).
/// Scale letters and exponents (`1.5k`, `2.5M`, `1e3`) are rejected.
fn suffix_is_unit(suffix: &str) -> bool {
    let Some(first) = suffix.chars().next() else {
        return true;
    };
    if first.is_whitespace() || matches!(first, '(' | '%' | '$' | '€' | '£' | '¥' | '₿') {
        return true;
    }
    let code_len = suffix.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(suffix.len());
    let (code, after) = suffix.split_at(code_len);
    (2..=6).contains(&code.len())
        && code.chars().all(|c| c.is_ascii_uppercase())
        && after.chars().next().is_none_or(|c| c.is_whitespace() || c == '(')
}

/// Strip `_` and thousands commas; commas must separate groups of three.
fn normalize_separators(token: &str) -> Option<String> {
    let token = token.replace('_', "");
    if !token.contains(',') {
        return Some(token);
    }
    let (int_part, frac_part) = match token.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (token.as_str(), None),
    };
    let mut groups = int_part.split(',');
    let first = groups.next()?;
    if first.is_empty() || first.len() > 3 {
        return None;
    }
    let mut out = first.to_string();
    for group in groups {
        if group.len() != 3 {
            return None;
        }
        out.push_str(group);
    }
    if let Some(frac) = frac_part {
        if frac.contains(',') {
            return None;
        }
        out.push('.');
        out.push_str(frac);
    }
    Some(out)
}
