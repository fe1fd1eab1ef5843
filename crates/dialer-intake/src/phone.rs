//! North American phone number normalization.
//!
//! Only NANP numbers are domestically routable for the dialer. Anything else
//! is rejected rather than guessed at.

/// Normalize `raw` to E.164 (`+1NXXNXXXXXX`), or `None` if it is not a
/// routable NANP number.
///
/// Accepts the usual punctuation (spaces, dashes, dots, parentheses) and an
/// optional leading `+`. Normalizing an already-normalized number returns it
/// unchanged.
pub fn normalize_phone(raw: &str) -> Option<String> {
  let raw = raw.trim();
  let (plus, body) = match raw.strip_prefix('+') {
    Some(rest) => (true, rest),
    None => (false, raw),
  };

  if !body
    .chars()
    .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '.' | '(' | ')'))
  {
    return None;
  }

  let digits: String = body.chars().filter(char::is_ascii_digit).collect();
  let national = match (plus, digits.len()) {
    (false, 10) => digits.as_str(),
    (_, 11) if digits.starts_with('1') => &digits[1..],
    _ => return None,
  };

  let bytes = national.as_bytes();
  // NPA and NXX both start with 2-9; N11 codes are service numbers.
  let routable = (b'2'..=b'9').contains(&bytes[0])
    && (b'2'..=b'9').contains(&bytes[3])
    && &national[1..3] != "11";
  routable.then(|| format!("+1{national}"))
}

/// The three-digit area code of a normalized `+1` number.
pub fn area_code(e164: &str) -> Option<&str> {
  e164
    .strip_prefix("+1")
    .filter(|rest| rest.len() == 10)
    .map(|rest| &rest[..3])
}
