//! Lenient boolean parsing for policy values.

use crate::error::ParseBoolError;

/// Parse a policy value as a boolean.
///
/// Accepts any case-insensitive, non-empty prefix of `"true"` or `"false"`,
/// so `t`, `Tr`, `TRUE`, `f` and `fal` are all valid.
pub fn parse_bool(value: &str) -> Result<bool, ParseBoolError> {
    if value.is_empty() {
        return Err(ParseBoolError(value.to_string()));
    }
    let lowered = value.to_ascii_lowercase();
    if "true".starts_with(&lowered) {
        Ok(true)
    } else if "false".starts_with(&lowered) {
        Ok(false)
    } else {
        Err(ParseBoolError(value.to_string()))
    }
}
