//! Placeholder substitution for step values.

use lazy_static::lazy_static;
use regex::Regex;

use crate::{AutomationContext, ContextError, Placeholder};

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"\{\{\s*([a-z0-9_]+)\s*\}\}").expect("valid token regex");
}

/// Replace every `{{token}}` in `value` with its context value.
///
/// Total and deterministic: an unknown token, or a token the context has no
/// value for, fails the whole resolution; no partially-resolved string is
/// ever returned.
pub fn resolve_placeholders(
    value: &str,
    context: &AutomationContext,
) -> Result<String, ContextError> {
    let mut resolved = String::with_capacity(value.len());
    let mut last_end = 0;

    for capture in TOKEN.captures_iter(value) {
        let whole = capture.get(0).expect("capture 0 always present");
        let token = &capture[1];
        let placeholder = Placeholder::from_token(token)
            .ok_or_else(|| ContextError::UnresolvedPlaceholder(token.to_string()))?;
        let replacement = context
            .value_of(placeholder)
            .ok_or_else(|| ContextError::UnresolvedPlaceholder(token.to_string()))?;

        resolved.push_str(&value[last_end..whole.start()]);
        resolved.push_str(&replacement);
        last_end = whole.end();
    }
    resolved.push_str(&value[last_end..]);
    Ok(resolved)
}
