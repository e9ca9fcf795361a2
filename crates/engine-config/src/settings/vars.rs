use crate::error::SettingsError;
use std::collections::HashMap;

/// Replaces every `${NAME}` in `input` with its value from `vars`.
///
/// `$$` escapes a literal dollar sign. An unknown name is an error rather
/// than an empty string, since the placeholders usually carry credentials.
pub fn substitute(input: &str, vars: &HashMap<String, String>) -> Result<String, SettingsError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    let mut consumed = 0;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(after) = tail.strip_prefix("$$") {
            out.push('$');
            consumed += pos + 2;
            rest = after;
            continue;
        }
        let Some(body) = tail.strip_prefix("${") else {
            out.push('$');
            consumed += pos + 1;
            rest = &tail[1..];
            continue;
        };
        let end = body
            .find('}')
            .ok_or(SettingsError::UnterminatedPlaceholder(consumed + pos))?;
        let name = body[..end].trim();
        let value = vars
            .get(name)
            .ok_or_else(|| SettingsError::MissingVariable(name.to_string()))?;
        out.push_str(value);

        let skipped = pos + 2 + end + 1;
        consumed += skipped;
        rest = &rest[skipped..];
    }

    out.push_str(rest);
    Ok(out)
}
