use std::borrow::Cow;

mod scanner;

use scanner::{is_escaped_close, is_escaped_open, scan_digits};

use crate::error::DriverError;
use crate::types::DbValue;

/// Splice `values` into `template` by position: `{0}` is replaced with the
/// literal text of `values[0]`, and so on. `{{` and `}}` produce literal braces.
///
/// # Security
///
/// Nothing is quoted or escaped. A value containing `'` or `;` ends up in the
/// SQL verbatim, so this is only safe for trusted, caller-controlled values.
/// Bind parameters instead whenever a value can come from outside:
/// ```rust
/// use sql_provider::formatting::format_positional;
/// use sql_provider::prelude::*;
///
/// let sql = format_positional(
///     "SELECT * FROM Users WHERE Name = '{0}'",
///     &[DbValue::Text("x' OR '1'='1".into())],
/// )?;
/// assert_eq!(sql, "SELECT * FROM Users WHERE Name = 'x' OR '1'='1'");
/// # Ok::<(), sql_provider::DriverError>(())
/// ```
/// An empty `values` slice returns the template untouched.
///
/// # Errors
///
/// Returns `DriverError::FormatError` for an unbalanced brace, a placeholder
/// that is not a plain index, or an index past the end of `values`.
pub fn format_positional<'a>(
    template: &'a str,
    values: &[DbValue],
) -> Result<Cow<'a, str>, DriverError> {
    if values.is_empty() {
        return Ok(Cow::Borrowed(template));
    }

    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len());
    let mut literal_start = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        match bytes[idx] {
            b'{' if is_escaped_open(bytes, idx) => {
                out.push_str(&template[literal_start..=idx]);
                idx += 2;
                literal_start = idx;
            }
            b'}' if is_escaped_close(bytes, idx) => {
                out.push_str(&template[literal_start..=idx]);
                idx += 2;
                literal_start = idx;
            }
            b'{' => {
                let (digits_end, digits) = scan_digits(bytes, idx + 1).ok_or_else(|| {
                    DriverError::FormatError(format!("expected an index after `{{` at byte {idx}"))
                })?;
                if bytes.get(digits_end) != Some(&b'}') {
                    return Err(DriverError::FormatError(format!(
                        "unterminated placeholder at byte {idx}"
                    )));
                }
                let position: usize = digits.parse().map_err(|_| {
                    DriverError::FormatError(format!("placeholder index `{digits}` is too large"))
                })?;
                let value = values.get(position).ok_or_else(|| {
                    DriverError::FormatError(format!(
                        "placeholder {{{position}}} has no value ({} supplied)",
                        values.len()
                    ))
                })?;

                out.push_str(&template[literal_start..idx]);
                out.push_str(&value.to_string());
                idx = digits_end + 1;
                literal_start = idx;
            }
            b'}' => {
                return Err(DriverError::FormatError(format!(
                    "unmatched `}}` at byte {idx}"
                )));
            }
            _ => idx += 1,
        }
    }

    out.push_str(&template[literal_start..]);
    Ok(Cow::Owned(out))
}
