//! Per-alias HTTP header declarations (`alias=Name: value`).

use crate::core::DataError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;

/// Parse header declarations into one [`HeaderMap`] per alias.
///
/// Values are trimmed; repeating a header for the same alias appends another
/// value rather than replacing the first.
///
/// # Errors
///
/// Returns [`DataError::Parse`] when a declaration has no `=`, the header has
/// no `:`, or the name or value is not a legal HTTP header.
///
/// # Examples
///
/// ```rust
/// use tera_datasources::source::parse_header_args;
///
/// let headers = parse_header_args(&[
///     "api=Authorization: Bearer abc".to_string(),
///     "api=Accept: text/csv".to_string(),
/// ])
/// .unwrap();
/// assert_eq!(headers["api"]["authorization"], "Bearer abc");
/// ```
pub fn parse_header_args<S: AsRef<str>>(
    header_args: &[S],
) -> Result<HashMap<String, HeaderMap>, DataError> {
    let mut headers: HashMap<String, HeaderMap> = HashMap::new();

    for arg in header_args {
        let arg = arg.as_ref();
        let (alias, name, value) = split_header_arg(arg)?;
        headers.entry(alias.to_string()).or_default().append(name, value);
    }

    Ok(headers)
}

fn split_header_arg(arg: &str) -> Result<(&str, HeaderName, HeaderValue), DataError> {
    let Some((alias, header)) = arg.split_once('=') else {
        return Err(DataError::parse(arg, "invalid datasource-header option, expected alias=Name: value"));
    };

    let Some((name, value)) = header.split_once(':') else {
        return Err(DataError::parse(arg, format!("invalid HTTP header format '{header}'")));
    };

    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|e| DataError::parse(arg, format!("invalid header name '{name}': {e}")))?;
    let value = HeaderValue::from_str(value.trim())
        .map_err(|e| DataError::parse(arg, format!("invalid header value: {e}")))?;

    Ok((alias, name, value))
}
