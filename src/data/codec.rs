use crate::error::{Result, SpectraError};

// ---------------------------------------------------------------------------
// Spectrum text codec
// ---------------------------------------------------------------------------

/// Parse a bracketed, semicolon-separated list of floats:
/// `"[1.0;2.5;3.25]"` → `[1.0, 2.5, 3.25]`.
///
/// Brackets are optional; `"[]"` decodes to an empty spectrum. Any token that
/// is empty, non-numeric or non-finite is rejected, since NaN is reserved as
/// the missing marker of the aligned tensor.
pub fn decode(text: &str) -> Result<Vec<f64>> {
    let trimmed = text.trim();
    let inner = trimmed.strip_prefix('[').unwrap_or(trimmed);
    let inner = inner.strip_suffix(']').unwrap_or(inner).trim();

    if inner.is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(';')
        .enumerate()
        .map(|(j, tok)| {
            let tok = tok.trim();
            let value = tok.parse::<f64>().map_err(|_| {
                SpectraError::data(format!("spectrum[{j}]: '{tok}' is not a number"))
            })?;
            if !value.is_finite() {
                return Err(SpectraError::data(format!(
                    "spectrum[{j}]: '{tok}' is not a finite number"
                )));
            }
            Ok(value)
        })
        .collect()
}

/// Decode and right-pad with zeros to exactly `required_length` channels.
pub fn decode_padded(text: &str, required_length: usize) -> Result<Vec<f64>> {
    pad(decode(text)?, required_length)
}

/// Right-pad `values` with zeros to `required_length`.
/// A spectrum longer than the batch maximum is a data error, never truncated.
pub fn pad(mut values: Vec<f64>, required_length: usize) -> Result<Vec<f64>> {
    if values.len() > required_length {
        return Err(SpectraError::data(format!(
            "spectrum has {} channels, more than the batch maximum of {required_length}",
            values.len()
        )));
    }
    values.resize(required_length, 0.0);
    Ok(values)
}

/// Format a spectrum the way source files store it.
pub fn encode(values: &[f64]) -> String {
    let body: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", body.join(";"))
}
