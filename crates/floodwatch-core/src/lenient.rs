//! Serde helpers for oracle output that is only loosely schema-conformant.

use serde::{Deserialize, Deserializer};

/// Clamp a JSON number (or numeric string) into a 0–10 score. Anything else becomes 0.
pub fn score_from_value(v: &serde_json::Value) -> u8 {
    let n = if let Some(i) = v.as_i64() {
        i as f64
    } else if let Some(f) = v.as_f64() {
        f
    } else if let Some(s) = v.as_str() {
        s.trim().parse::<f64>().unwrap_or(0.0)
    } else {
        0.0
    };
    n.round().clamp(0.0, 10.0) as u8
}

/// Strict severity read: a finite number (or numeric string) truncated toward zero and
/// clamped to 0–10. NaN, infinities and non-numeric values yield `None`.
pub fn severity_from_value(v: &serde_json::Value) -> Option<u8> {
    let n = match v {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    Some(n.trunc().clamp(0.0, 10.0) as u8)
}

pub fn score<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(score_from_value(&v))
}

/// Strings, with `null`/non-strings read as empty.
pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(match v {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// String lists, keeping only the string elements.
pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(v.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scores_clamp_and_round() {
        assert_eq!(score_from_value(&json!(7)), 7);
        assert_eq!(score_from_value(&json!(12)), 10);
        assert_eq!(score_from_value(&json!(-1)), 0);
        assert_eq!(score_from_value(&json!(4.6)), 5);
        assert_eq!(score_from_value(&json!("3")), 3);
        assert_eq!(score_from_value(&json!({"x": 1})), 0);
    }

    #[test]
    fn severity_truncates_and_rejects_non_finite() {
        assert_eq!(severity_from_value(&json!(4.6)), Some(4));
        assert_eq!(severity_from_value(&json!(4.99)), Some(4));
        assert_eq!(severity_from_value(&json!(5.0)), Some(5));
        assert_eq!(severity_from_value(&json!("7")), Some(7));
        assert_eq!(severity_from_value(&json!(11)), Some(10));
        assert_eq!(severity_from_value(&json!(-2)), Some(0));
        for bad in ["nan", "NaN", "inf", "-inf", "infinity", "high", ""] {
            assert_eq!(severity_from_value(&json!(bad)), None, "{bad}");
        }
        assert_eq!(severity_from_value(&json!(null)), None);
        assert_eq!(severity_from_value(&json!([5])), None);
    }
}
