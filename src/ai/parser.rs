use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::Digest;

/// The digestion prompt asks for these keys. Kept as a table so the mapping
/// is visible in one place and testable apart from the JSON handling.
const FIELD_KEYS: [(&str, &str); 4] = [
    ("产品名称", "product"),
    ("单位", "product_author"),
    ("成果", "core_summary"),
    ("详情", "detailed_summary"),
];

/// Decode one raw model response into a [`Digest`].
///
/// The template tends to produce pretty-printed JSON, so embedded newlines
/// are stripped before decoding. Failure modes differ on purpose:
/// [`AppError::DigestParse`] means the text is not JSON and a repair call may
/// salvage it; [`AppError::MissingDigestField`] means the JSON is fine but
/// the content is wrong, which no repair call will fix.
pub fn parse_digest(raw: &str) -> Result<Digest> {
    let normalized: String = raw.chars().filter(|c| *c != '\n' && *c != '\r').collect();

    let value: Value = serde_json::from_str(normalized.trim())
        .map_err(|e| AppError::DigestParse(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| AppError::DigestParse("expected a JSON object".to_string()))?;

    let mut fields = [None, None, None, None];
    for (index, (key, _)) in FIELD_KEYS.into_iter().enumerate() {
        fields[index] = Some(field_as_string(object.get(key), key)?);
    }

    let [product, product_author, core_summary, detailed_summary] =
        fields.map(|f| f.unwrap_or_default());

    Ok(Digest {
        product,
        product_author,
        core_summary,
        detailed_summary,
    })
}

fn field_as_string(value: Option<&Value>, key: &'static str) -> Result<String> {
    match value {
        Some(Value::String(s)) => Ok(s.clone()),
        // models occasionally emit bare numbers for the org field
        Some(other) if !other.is_null() => Ok(other.to_string()),
        _ => Err(missing_field_error(key)),
    }
}

fn missing_field_error(key: &str) -> AppError {
    let canonical = FIELD_KEYS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, name)| *name)
        .unwrap_or("unknown");
    AppError::MissingDigestField(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str =
        r#"{"产品名称":"Widget v2","单位":"Acme Corp","成果":"机器人工具包发布","详情":"两句话描述。"}"#;

    #[test]
    fn parses_all_four_fields() {
        let digest = parse_digest(VALID).unwrap();
        assert_eq!(digest.product, "Widget v2");
        assert_eq!(digest.product_author, "Acme Corp");
        assert_eq!(digest.core_summary, "机器人工具包发布");
        assert_eq!(digest.detailed_summary, "两句话描述。");
    }

    #[test]
    fn newline_artifacts_do_not_change_the_result() {
        let pretty = VALID.replace(',', ",\n").replace('{', "{\n");
        assert_eq!(parse_digest(VALID).unwrap(), parse_digest(&pretty).unwrap());
    }

    #[test]
    fn missing_key_is_a_failure_not_a_partial_digest() {
        let three_fields = r#"{"产品名称":"X","单位":"Y","成果":"Z"}"#;
        match parse_digest(three_fields) {
            Err(AppError::MissingDigestField(field)) => {
                assert_eq!(field, "detailed_summary");
            }
            other => panic!("expected missing-field error, got {:?}", other),
        }
    }

    #[test]
    fn missing_key_is_not_repairable() {
        let err = parse_digest(r#"{"产品名称":"X"}"#).unwrap_err();
        assert!(!err.is_repairable());
    }

    #[test]
    fn non_json_is_repairable() {
        let err = parse_digest("not json").unwrap_err();
        assert!(err.is_repairable());
        let err = parse_digest("[1, 2, 3]").unwrap_err();
        assert!(err.is_repairable());
    }
}
