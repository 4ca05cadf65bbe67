//! 工具参数校验
//!
//! 按工具声明的 JSON Schema 子集校验模型给出的参数：顶层必须是 object，required 字段必须存在，
//! 已声明字段的 type 必须匹配，`additionalProperties: false` 时不允许未声明字段。

use serde_json::Value;

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

/// 校验参数；错误信息会原样返回给模型，便于它修正后重试
pub fn validate_arguments(schema: &Value, args: &Value) -> Result<(), String> {
    let Some(obj) = args.as_object() else {
        return Err("Arguments must be a JSON object".to_string());
    };

    let properties = schema.get("properties").and_then(Value::as_object);

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if !obj.contains_key(field) {
                return Err(format!("Missing required argument '{field}'"));
            }
        }
    }

    let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));

    for (key, value) in obj {
        match properties.and_then(|p| p.get(key)) {
            Some(prop) => {
                if let Some(expected) = prop.get("type").and_then(Value::as_str) {
                    if !type_matches(expected, value) {
                        return Err(format!("Argument '{key}' must be of type {expected}"));
                    }
                }
            }
            None if closed => return Err(format!("Unexpected argument '{key}'")),
            None => {}
        }
    }

    Ok(())
}

/// 解析模型给出的参数字符串；空串视为 `{}`
pub fn parse_arguments(raw: &str) -> Result<Value, String> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw).map_err(|e| format!("Invalid arguments: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "email": {"type": "string"},
                "name": {"type": "string"}
            },
            "required": ["email"],
            "additionalProperties": false
        })
    }

    #[test]
    fn test_valid_arguments() {
        assert!(validate_arguments(&schema(), &json!({"email": "a@b.c"})).is_ok());
        assert!(validate_arguments(&schema(), &json!({"email": "a@b.c", "name": "A"})).is_ok());
    }

    #[test]
    fn test_missing_required() {
        let err = validate_arguments(&schema(), &json!({"name": "A"})).unwrap_err();
        assert!(err.contains("email"));
    }

    #[test]
    fn test_wrong_type() {
        let err = validate_arguments(&schema(), &json!({"email": 42})).unwrap_err();
        assert!(err.contains("string"));
    }

    #[test]
    fn test_closed_property_set() {
        let err =
            validate_arguments(&schema(), &json!({"email": "a@b.c", "phone": "1"})).unwrap_err();
        assert!(err.contains("phone"));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(validate_arguments(&schema(), &json!(["a@b.c"])).is_err());
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(parse_arguments("").unwrap(), json!({}));
        assert_eq!(parse_arguments(r#"{"a":1}"#).unwrap(), json!({"a": 1}));
        assert!(parse_arguments("{not json").unwrap_err().starts_with("Invalid arguments"));
    }
}
