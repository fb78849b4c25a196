//! Flattens event kinds and extra fields into JSON-safe envelopes.
//!
//! Normalization is total: every [`ExtraValue`] shape has a JSON rendering,
//! so a strange payload degrades instead of stopping the stream.

use cw_types::{Envelope, EventCategory, EventType, EventTypeInfo, ExtraFields, ExtraValue};
use serde_json::{Map, Number, Value};

/// `{name, value}` pair for an event kind.
pub fn normalize_event_type(event_type: EventType) -> EventTypeInfo {
    EventTypeInfo::from(event_type)
}

/// Convert one extra value to JSON.
///
/// Enums collapse to their member name. Objects keep only public,
/// non-callable fields.
pub fn normalize_value(value: &ExtraValue) -> Value {
    match value {
        ExtraValue::Null => Value::Null,
        ExtraValue::Bool(b) => Value::Bool(*b),
        ExtraValue::Int(i) => Value::Number((*i).into()),
        ExtraValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        ExtraValue::Str(s) => Value::String(s.clone()),
        ExtraValue::Enum { name, .. } => Value::String(name.clone()),
        ExtraValue::List(items) => Value::Array(items.iter().map(normalize_value).collect()),
        ExtraValue::Map(fields) => normalize_details(fields),
        ExtraValue::Object(fields) => {
            let map: Map<String, Value> = fields
                .iter()
                .filter(|(name, value)| {
                    !name.starts_with('_') && !matches!(value, ExtraValue::Callable(_))
                })
                .map(|(name, value)| (name.to_string(), normalize_value(value)))
                .collect();
            Value::Object(map)
        }
        ExtraValue::Callable(name) => Value::String(name.clone()),
    }
}

/// Convert an event's extra fields to a JSON object.
pub fn normalize_details(fields: &ExtraFields) -> Value {
    let map: Map<String, Value> = fields
        .iter()
        .map(|(key, value)| (key.to_string(), normalize_value(value)))
        .collect();
    Value::Object(map)
}

/// Build the client envelope for one event.
pub fn build_envelope(
    category: EventCategory,
    event_type: EventType,
    message: impl Into<String>,
    extra: &ExtraFields,
) -> Envelope {
    Envelope::new(
        category,
        normalize_event_type(event_type),
        message,
        normalize_details(extra),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cw_types::{AttachmentType, PostEventType, RoundEventType};
    use serde_json::json;

    #[test]
    fn event_type_becomes_name_value_pair() {
        let info = normalize_event_type(EventType::Round(RoundEventType::RoundStart));
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            json!({"name": "round_start", "value": "round_start"})
        );
    }

    #[test]
    fn enums_in_details_collapse_to_name() {
        let extra = ExtraFields::new()
            .with("id", "atta-1")
            .with("type", AttachmentType::ExecutionResult)
            .with("is_end", false);
        assert_eq!(
            normalize_details(&extra),
            json!({"id": "atta-1", "type": "execution_result", "is_end": false})
        );
    }

    #[test]
    fn nested_shapes_recurse() {
        let inner = ExtraFields::new().with("kind", ExtraValue::enumeration("Plan", "plan"));
        let extra = ExtraFields::new()
            .with("nested", ExtraValue::Map(inner))
            .with(
                "items",
                ExtraValue::List(vec![
                    ExtraValue::Int(1),
                    ExtraValue::enumeration("Python", "python"),
                    ExtraValue::Null,
                ]),
            );
        assert_eq!(
            normalize_details(&extra),
            json!({"nested": {"kind": "Plan"}, "items": [1, "Python", null]})
        );
    }

    #[test]
    fn objects_drop_private_and_callable_fields() {
        let object = ExtraFields::new()
            .with("name", "round")
            .with("_secret", "hidden")
            .with("to_dict", ExtraValue::Callable("to_dict".to_string()))
            .with("count", 3_i64);
        let value = normalize_value(&ExtraValue::Object(object));
        assert_eq!(value, json!({"name": "round", "count": 3}));
    }

    #[test]
    fn degenerate_values_do_not_fail() {
        assert_eq!(normalize_value(&ExtraValue::Float(f64::NAN)), Value::Null);
        assert_eq!(normalize_value(&ExtraValue::Float(0.5)), json!(0.5));
        assert_eq!(
            normalize_value(&ExtraValue::Callable("fn".to_string())),
            json!("fn")
        );
        assert_eq!(normalize_details(&ExtraFields::new()), json!({}));
    }

    #[test]
    fn build_envelope_wraps_everything() {
        let env = build_envelope(
            EventCategory::Post,
            EventType::Post(PostEventType::PostSendToUpdate),
            "body",
            &ExtraFields::new().with("role", "User"),
        );
        assert_eq!(env.kind, "chat_message");
        assert_eq!(env.event_type.name, "post_send_to_update");
        assert_eq!(env.details, json!({"role": "User"}));
    }
}
