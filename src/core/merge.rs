use serde_json::Value;

/// Top-level keys of `partial` overwrite those of `current`; nested objects are
/// replaced, not merged. When either side is not an object, `partial` wins.
pub fn shallow_merge(current: Value, partial: Value) -> Value {
    match (current, partial) {
        (Value::Object(mut base), Value::Object(patch)) => {
            for (key, value) in patch {
                base.insert(key, value);
            }
            Value::Object(base)
        }
        (_, partial) => partial,
    }
}
