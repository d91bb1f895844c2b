use serde_json::{Map, Value};

/// Failure to turn a form-urlencoded body into a nested object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormDecodeError {
    #[error("form key '{key}' is used both as a value and as a nested object")]
    Conflict { key: String },
}

/// Decodes `a[b][c]=v` style pairs into nested JSON objects.
///
/// Repeated scalar keys collect into an array. Every leaf is a string.
pub fn decode(body: &[u8]) -> Result<Map<String, Value>, FormDecodeError> {
    let mut root = Map::new();
    for (key, value) in url::form_urlencoded::parse(body) {
        if key.is_empty() {
            continue;
        }
        let path = split_key(&key);
        insert(&mut root, &path, Value::String(value.into_owned()), &key)?;
    }
    Ok(root)
}

/// `fields[name][value]` → `["fields", "name", "value"]`. Keys with
/// unbalanced brackets are kept whole.
fn split_key(key: &str) -> Vec<&str> {
    let Some(open) = key.find('[') else {
        return vec![key];
    };
    if open == 0 {
        return vec![key];
    }

    let mut segments = vec![&key[..open]];
    let mut rest = &key[open..];
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            return vec![key];
        };
        segments.push(&stripped[..close]);
        rest = &stripped[close + 1..];
    }

    if rest.is_empty() {
        segments
    } else {
        vec![key]
    }
}

fn insert(
    target: &mut Map<String, Value>,
    path: &[&str],
    value: Value,
    full_key: &str,
) -> Result<(), FormDecodeError> {
    let conflict = || FormDecodeError::Conflict {
        key: full_key.to_string(),
    };

    match path {
        [] => Ok(()),
        [leaf] => {
            match target.get_mut(*leaf) {
                None => {
                    target.insert((*leaf).to_string(), value);
                }
                Some(Value::Array(items)) => items.push(value),
                Some(existing @ Value::String(_)) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                Some(_) => return Err(conflict()),
            }
            Ok(())
        }
        [head, tail @ ..] => {
            let entry = target
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match entry {
                Value::Object(nested) => insert(nested, tail, value, full_key),
                _ => Err(conflict()),
            }
        }
    }
}
