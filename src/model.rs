use serde::{Deserialize, Serialize};
use serde_json::Map;

/// Untyped client-supplied fields of a record, kept in the order received.
pub type Fields = Map<String, serde_json::Value>;

pub const ID_FIELD: &str = "id";

/// A single item in a collection: a server-assigned `id` plus whatever the
/// client sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    /// Builds a record from client fields. Any client `id` is discarded.
    pub fn new(id: String, mut fields: Fields) -> Self {
        fields.shift_remove(ID_FIELD);
        Record { id, fields }
    }

    /// Shallow merge: keys in `fields` overwrite, everything else is kept.
    pub fn merge(&mut self, fields: Fields) {
        for (key, value) in fields {
            if key == ID_FIELD {
                continue;
            }
            self.fields.insert(key, value);
        }
    }

    pub fn merged(mut self, fields: Fields) -> Self {
        self.merge(fields);
        self
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn fields(v: Value) -> Fields {
        match v {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_new_drops_client_id() {
        let r = Record::new("abc".into(), fields(json!({"id": "evil", "title": "Dune"})));
        assert_eq!(r.id, "abc");
        assert_eq!(r.get("id"), None);
        assert_eq!(r.get("title"), Some(&json!("Dune")));
    }

    #[test]
    fn test_merge_keeps_untouched_fields() {
        let mut r = Record::new(
            "abc".into(),
            fields(json!({"title": "Dune", "author": "Herbert"})),
        );
        r.merge(fields(json!({"author": "F. Herbert", "id": "other"})));
        assert_eq!(r.id, "abc");
        assert_eq!(r.get("title"), Some(&json!("Dune")));
        assert_eq!(r.get("author"), Some(&json!("F. Herbert")));
    }

    #[test]
    fn test_serializes_flat_with_id_first() {
        let r = Record::new("abc".into(), fields(json!({"title": "Dune", "year": 1965})));
        let s = serde_json::to_string(&r).unwrap();
        assert_eq!(s, r#"{"id":"abc","title":"Dune","year":1965}"#);
    }

    #[test]
    fn test_deserializes_nested_values() {
        let r: Record =
            serde_json::from_value(json!({"id": "x1", "meta": {"tags": ["a"]}, "ok": true}))
                .unwrap();
        assert_eq!(r.id, "x1");
        assert_eq!(r.get("meta"), Some(&json!({"tags": ["a"]})));
        assert_eq!(r.get("ok"), Some(&json!(true)));
    }

    #[test]
    fn test_deserialize_requires_id() {
        let res: Result<Record, _> = serde_json::from_value(json!({"title": "no id"}));
        assert!(res.is_err());
    }
}
