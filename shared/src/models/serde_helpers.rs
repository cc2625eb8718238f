//! Serde helpers bridging SurrealDB record ids and plain string keys
//!
//! Record ids come back from the database in native form (`table:⟨key⟩`);
//! API clients send and receive bare keys ("25040101", a phone number,
//! "details"). These helpers accept both shapes on deserialization and
//! always serialize the bare key.

use serde::{Deserialize, Deserializer, Serializer};
use serde::de::{self, Visitor};
use std::fmt;
use surrealdb::RecordId;

/// Extract the plain string key from a record id.
pub fn record_key_string(id: &RecordId) -> String {
    clean_key(&id.key().to_string())
}

/// Strip a `table:` prefix and SurrealDB's angle-bracket escaping.
fn clean_key(raw: &str) -> String {
    let without_table = match raw.split_once(':') {
        Some((_, key)) => key,
        None => raw,
    };
    without_table
        .trim_start_matches('⟨')
        .trim_end_matches('⟩')
        .to_string()
}

struct KeyVisitor;

impl<'de> Visitor<'de> for KeyVisitor {
    type Value = String;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a record key string or a RecordId")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(clean_key(v))
    }

    fn visit_map<M>(self, map: M) -> Result<Self::Value, M::Error>
    where
        M: de::MapAccess<'de>,
    {
        // Native format, delegate to RecordId
        RecordId::deserialize(de::value::MapAccessDeserializer::new(map))
            .map(|id| record_key_string(&id))
    }

    fn visit_newtype_struct<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        RecordId::deserialize(deserializer).map(|id| record_key_string(&id))
    }
}

/// Record key as plain string
pub mod record_key {
    use super::*;

    pub fn serialize<S>(key: &str, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(key)
    }

    pub fn deserialize<'de, D>(d: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        d.deserialize_any(KeyVisitor)
    }
}

/// Option<record key> as plain string
pub mod option_record_key {
    use super::*;

    struct OptionKeyVisitor;

    impl<'de> Visitor<'de> for OptionKeyVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("null, a record key string, or a RecordId")
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(KeyVisitor).map(Some)
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_empty() {
                Ok(None)
            } else {
                Ok(Some(clean_key(v)))
            }
        }

        fn visit_map<M>(self, map: M) -> Result<Self::Value, M::Error>
        where
            M: de::MapAccess<'de>,
        {
            RecordId::deserialize(de::value::MapAccessDeserializer::new(map))
                .map(|id| Some(record_key_string(&id)))
        }
    }

    pub fn serialize<S>(key: &Option<String>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match key {
            Some(k) => s.serialize_some(k),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        d.deserialize_option(OptionKeyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Doc {
        #[serde(
            default,
            with = "option_record_key",
            skip_serializing_if = "Option::is_none"
        )]
        id: Option<String>,
        name: String,
    }

    #[test]
    fn deserializes_plain_and_prefixed_keys() {
        let doc: Doc = serde_json::from_str(r#"{"id": "25040101", "name": "a"}"#).unwrap();
        assert_eq!(doc.id.as_deref(), Some("25040101"));

        let doc: Doc = serde_json::from_str(r#"{"id": "bill:⟨25040101⟩", "name": "a"}"#).unwrap();
        assert_eq!(doc.id.as_deref(), Some("25040101"));
    }

    #[test]
    fn missing_id_serializes_without_field() {
        let doc = Doc {
            id: None,
            name: "a".into(),
        };
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(json, r#"{"name":"a"}"#);
    }

    #[test]
    fn id_serializes_as_bare_key() {
        let doc = Doc {
            id: Some("25040101".into()),
            name: "a".into(),
        };
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains(r#""id":"25040101""#));
    }
}
