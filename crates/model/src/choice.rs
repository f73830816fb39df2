use crate::lenient::Text;
use alloc::{
    fmt::{self, Formatter},
    string::{String, ToString},
    vec::Vec,
};
use serde::{
    de::{IgnoredAny, MapAccess, SeqAccess, Visitor},
    Deserialize, Deserializer, Serialize,
};

/// A single selectable option of a question.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Choice {
    /// Label the answer is keyed by (e.g. `A`).
    pub key: String,
    /// Text shown next to the label.
    pub value: String,
}

impl Choice {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// Splits a label such as `A)`, `b.` or `C:` off the front of a bare option string.
fn split_label(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    let end = text.find([')', '.', ':'])?;
    let (label, rest) = text.split_at(end);
    let label = label.trim().trim_start_matches('(');
    let mut chars = label.chars();
    let single = chars.next().is_some_and(char::is_alphanumeric) && chars.next().is_none();
    single.then(|| (label, rest[1..].trim()))
}

/// Label for the option at `index` when the payload did not give one.
fn positional_key(index: usize) -> String {
    match u8::try_from(index).ok().filter(|&index| index < 26) {
        Some(index) => String::from(char::from(b'A' + index)),
        None => (index + 1).to_string(),
    }
}

/// One element of an option list: `{"key": .., "value": ..}`, a bare string or a scalar.
struct Entry {
    key: Option<String>,
    value: Option<String>,
}

struct EntryVisitor;

impl<'de> Visitor<'de> for EntryVisitor {
    type Value = Entry;

    fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter.write_str("an option")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(match split_label(v) {
            Some((key, value)) => Entry { key: Some(String::from(key)), value: Some(String::from(value)) },
            None => Entry { key: None, value: Some(String::from(v.trim())) },
        })
    }

    fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(Entry { key: None, value: Some(v.to_string()) })
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Entry { key: None, value: Some(v.to_string()) })
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Entry { key: None, value: Some(v.to_string()) })
    }

    fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Entry { key: None, value: Some(v.to_string()) })
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(Entry { key: None, value: None })
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Entry { key: None, value: None })
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entry = Entry { key: None, value: None };
        while let Some(field) = map.next_key::<String>()? {
            let Text(text) = map.next_value()?;
            match field.as_str() {
                "key" | "label" | "letter" => entry.key = text,
                "value" | "text" => entry.value = text,
                _ => continue,
            }
        }
        Ok(entry)
    }
}

impl<'de> Deserialize<'de> for Entry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(EntryVisitor)
    }
}

struct ChoicesVisitor;

impl<'de> Visitor<'de> for ChoicesVisitor {
    type Value = Vec<Choice>;

    fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter.write_str("a list of keyed options or a map from option key to text")
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(Vec::new())
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(Vec::new())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    // A lone scalar cannot be split into options.
    fn visit_str<E: serde::de::Error>(self, _: &str) -> Result<Self::Value, E> {
        Ok(Vec::new())
    }

    fn visit_bool<E: serde::de::Error>(self, _: bool) -> Result<Self::Value, E> {
        Ok(Vec::new())
    }

    fn visit_i64<E: serde::de::Error>(self, _: i64) -> Result<Self::Value, E> {
        Ok(Vec::new())
    }

    fn visit_u64<E: serde::de::Error>(self, _: u64) -> Result<Self::Value, E> {
        Ok(Vec::new())
    }

    fn visit_f64<E: serde::de::Error>(self, _: f64) -> Result<Self::Value, E> {
        Ok(Vec::new())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut choices = Vec::with_capacity(seq.size_hint().unwrap_or_default());
        let mut index = 0;
        while let Some(Entry { key, value }) = seq.next_element()? {
            if key.is_none() && value.is_none() {
                continue;
            }
            let key = key.unwrap_or_else(|| positional_key(index));
            choices.push(Choice { key, value: value.unwrap_or_default() });
            index += 1;
        }
        Ok(choices)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        // Map order is the order the options were written in.
        let mut choices = Vec::with_capacity(map.size_hint().unwrap_or_default());
        while let Some((key, Text(value))) = map.next_entry::<String, Text>()? {
            choices.push(Choice { key, value: value.unwrap_or_default() });
        }
        Ok(choices)
    }
}

/// Accepts options as `[{"key": "A", "value": ".."}]`, as `{"A": ".."}` or as bare strings
/// like `["A) ..", "B) .."]`. Anything else yields no options.
pub fn deserialize_choices<'de, D>(deserializer: D) -> Result<Vec<Choice>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(ChoicesVisitor)
}
