//! Shared pieces of the JSON metadata schema.
//!
//! Every asset codec keeps its own private metadata struct; this module holds
//! what they have in common.  Decoding is lenient in the same way everywhere:
//! missing keys take their default and integer fields also accept a decimal
//! string.  Writing always produces plain JSON numbers.

use serde::de::{Deserializer, Error as _};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(u64),
    Str(String),
}

/// `deserialize_with` target for integer fields: accepts `128` or `"128"`.
pub(crate) fn lenient_int<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let value = match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(v) => v,
        IntOrString::Str(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| D::Error::custom(format!("expected an integer, found {s:?}")))?,
    };
    T::try_from(value).map_err(|_| D::Error::custom(format!("integer {value} is out of range")))
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

/// `{"x": .., "y": ..}` object; `z` only appears when non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Extents {
    #[serde(deserialize_with = "lenient_int")]
    pub x: u32,
    #[serde(deserialize_with = "lenient_int")]
    pub y: u32,
    #[serde(deserialize_with = "lenient_int", skip_serializing_if = "is_zero")]
    pub z: u32,
}

/// Compact JSON, no whitespace.
pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

pub(crate) fn from_json<'a, T: Deserialize<'a>>(metadata: &'a str) -> Result<T> {
    Ok(serde_json::from_str(metadata)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct Probe {
        #[serde(deserialize_with = "lenient_int")]
        count: u32,
        #[serde(deserialize_with = "lenient_int")]
        bits: u8,
    }

    #[test]
    fn integers_accept_strings() {
        let p: Probe = from_json(r#"{"count":"128","bits":16}"#).unwrap();
        assert_eq!(p.count, 128);
        assert_eq!(p.bits, 16);
    }

    #[test]
    fn missing_keys_default() {
        let p: Probe = from_json("{}").unwrap();
        assert_eq!(p.count, 0);
        assert_eq!(p.bits, 0);
    }

    #[test]
    fn out_of_range_is_an_error() {
        assert!(from_json::<Probe>(r#"{"bits":300}"#).is_err());
        assert!(from_json::<Probe>(r#"{"count":"lots"}"#).is_err());
        assert!(from_json::<Probe>(r#"{"count":-1}"#).is_err());
    }

    #[test]
    fn extents_skip_zero_depth() {
        let e = Extents { x: 4, y: 2, z: 0 };
        assert_eq!(to_json(&e).unwrap(), r#"{"x":4,"y":2}"#);
        let e = Extents { x: 4, y: 2, z: 3 };
        assert_eq!(to_json(&e).unwrap(), r#"{"x":4,"y":2,"z":3}"#);
    }
}
