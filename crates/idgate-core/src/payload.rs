//! Wire bodies of the user-mutation routes.
//!
//! The backend speaks the protobuf JSON mapping: field names are
//! lowerCamelCase and `bytes` fields travel as base64 strings. Snake-case
//! names are accepted on input as the mapping allows.
//!
//! Note the label swap inherited from the product UI: the wire `email`
//! field is the login "username" and the wire `username` field is the
//! display "name".

use serde::{Deserialize, Serialize};

/// Body of a create-user request (the backend's `Password` object).
///
/// `hash` arrives holding the plaintext password and leaves holding its
/// bcrypt hash. `user_id` is always replaced by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    /// Login identifier ("username" in the UI).
    #[serde(default)]
    pub email: String,
    /// Plaintext password on the way in, bcrypt hash on the way out.
    #[serde(default, with = "base64_bytes")]
    pub hash: Vec<u8>,
    /// Display name ("name" in the UI).
    #[serde(default)]
    pub username: String,
    /// Backend user id.
    #[serde(default, alias = "user_id")]
    pub user_id: String,
}

/// Body of an update-user request (the backend's `UpdatePasswordReq`).
///
/// Absent optional fields are forwarded as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    /// Login identifier of the user to update, taken from the path.
    #[serde(default)]
    pub email: String,
    /// New password, plaintext on the way in.
    #[serde(
        default,
        alias = "new_hash",
        with = "base64_bytes::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub new_hash: Option<Vec<u8>>,
    /// New display name.
    #[serde(
        default,
        alias = "new_username",
        skip_serializing_if = "Option::is_none"
    )]
    pub new_username: Option<String>,
}

/// Serde adapter for protobuf `bytes` fields.
pub mod base64_bytes {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Encodes with the standard padded alphabet.
    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    /// Decodes standard or URL-safe base64, padded or not. `null` decodes as empty.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        decode(&s).map_err(serde::de::Error::custom)
    }

    /// Decodes a base64 string in any of the alphabets the mapping accepts.
    pub fn decode(s: &str) -> Result<Vec<u8>, String> {
        [&STANDARD, &STANDARD_NO_PAD, &URL_SAFE, &URL_SAFE_NO_PAD]
            .iter()
            .find_map(|engine| engine.decode(s).ok())
            .ok_or_else(|| format!("invalid base64 value {s:?}"))
    }

    /// Adapter for optional `bytes` fields.
    pub mod option {
        use super::STANDARD;
        use base64::Engine;
        use serde::{Deserialize, Deserializer, Serializer};

        /// Encodes a present value; absent values are skipped by the caller.
        pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match bytes {
                Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
                None => serializer.serialize_none(),
            }
        }

        /// Decodes an optional base64 string; `null` decodes as absent.
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|s| super::decode(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
