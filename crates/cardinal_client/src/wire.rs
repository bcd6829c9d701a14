//! Serde helpers for the API's wire conventions.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`). Pair with `#[serde(default)]`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Split a `/`-delimited command list. Empty segments are dropped.
pub fn split_commands(raw: &str) -> Vec<String> {
    raw.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join a command list into its `/`-delimited wire form.
pub fn join_commands(commands: &[String]) -> String {
    commands.join("/")
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCommands {
    Joined(String),
    List(Vec<String>),
}

impl From<RawCommands> for Vec<String> {
    fn from(raw: RawCommands) -> Self {
        match raw {
            RawCommands::Joined(joined) => split_commands(&joined),
            RawCommands::List(list) => list,
        }
    }
}

/// `disabledCommands` on an all-optional patch: `/`-joined on the wire,
/// a list locally. Arrays are accepted on input as well.
pub(crate) mod commands {
    use super::*;

    pub(crate) fn serialize<S: Serializer>(
        commands: &Option<Vec<String>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match commands {
            Some(list) => serializer.serialize_str(&join_commands(list)),
            None => serializer.serialize_none(),
        }
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<String>>, D::Error> {
        Ok(Option::<RawCommands>::deserialize(deserializer)?.map(Vec::from))
    }

    pub(crate) fn serialize_list<S: Serializer>(
        commands: &[String],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&join_commands(commands))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Text(DateTime<Utc>),
}

/// Timestamps arrive either as RFC 3339 text or as epoch milliseconds.
pub(crate) fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawTimestamp>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawTimestamp::Text(at)) => Ok(Some(at)),
        Some(RawTimestamp::Millis(ms)) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {ms}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct Holder {
        #[serde(
            default,
            with = "commands",
            skip_serializing_if = "Option::is_none"
        )]
        disabled: Option<Vec<String>>,
        #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
        channel: Option<Option<String>>,
        #[serde(default, deserialize_with = "timestamp", skip_serializing)]
        at: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_split_commands() {
        assert_eq!(split_commands("ban/kick/warn"), vec!["ban", "kick", "warn"]);
        assert!(split_commands("").is_empty());
        assert_eq!(split_commands("ban//kick/"), vec!["ban", "kick"]);
    }

    #[test]
    fn test_commands_accept_string_array_or_absent() {
        let holder: Holder = serde_json::from_value(json!({ "disabled": "ban/kick" })).unwrap();
        assert_eq!(holder.disabled, Some(vec!["ban".to_string(), "kick".to_string()]));

        let holder: Holder = serde_json::from_value(json!({ "disabled": ["warn"] })).unwrap();
        assert_eq!(holder.disabled, Some(vec!["warn".to_string()]));

        let holder: Holder = serde_json::from_value(json!({})).unwrap();
        assert_eq!(holder.disabled, None);

        let holder: Holder = serde_json::from_value(json!({ "disabled": null })).unwrap();
        assert_eq!(holder.disabled, None);
    }

    #[test]
    fn test_commands_serialize_joined() {
        let holder = Holder {
            disabled: Some(vec!["ban".to_string(), "kick".to_string()]),
            ..Holder::default()
        };
        assert_eq!(serde_json::to_value(&holder).unwrap(), json!({ "disabled": "ban/kick" }));
    }

    #[test]
    fn test_nullable_separates_null_from_absent() {
        let absent: Holder = serde_json::from_value(json!({})).unwrap();
        assert_eq!(absent.channel, None);

        let null: Holder = serde_json::from_value(json!({ "channel": null })).unwrap();
        assert_eq!(null.channel, Some(None));

        let set: Holder = serde_json::from_value(json!({ "channel": "42" })).unwrap();
        assert_eq!(set.channel, Some(Some("42".to_string())));
    }

    #[test]
    fn test_timestamp_accepts_text_and_millis() {
        let text: Holder =
            serde_json::from_value(json!({ "at": "2021-03-01T12:00:00Z" })).unwrap();
        let millis: Holder = serde_json::from_value(json!({ "at": 1_614_600_000_000_i64 })).unwrap();
        assert_eq!(text.at, millis.at);
        assert!(text.at.is_some());
    }
}
