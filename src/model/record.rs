use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A row as returned by the ServiceNow Table API.
///
/// ServiceNow usually sends every field as a string, but numeric priorities
/// and missing columns show up often enough that every field is lenient.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub sys_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub short_description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub priority: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        // Reference fields come back as {"link": .., "value": ..}
        Some(Value::Object(obj)) => obj.get("value").and_then(|v| v.as_str()).map(String::from),
        Some(Value::Array(_)) => None,
    })
}

/// A source ticket, normalized and ready to migrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// ServiceNow `sys_id`. Never used for deduplication.
    pub id: String,
    /// Table the record was read from.
    pub collection: String,
    /// Ticket number; the deduplication key. Empty for malformed rows.
    pub natural_key: String,
    pub summary: String,
    pub description: String,
    pub status: String,
    pub priority: String,
}

impl SourceRecord {
    pub fn from_raw(collection: &str, raw: RawRecord) -> Self {
        let number = non_empty(raw.number);
        let name = non_empty(raw.name);

        let summary = non_empty(raw.short_description)
            .or_else(|| name.clone())
            .or_else(|| number.clone())
            .unwrap_or_else(|| "No summary".to_string());

        let natural_key = number.or(name).unwrap_or_default();

        Self {
            id: raw.sys_id.unwrap_or_default(),
            collection: collection.to_string(),
            natural_key,
            summary,
            description: raw.description.unwrap_or_default(),
            status: raw.state.unwrap_or_default(),
            priority: raw.priority.unwrap_or_default(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
