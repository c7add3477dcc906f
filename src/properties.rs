//! Spark session properties: the static definition table, merging caller
//! overrides over defaults, and shaping the result into a Livy create request.

use livy_client::{CreateSession, SessionKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Properties Livy expects as JSON lists but users often type as CSV.
const LIST_PROPERTIES: [&str; 4] = ["archives", "jars", "files", "pyFiles"];

/// How a property's value is edited and validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyType {
    /// List of `{key, value}` Spark conf entries
    Settings,
    /// Comma separated HDFS paths
    CsvHdfsFiles,
    /// JVM memory size such as `1G`
    Jvm,
    Number,
    String,
}

/// Default value of a property definition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DefaultValue {
    EmptyList,
    Str(&'static str),
    Int(i64),
}

impl DefaultValue {
    pub fn to_value(self) -> Value {
        match self {
            DefaultValue::EmptyList => Value::Array(Vec::new()),
            DefaultValue::Str(s) => Value::String(s.to_string()),
            DefaultValue::Int(n) => Value::from(n),
        }
    }
}

/// Static description of one configurable session property.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PropertyDefinition {
    pub name: &'static str,
    pub label: &'static str,
    pub help_text: &'static str,
    #[serde(rename = "type")]
    pub value_type: PropertyType,
    pub multiple: bool,
    /// Only meaningful when Spark runs on YARN
    pub yarn_only: bool,
    pub default_value: DefaultValue,
}

/// Session properties offered for every Spark interpreter.
pub const SPARK_PROPERTIES: &[PropertyDefinition] = &[
    PropertyDefinition {
        name: "conf",
        label: "Spark Conf",
        help_text: "Add one or more Spark conf properties to the session.",
        value_type: PropertyType::Settings,
        multiple: true,
        yarn_only: false,
        default_value: DefaultValue::EmptyList,
    },
    PropertyDefinition {
        name: "jars",
        label: "Jars",
        help_text: "Add one or more JAR files to the list of resources.",
        value_type: PropertyType::CsvHdfsFiles,
        multiple: true,
        yarn_only: false,
        default_value: DefaultValue::EmptyList,
    },
    PropertyDefinition {
        name: "files",
        label: "Files",
        help_text: "Files to be placed in the working directory of each executor.",
        value_type: PropertyType::CsvHdfsFiles,
        multiple: true,
        yarn_only: false,
        default_value: DefaultValue::EmptyList,
    },
    PropertyDefinition {
        name: "pyFiles",
        label: "pyFiles",
        help_text: "Python files to be placed in the working directory of each executor.",
        value_type: PropertyType::CsvHdfsFiles,
        multiple: true,
        yarn_only: false,
        default_value: DefaultValue::EmptyList,
    },
    PropertyDefinition {
        name: "driverMemory",
        label: "Driver Memory",
        help_text: "Amount of memory to use for the driver process in GB. (Default: 1). ",
        value_type: PropertyType::Jvm,
        multiple: false,
        yarn_only: false,
        default_value: DefaultValue::Str("1G"),
    },
    PropertyDefinition {
        name: "driverCores",
        label: "Driver Cores",
        help_text: "Number of cores used by the driver, only in cluster mode (Default: 1)",
        value_type: PropertyType::Number,
        multiple: false,
        yarn_only: true,
        default_value: DefaultValue::Int(1),
    },
    PropertyDefinition {
        name: "executorMemory",
        label: "Executor Memory",
        help_text: "Amount of memory to use per executor process in GB. (Default: 1)",
        value_type: PropertyType::Jvm,
        multiple: false,
        yarn_only: true,
        default_value: DefaultValue::Str("1G"),
    },
    PropertyDefinition {
        name: "executorCores",
        label: "Executor Cores",
        help_text: "Number of cores used by the driver, only in cluster mode (Default: 1)",
        value_type: PropertyType::Number,
        multiple: false,
        yarn_only: true,
        default_value: DefaultValue::Int(1),
    },
    PropertyDefinition {
        name: "queue",
        label: "Queue",
        help_text: "The YARN queue to submit to, only in cluster mode (Default: default)",
        value_type: PropertyType::String,
        multiple: false,
        yarn_only: true,
        default_value: DefaultValue::Str("default"),
    },
    PropertyDefinition {
        name: "archives",
        label: "Archives",
        help_text: "Archives to be extracted into the working directory of each executor, only in cluster mode.",
        value_type: PropertyType::CsvHdfsFiles,
        multiple: true,
        yarn_only: true,
        default_value: DefaultValue::EmptyList,
    },
];

/// A named property value as supplied by users and persisted with sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: Value,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parse a `name=value` pair as typed on the command line.
    ///
    /// Values that parse as JSON (numbers, lists) keep their type, anything
    /// else is taken as a string.
    pub fn parse_assignment(input: &str) -> Option<Self> {
        let (name, raw) = input.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let raw = raw.trim();
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        Some(Self::new(name, value))
    }
}

/// Overlay caller properties onto the defaults of `definitions`.
///
/// The result follows the definition order. A caller value replaces the
/// default of the same name (the last one wins if a name repeats). Caller
/// properties without a definition are appended in the order given, since
/// Livy accepts creation fields this table does not describe.
pub fn merge_properties(definitions: &[PropertyDefinition], overrides: &[Property]) -> Vec<Property> {
    let lookup = |name: &str| overrides.iter().rev().find(|p| p.name == name);

    let mut merged: Vec<Property> = definitions
        .iter()
        .map(|def| match lookup(def.name) {
            Some(p) => p.clone(),
            None => Property::new(def.name, def.default_value.to_value()),
        })
        .collect();

    for property in overrides {
        let known = definitions.iter().any(|def| def.name == property.name);
        let seen = merged.iter().any(|p| p.name == property.name);
        if !known && !seen {
            if let Some(latest) = lookup(&property.name) {
                merged.push(latest.clone());
            }
        }
    }

    merged
}

/// Restrict merged properties to the definition table, as stored with a session.
pub fn to_properties(definitions: &[PropertyDefinition], merged: &[Property]) -> Vec<Property> {
    definitions
        .iter()
        .map(|def| {
            merged
                .iter()
                .find(|p| p.name == def.name)
                .cloned()
                .unwrap_or_else(|| Property::new(def.name, def.default_value.to_value()))
        })
        .collect()
}

/// Shape merged properties into the body Livy expects for `POST /sessions`.
///
/// CSV strings for list-typed properties are split into lists and the `conf`
/// list of `{key, value}` entries becomes a JSON object.
pub fn livy_request(kind: SessionKind, merged: &[Property]) -> CreateSession {
    let mut properties = Map::new();

    for property in merged {
        let value = if LIST_PROPERTIES.contains(&property.name.as_str()) {
            coerce_list(&property.name, &property.value)
        } else if property.name == "conf" {
            conf_to_map(&property.value)
        } else {
            property.value.clone()
        };
        properties.insert(property.name.clone(), value);
    }

    tracing::debug!("Session request properties: {:?}", properties);
    CreateSession { kind, properties }
}

fn coerce_list(name: &str, value: &Value) -> Value {
    match value {
        Value::String(csv) => {
            tracing::debug!("Check List type: {} was not a list", name);
            Value::Array(
                csv.split(',')
                    .map(|item| Value::String(item.to_string()))
                    .collect(),
            )
        }
        other => other.clone(),
    }
}

fn conf_to_map(value: &Value) -> Value {
    match value {
        Value::Array(entries) => {
            let mut conf = Map::new();
            for entry in entries {
                let key = entry.get("key").and_then(Value::as_str);
                if let Some(key) = key {
                    let value = entry.get("value").cloned().unwrap_or(Value::Null);
                    conf.insert(key.to_string(), value);
                }
            }
            Value::Object(conf)
        }
        Value::Object(_) => value.clone(),
        _ => Value::Object(Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn value_of<'a>(props: &'a [Property], name: &str) -> &'a Value {
        &props.iter().find(|p| p.name == name).unwrap().value
    }

    #[test]
    fn defaults_when_no_overrides() {
        let merged = merge_properties(SPARK_PROPERTIES, &[]);
        assert_eq!(merged.len(), SPARK_PROPERTIES.len());
        assert_eq!(value_of(&merged, "driverMemory"), &json!("1G"));
        assert_eq!(value_of(&merged, "queue"), &json!("default"));
        assert_eq!(value_of(&merged, "jars"), &json!([]));
    }

    #[test]
    fn caller_value_wins() {
        let merged = merge_properties(SPARK_PROPERTIES, &[Property::new("driverMemory", "2G")]);

        assert_eq!(value_of(&merged, "driverMemory"), &json!("2G"));
        for def in SPARK_PROPERTIES.iter().filter(|d| d.name != "driverMemory") {
            assert_eq!(value_of(&merged, def.name), &def.default_value.to_value());
        }
    }

    #[test]
    fn unknown_caller_properties_are_appended() {
        let merged = merge_properties(
            SPARK_PROPERTIES,
            &[Property::new("numExecutors", 4), Property::new("numExecutors", 8)],
        );
        assert_eq!(merged.len(), SPARK_PROPERTIES.len() + 1);
        assert_eq!(merged.last().unwrap(), &Property::new("numExecutors", 8));
    }

    #[test]
    fn to_properties_drops_unknown_names() {
        let merged = merge_properties(SPARK_PROPERTIES, &[Property::new("numExecutors", 4)]);
        let stored = to_properties(SPARK_PROPERTIES, &merged);
        assert_eq!(stored.len(), SPARK_PROPERTIES.len());
        assert!(stored.iter().all(|p| p.name != "numExecutors"));
    }

    #[test]
    fn livy_request_coerces_csv_lists_and_conf() {
        let merged = merge_properties(
            SPARK_PROPERTIES,
            &[
                Property::new("jars", "hdfs:///a.jar,hdfs:///b.jar"),
                Property::new(
                    "conf",
                    json!([
                        {"key": "spark.executor.instances", "value": "3"},
                        {"key": "spark.ui.enabled", "value": "false"}
                    ]),
                ),
            ],
        );

        let request = livy_request(SessionKind::Scala, &merged);
        assert_eq!(request.kind, SessionKind::Scala);
        assert_eq!(
            request.properties["jars"],
            json!(["hdfs:///a.jar", "hdfs:///b.jar"])
        );
        assert_eq!(
            request.properties["conf"],
            json!({"spark.executor.instances": "3", "spark.ui.enabled": "false"})
        );
        assert_eq!(request.properties["archives"], json!([]));
        assert_eq!(request.properties["driverCores"], json!(1));
    }

    #[test]
    fn parse_assignment_keeps_json_types() {
        assert_eq!(
            Property::parse_assignment("driverMemory=2G"),
            Some(Property::new("driverMemory", "2G"))
        );
        assert_eq!(
            Property::parse_assignment("driverCores = 4"),
            Some(Property::new("driverCores", 4))
        );
        assert_eq!(Property::parse_assignment("=1"), None);
        assert_eq!(Property::parse_assignment("novalue"), None);
    }

    fn arb_overrides() -> impl Strategy<Value = Vec<Property>> {
        let names: Vec<&'static str> = SPARK_PROPERTIES.iter().map(|d| d.name).collect();
        prop::collection::vec(
            (prop::sample::select(names), "[a-zA-Z0-9]{1,8}"),
            0..8,
        )
        .prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(name, value)| Property::new(name, value))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn merge_follows_definition_order(overrides in arb_overrides()) {
            let merged = merge_properties(SPARK_PROPERTIES, &overrides);

            prop_assert_eq!(merged.len(), SPARK_PROPERTIES.len());
            for (def, property) in SPARK_PROPERTIES.iter().zip(&merged) {
                prop_assert_eq!(def.name, property.name.as_str());
                let expected = overrides
                    .iter()
                    .rev()
                    .find(|p| p.name == def.name)
                    .map(|p| p.value.clone())
                    .unwrap_or_else(|| def.default_value.to_value());
                prop_assert_eq!(&property.value, &expected);
            }
        }
    }
}
