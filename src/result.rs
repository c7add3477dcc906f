//! Normalization of statement output into rows, schema and images.
//!
//! Livy reports a finished statement's output as a map from mime type to
//! content. The extractors below are tried in order and the first one whose
//! mime type is present decides the shape of the result.

use base64::Engine;
use livy_client::StatementOutput;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Result, SparkError};

pub const LIVY_TABLE_MIME: &str = "application/vnd.livy.table.v1+json";
pub const JSON_MIME: &str = "application/json";
pub const PNG_MIME: &str = "image/png";
pub const TEXT_MIME: &str = "text/plain";

/// Column name and type used for plain text output
const TEXT_COLUMN: &str = "Header";
const TEXT_COLUMN_TYPE: &str = "STRING_TYPE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Table,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub comment: String,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            comment: String::new(),
        }
    }
}

/// Canonical shape of a statement's result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultPayload {
    pub rows: Vec<Vec<Value>>,
    pub schema: Vec<Column>,
    /// Decoded PNG images
    #[serde(serialize_with = "serialize_images")]
    pub images: Vec<Vec<u8>>,
    pub kind: ResultKind,
}

fn serialize_images<S: Serializer>(images: &[Vec<u8>], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    let engine = base64::engine::general_purpose::STANDARD;
    serializer.collect_seq(images.iter().map(|image| engine.encode(image)))
}

#[derive(Debug, Deserialize)]
struct LivyTable {
    headers: Vec<LivyTableHeader>,
    #[serde(default)]
    data: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct LivyTableHeader {
    name: String,
    #[serde(rename = "type")]
    data_type: String,
}

#[derive(Debug, Deserialize)]
struct JsonResult {
    #[serde(default)]
    data: Vec<Vec<Value>>,
    schema: JsonSchema,
}

#[derive(Debug, Deserialize)]
struct JsonSchema {
    fields: Vec<JsonField>,
}

#[derive(Debug, Deserialize)]
struct JsonField {
    name: String,
    #[serde(rename = "type")]
    data_type: Value,
}

/// Decoded content of one mime entry.
#[derive(Debug)]
enum Content {
    Table {
        rows: Vec<Vec<Value>>,
        schema: Vec<Column>,
    },
    Text(String),
}

type Extractor = fn(&Value) -> Result<Content>;

/// Mime types that decide the result shape, by priority.
const EXTRACTORS: &[(&str, Extractor)] = &[
    (LIVY_TABLE_MIME, extract_livy_table),
    (JSON_MIME, extract_json),
    (TEXT_MIME, extract_text),
];

fn extract_livy_table(value: &Value) -> Result<Content> {
    let table: LivyTable = decode(LIVY_TABLE_MIME, value)?;
    Ok(Content::Table {
        schema: table
            .headers
            .into_iter()
            .map(|h| Column::new(h.name, h.data_type))
            .collect(),
        rows: table.data,
    })
}

fn extract_json(value: &Value) -> Result<Content> {
    let result: JsonResult = decode(JSON_MIME, value)?;
    Ok(Content::Table {
        schema: result
            .schema
            .fields
            .into_iter()
            .map(|f| {
                let data_type = match f.data_type {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                Column::new(f.name, data_type)
            })
            .collect(),
        rows: result.data,
    })
}

fn extract_text(value: &Value) -> Result<Content> {
    Ok(Content::Text(match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }))
}

fn decode<T: serde::de::DeserializeOwned>(mime: &str, value: &Value) -> Result<T> {
    T::deserialize(value).map_err(|e| SparkError::InvalidPayload(format!("{}: {}", mime, e)))
}

fn extract_images(data: &Map<String, Value>) -> Result<Vec<Vec<u8>>> {
    let Some(encoded) = data.get(PNG_MIME) else {
        return Ok(Vec::new());
    };
    let encoded = encoded
        .as_str()
        .ok_or_else(|| SparkError::InvalidPayload(format!("{} is not a string", PNG_MIME)))?;
    let image = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| SparkError::InvalidPayload(format!("{}: {}", PNG_MIME, e)))?;
    Ok(vec![image])
}

/// Turn a finished statement's output into a [`ResultPayload`].
///
/// Error output becomes [`SparkError::Statement`] with the traceback, or
/// `ename: evalue` when there is none. When `start_over` is false the rows
/// are always empty: resuming a partial fetch is not supported.
pub fn normalize(output: &StatementOutput, start_over: bool) -> Result<ResultPayload> {
    match output {
        StatementOutput::Ok { data, .. } => {
            let extractor = EXTRACTORS.iter().find(|(mime, _)| data.contains_key(*mime));

            let (mime, mut payload) = match extractor {
                Some((mime, extractor)) => (Some(*mime), payload_from(extractor(&data[*mime])?)),
                // A plot with no accompanying text
                None if data.contains_key(PNG_MIME) => (None, text_payload(Vec::new())),
                None => {
                    return Err(SparkError::InvalidPayload(
                        "output has no supported content type".to_string(),
                    ))
                }
            };

            // Livy tables never carry plots
            if mime != Some(LIVY_TABLE_MIME) {
                payload.images = extract_images(data)?;
            }

            if !start_over {
                payload.rows.clear();
            }
            Ok(payload)
        }
        StatementOutput::Error {
            ename,
            evalue,
            traceback,
            ..
        } => Err(SparkError::Statement(error_message(
            ename.as_deref(),
            evalue.as_deref(),
            traceback.as_deref(),
        ))),
        StatementOutput::Unknown => Err(SparkError::InvalidPayload(
            "unexpected statement output status".to_string(),
        )),
    }
}

fn payload_from(content: Content) -> ResultPayload {
    match content {
        Content::Table { rows, schema } => ResultPayload {
            rows,
            schema,
            images: Vec::new(),
            kind: ResultKind::Table,
        },
        Content::Text(text) => text_payload(vec![vec![Value::String(text)]]),
    }
}

fn text_payload(rows: Vec<Vec<Value>>) -> ResultPayload {
    ResultPayload {
        rows,
        schema: vec![Column::new(TEXT_COLUMN, TEXT_COLUMN_TYPE)],
        images: Vec::new(),
        kind: ResultKind::Text,
    }
}

fn error_message(ename: Option<&str>, evalue: Option<&str>, traceback: Option<&[String]>) -> String {
    match traceback {
        Some(lines) if !lines.is_empty() => lines.concat(),
        _ => {
            let name = ename.unwrap_or("unknown error");
            match evalue {
                Some(value) => format!("{}: {}", name, value),
                None => name.to_string(),
            }
        }
    }
}
