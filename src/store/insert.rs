//! INSERT construction for the send endpoint

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};

use super::ident::quote;
use crate::error::{ApiError, ApiResult};

/// Largest accepted attachment after base64 decoding
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

/// Raw send fields as they arrive in the request
#[derive(Debug, Default, Clone)]
pub struct SendFields<'a> {
    pub user_identifier: Option<&'a str>,
    pub sender: Option<&'a str>,
    pub admin_name: Option<&'a str>,
    pub message: Option<&'a str>,
    pub file_base64: Option<&'a str>,
    pub created_at: Option<&'a str>,
}

/// A validated message ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub user_identifier: String,
    pub sender: String,
    pub admin_name: String,
    pub message: String,
    pub file: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

/// One bound INSERT value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Bytes(Option<Vec<u8>>),
    Timestamp(DateTime<Utc>),
}

/// Parameterized INSERT plus its values, in placeholder order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertPlan {
    pub sql: String,
    pub columns: Vec<String>,
    pub values: Vec<FieldValue>,
}

fn trimmed(value: Option<&str>) -> &str {
    value.map_or("", str::trim)
}

/// Decode an attachment and enforce the size cap
pub fn decode_attachment(encoded: &str) -> ApiResult<Vec<u8>> {
    let cleaned: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| ApiError::invalid(format!("Invalid attachment encoding: {e}")))?;
    if bytes.len() > MAX_ATTACHMENT_BYTES {
        return Err(ApiError::invalid("Attachment too large (max 10MB)"));
    }
    Ok(bytes)
}

impl MessageDraft {
    /// Validate raw fields.
    ///
    /// `created_at` that is missing or unparsable becomes the current time.
    pub fn from_fields(fields: &SendFields<'_>) -> ApiResult<Self> {
        let user_identifier = trimmed(fields.user_identifier);
        if user_identifier.is_empty() {
            return Err(ApiError::invalid("user_identifier is required"));
        }

        let message = trimmed(fields.message);
        let file_base64 = fields.file_base64.filter(|f| !f.trim().is_empty());
        if message.is_empty() && file_base64.is_none() {
            return Err(ApiError::invalid("message or attachment is required"));
        }
        let file = file_base64.map(decode_attachment).transpose()?;

        let sender = match trimmed(fields.sender) {
            "" => "admin",
            s => s,
        };
        let created_at = fields
            .created_at
            .and_then(|s| crate::timefmt::parse_iso(s).ok())
            .unwrap_or_else(Utc::now);

        Ok(Self {
            user_identifier: user_identifier.to_string(),
            sender: sender.to_string(),
            admin_name: trimmed(fields.admin_name).to_string(),
            message: message.to_string(),
            file,
            created_at,
        })
    }

    /// Value for an insertable column, `None` for anything else (e.g. `id`)
    fn value_for(&self, column: &str) -> Option<FieldValue> {
        let value = match column {
            "user_identifier" => FieldValue::Text(self.user_identifier.clone()),
            "sender" => FieldValue::Text(self.sender.clone()),
            "admin_name" => FieldValue::Text(self.admin_name.clone()),
            "message" => FieldValue::Text(self.message.clone()),
            "file" => FieldValue::Bytes(self.file.clone()),
            "created_at" => FieldValue::Timestamp(self.created_at),
            _ => return None,
        };
        Some(value)
    }
}

/// Build the INSERT for already validated identifiers.
///
/// Only requested columns that the draft can fill are written, in request
/// order.
pub fn build_insert(table: &str, columns: &[String], draft: &MessageDraft) -> ApiResult<InsertPlan> {
    let (targets, values): (Vec<String>, Vec<FieldValue>) = columns
        .iter()
        .filter_map(|c| draft.value_for(c).map(|v| (c.clone(), v)))
        .unzip();

    if targets.is_empty() {
        return Err(ApiError::invalid(
            "No insertable columns found. Ensure columns include user_identifier, sender, message, created_at",
        ));
    }

    let column_list = targets.iter().map(|c| quote(c)).collect::<Vec<_>>().join(",");
    let placeholders = (1..=targets.len())
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(",");
    let sql = format!(
        "insert into {} ({column_list}) values ({placeholders}) returning *",
        quote(table)
    );

    Ok(InsertPlan {
        sql,
        columns: targets,
        values,
    })
}
