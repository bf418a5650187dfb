//! JSON + attachments to `multipart/form-data`.
//!
//! Top-level string fields go out as text parts as-is; any other JSON value
//! is stringified (so `teamMembers` arrives as a JSON string). Attachments
//! become file parts carrying their name and MIME type.

use anyhow::Result;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use atrium_core::{ApiError, Attachment};

pub fn build_form(fields: &Value, attachments: Vec<Attachment>) -> Result<Form> {
    let map = match fields {
        Value::Object(map) => map,
        Value::Null => return attach(Form::new(), attachments),
        _ => {
            return Err(ApiError::bad_request("Multipart fields must be a JSON object").into_anyhow())
        }
    };

    let mut form = Form::new();
    for (name, value) in map {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        form = form.text(name.clone(), text);
    }

    attach(form, attachments)
}

fn attach(mut form: Form, attachments: Vec<Attachment>) -> Result<Form> {
    for Attachment {
        field,
        file_name,
        mime_type,
        bytes,
    } in attachments
    {
        let part = Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(&mime_type)
            .map_err(|e| {
                ApiError::bad_request(format!("Invalid MIME type {mime_type} for {file_name}"))
                    .with_source(e.into())
                    .into_anyhow()
            })?;
        form = form.part(field, part);
    }
    Ok(form)
}
