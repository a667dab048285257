use std::io::Read;

use anyhow::Context;
use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(data_value) = data {
                response["data"] = data_value;
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output a value: pretty JSON, or the given text rendering
pub fn output_data(output_format: &OutputFormat, data: Value, text: impl FnOnce() -> String) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "success": true, "data": data }))?);
        }
        OutputFormat::Text => {
            println!("{}", text());
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(output_format: &OutputFormat, collection_name: &str, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({
                collection_name: []
            }))?);
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// JSON from `--data`, or from stdin when no inline value was given
pub fn read_json_input(inline: Option<String>) -> anyhow::Result<Value> {
    let raw = match inline {
        Some(raw) => raw,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read JSON from stdin")?;
            buf
        }
    };
    serde_json::from_str(&raw).context("input is not valid JSON")
}

/// Text from the argument, or all of stdin when absent
pub fn read_text_input(inline: Option<String>) -> anyhow::Result<String> {
    match inline {
        Some(text) => Ok(text),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read text from stdin")?;
            Ok(buf.trim_end_matches('\n').to_string())
        }
    }
}
