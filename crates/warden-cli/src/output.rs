//! Text/JSON output duality (§6, §7): every command renders either a plain
//! line per fact or a single JSON object, and every error prints one line
//! with a `✗` icon in text mode or `{status:"error", message}` in JSON mode.

use crate::cli::OutputFormat;
use warden_core::WardenError;

pub fn print_error(err: &WardenError, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let body = serde_json::json!({"status": "error", "message": err.to_string()});
            println!("{}", serde_json::to_string(&body).unwrap_or_default());
        }
        OutputFormat::Text => {
            println!("✗ {err}");
        }
    }
}

pub fn print_info(format: OutputFormat, message: &str, fields: serde_json::Value) {
    match format {
        OutputFormat::Json => {
            let mut body = fields;
            if let serde_json::Value::Object(map) = &mut body {
                map.insert("status".to_string(), serde_json::json!("ok"));
                map.insert("message".to_string(), serde_json::json!(message));
            }
            println!("{}", serde_json::to_string(&body).unwrap_or_default());
        }
        OutputFormat::Text => {
            println!("✓ {message}");
        }
    }
}

pub fn print_json(format: OutputFormat, value: &serde_json::Value, text_lines: &[String]) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
        }
        OutputFormat::Text => {
            for line in text_lines {
                println!("{line}");
            }
        }
    }
}
