use std::io::IsTerminal;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use camwire_client::Setting;
use camwire_frame::{ImageFrame, Value};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    index: u64,
    width: u16,
    height: u16,
    payload_size: usize,
    saved_to: Option<String>,
    timestamp_ms: &'a str,
}

pub fn print_frame(index: u64, frame: &ImageFrame, saved_to: Option<&Path>, format: OutputFormat) {
    let saved_to = saved_to.map(|path| path.display().to_string());
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                index,
                width: frame.width,
                height: frame.height,
                payload_size: frame.payload.len(),
                saved_to,
                timestamp_ms: &now_unix_millis(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        // One row per frame; a table per line would be unreadable.
        OutputFormat::Table | OutputFormat::Pretty => {
            let saved = saved_to
                .map(|path| format!(" saved={path}"))
                .unwrap_or_default();
            println!(
                "frame={index} {}x{} size={}{saved}",
                frame.width,
                frame.height,
                frame.payload.len()
            );
        }
    }
}

#[derive(Serialize)]
struct SettingOutput<'a> {
    setting: Setting,
    sub_command: u32,
    wire_type: &'static str,
    value: Option<&'a Value>,
}

pub fn print_settings(values: &[(Setting, Option<Value>)], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<SettingOutput<'_>> = values
                .iter()
                .map(|(setting, value)| SettingOutput {
                    setting: *setting,
                    sub_command: setting.sub_code(),
                    wire_type: setting.wire_type().name(),
                    value: value.as_ref(),
                })
                .collect();
            let json = if out.len() == 1 {
                serde_json::to_string(&out[0])
            } else {
                serde_json::to_string(&out)
            };
            println!("{}", json.unwrap_or_else(|_| "{}".to_string()));
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SETTING", "CODE", "TYPE", "VALUE", "DESCRIPTION"]);
            for (setting, value) in values {
                table.add_row(vec![
                    setting.name().to_string(),
                    format!("0x{:02X}", setting.sub_code()),
                    setting.wire_type().name().to_string(),
                    value_text(value.as_ref()),
                    setting.description().to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (setting, value) in values {
                println!("{:<12} {}", setting.name(), value_text(value.as_ref()));
            }
        }
    }
}

/// Print a flat record: JSON object, two-column table, or `key=value` lines.
pub fn print_record<T: Serialize>(record: &T, fields: &[(&str, String)], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (name, value) in fields {
                table.add_row(vec![name.to_string(), value.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line = fields
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            println!("{line}");
        }
    }
}

fn value_text(value: Option<&Value>) -> String {
    value.map_or_else(|| "<empty>".to_string(), Value::to_string)
}

fn now_unix_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_output_serializes_table_names() {
        let value = Value::Float32(2.5);
        let out = SettingOutput {
            setting: Setting::DgainGr,
            sub_command: Setting::DgainGr.sub_code(),
            wire_type: Setting::DgainGr.wire_type().name(),
            value: Some(&value),
        };
        let json = serde_json::to_string(&out).expect("setting output should serialize");
        assert!(json.contains("\"setting\":\"DGAIN_GR\""));
        assert!(json.contains("\"sub_command\":10"));
        assert!(json.contains("\"value\":2.5"));
    }

    #[test]
    fn empty_value_text() {
        assert_eq!(value_text(None), "<empty>");
        assert_eq!(value_text(Some(&Value::Bool(true))), "true");
    }
}
