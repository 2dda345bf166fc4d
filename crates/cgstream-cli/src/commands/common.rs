//! Shared CLI helpers used across multiple commands.

use std::path::Path;

use cgstream_config::{EngineConfig, load_graph};
use cgstream_core::RunReport;
use cgstream_core::event::Value;
use cgstream_core::scheduler::ScheduleMode;
use cgstream_registry::GraphDescription;

/// Load a graph description, with the path in the error context.
pub fn load_description(path: &Path) -> anyhow::Result<GraphDescription> {
    load_graph(path).map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))
}

/// Load the engine configuration, or the defaults without a path.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path).map_err(|e| anyhow::anyhow!("{}", e)),
        None => Ok(EngineConfig::default()),
    }
}

pub fn mode_name(mode: ScheduleMode) -> &'static str {
    match mode {
        ScheduleMode::Sync => "sync",
        ScheduleMode::Async => "async",
    }
}

/// Human-readable scheduler outcome.
pub fn describe_status(report: &RunReport) -> String {
    match report.status {
        Ok(()) => "completed (0)".to_string(),
        Err(status) => format!("{:?} ({})", status, status.code()),
    }
}

/// Renders a payload value as `type value`.
pub fn describe_value(value: &Value) -> String {
    let shown = match value {
        Value::None => return "none".to_string(),
        Value::I8(v) => v.to_string(),
        Value::I16(v) => v.to_string(),
        Value::I32(v) => v.to_string(),
        Value::I64(v) => v.to_string(),
        Value::U8(v) => v.to_string(),
        Value::U16(v) => v.to_string(),
        Value::U32(v) => v.to_string(),
        Value::U64(v) => v.to_string(),
        Value::F32(v) => v.to_string(),
        Value::F64(v) => v.to_string(),
        Value::Str(s) => format!("{s:?}"),
        Value::Buffer(_) | Value::Tensor(_) => return value.type_name().to_string(),
    };
    format!("{} {}", value.type_name(), shown)
}

/// Lowercase hexadecimal, two digits per byte.
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Parses hexadecimal text, ignoring whitespace and an optional `0x`.
pub fn from_hex(text: &str) -> anyhow::Result<Vec<u8>> {
    let digits: String = text.split_whitespace().collect();
    let digits = digits.strip_prefix("0x").unwrap_or(&digits);
    if digits.len() % 2 != 0 {
        anyhow::bail!("odd number of hex digits ({})", digits.len());
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            let pair = digits.get(i..i + 2).ok_or_else(|| anyhow::anyhow!("invalid hex at offset {i}"))?;
            u8::from_str_radix(pair, 16).map_err(|_| anyhow::anyhow!("invalid hex digits '{pair}' at offset {i}"))
        })
        .collect()
}
