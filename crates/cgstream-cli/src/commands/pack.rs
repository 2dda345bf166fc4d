//! Encode and decode events in their wire form.
//!
//! Values are written `type:value`, for example `i32:-4`, `f64:0.5` or
//! `str:hello`. A bare number is an `i32` when it has no fraction and an
//! `f32` otherwise; any other bare word is a string.

use clap::{Args, ValueEnum};
use std::sync::Arc;

use cgstream_core::event::{CG_MAX_VALUES, Event, EventData, K_VALUE, ListValue, Priority, Value};
use cgstream_wire::{Packer, Unpacker};

use super::common::{describe_value, from_hex, to_hex};

#[derive(Clone, Copy, ValueEnum)]
pub enum PriorityArg {
    Low,
    Normal,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(p: PriorityArg) -> Self {
        match p {
            PriorityArg::Low => Priority::Low,
            PriorityArg::Normal => Priority::Normal,
            PriorityArg::High => Priority::High,
        }
    }
}

#[derive(Args)]
pub struct PackArgs {
    /// Payload values (`type:value`, types i8..i64, u8..u64, f32, f64, str)
    values: Vec<String>,

    /// Destination node identifier
    #[arg(long, default_value = "0")]
    node: u32,

    /// Event identifier [default: K_VALUE]
    #[arg(short, long, default_value_t = K_VALUE)]
    event: u32,

    /// Event priority
    #[arg(short, long, value_enum, default_value = "normal")]
    priority: PriorityArg,

    /// Pack for a remote peer (shared buffers keep no local reference)
    #[arg(long)]
    network: bool,
}

#[derive(Args)]
pub struct UnpackArgs {
    /// Hexadecimal records, as printed by `cgstream pack`
    hex: String,
}

pub fn run_pack(args: PackArgs) -> anyhow::Result<()> {
    let event = build_event(args.event, args.priority.into(), &args.values)?;
    let mut packer = Packer::new();
    if args.network {
        packer = packer.for_network();
    }
    packer.pack(args.node, &event)?;
    let bytes = packer.finish();
    tracing::debug!(bytes = bytes.len(), values = event.nb_values(), "event packed");
    println!("{}", to_hex(&bytes));
    Ok(())
}

pub fn run_unpack(args: UnpackArgs) -> anyhow::Result<()> {
    let bytes = from_hex(&args.hex)?;
    let mut unpacker = Unpacker::new(&bytes);
    let mut count = 0;
    while !unpacker.is_empty() {
        let offset = unpacker.position();
        let (node, event) = unpacker
            .unpack()
            .map_err(|e| anyhow::anyhow!("record {count} at byte {offset}: {e}"))?;
        println!("node {node}: event {} ({:?})", event.event_id, event.priority);
        match &event.data {
            EventData::Single(Value::None) => {}
            EventData::Single(value) => println!("  {}", describe_value(value)),
            EventData::List(list) => {
                for (i, value) in list.values().iter().enumerate() {
                    println!("  [{i}] {}", describe_value(value));
                }
            }
        }
        count += 1;
    }
    if count == 0 {
        anyhow::bail!("no record to decode");
    }
    Ok(())
}

fn build_event(event_id: u32, priority: Priority, specs: &[String]) -> anyhow::Result<Event> {
    if specs.len() > CG_MAX_VALUES {
        anyhow::bail!("at most {CG_MAX_VALUES} values fit in an event, got {}", specs.len());
    }
    let mut values = specs.iter().map(|s| parse_value(s)).collect::<anyhow::Result<Vec<_>>>()?;
    let event = match values.len() {
        0 => Event::new(event_id, priority),
        1 => Event::with_value(event_id, priority, values.remove(0)),
        _ => {
            let mut list = ListValue::new();
            for value in values {
                list.push(value)
                    .map_err(|v| anyhow::anyhow!("list is full, cannot add {}", describe_value(&v)))?;
            }
            Event::with_list(event_id, priority, Arc::new(list))
        }
    };
    Ok(event)
}

/// Parses one `type:value` argument.
pub fn parse_value(spec: &str) -> anyhow::Result<Value> {
    let Some((ty, text)) = spec.split_once(':') else {
        return Ok(bare_value(spec));
    };
    let bad = |e: &dyn std::fmt::Display| anyhow::anyhow!("invalid {ty} value '{text}': {e}");
    let value = match ty {
        "i8" => Value::I8(text.parse().map_err(|e| bad(&e))?),
        "i16" => Value::I16(text.parse().map_err(|e| bad(&e))?),
        "i32" => Value::I32(text.parse().map_err(|e| bad(&e))?),
        "i64" => Value::I64(text.parse().map_err(|e| bad(&e))?),
        "u8" => Value::U8(text.parse().map_err(|e| bad(&e))?),
        "u16" => Value::U16(text.parse().map_err(|e| bad(&e))?),
        "u32" => Value::U32(text.parse().map_err(|e| bad(&e))?),
        "u64" => Value::U64(text.parse().map_err(|e| bad(&e))?),
        "f32" => Value::F32(text.parse().map_err(|e| bad(&e))?),
        "f64" => Value::F64(text.parse().map_err(|e| bad(&e))?),
        "str" => Value::Str(text.to_string()),
        _ => return Ok(bare_value(spec)),
    };
    Ok(value)
}

fn bare_value(text: &str) -> Value {
    if let Ok(v) = text.parse::<i32>() {
        Value::I32(v)
    } else if let Ok(v) = text.parse::<f32>() {
        Value::F32(v)
    } else {
        Value::Str(text.to_string())
    }
}
