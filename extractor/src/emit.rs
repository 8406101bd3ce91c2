use extractor_core::Result;
use serde_json::{json, Value};
use std::io::Write;

/// Sink for the framed output stream: one SCHEMA per stream before any
/// records, then RECORDs, then a STATE snapshot whenever a bookmark
/// advances.
pub trait Emitter {
    fn schema(&mut self, stream: &str, schema: &Value, key_properties: &[&str]) -> Result<()>;
    fn record(&mut self, stream: &str, record: &Value) -> Result<()>;
    fn state(&mut self, state: &Value) -> Result<()>;
}

/// Writes Singer-style JSON lines, normally to stdout.
pub struct MessageWriter<W: Write> {
    out: W,
}

impl<W: Write> MessageWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn write_line(&mut self, message: &Value) -> Result<()> {
        serde_json::to_writer(&mut self.out, message)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> Emitter for MessageWriter<W> {
    fn schema(&mut self, stream: &str, schema: &Value, key_properties: &[&str]) -> Result<()> {
        self.write_line(&json!({
            "type": "SCHEMA",
            "stream": stream,
            "schema": schema,
            "key_properties": key_properties,
        }))
    }

    fn record(&mut self, stream: &str, record: &Value) -> Result<()> {
        self.write_line(&json!({
            "type": "RECORD",
            "stream": stream,
            "record": record,
        }))
    }

    fn state(&mut self, state: &Value) -> Result<()> {
        self.write_line(&json!({
            "type": "STATE",
            "value": state,
        }))
    }
}
