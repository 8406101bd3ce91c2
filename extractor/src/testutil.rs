use crate::client::Transport;
use crate::emit::Emitter;
use async_trait::async_trait;
use extractor_core::{Error, Result};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

type Call = (String, Vec<(String, String)>);

/// Scripted transport: responses are queued per path and popped in
/// order; every call is recorded for assertions. Unscripted paths 404.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<HashMap<String, VecDeque<Result<Value>>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, path: &str, response: Result<Value>) {
        self.responses
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn push_page(&self, path: &str, resource: &str, items: Vec<Value>, offset: u64, more: bool) {
        let total = items.len();
        self.push(
            path,
            Ok(json!({
                resource: items,
                "limit": 100,
                "offset": offset,
                "total": total,
                "more": more,
            })),
        );
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_string(), query.to_vec()));

        self.responses
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(Error::Api {
                    status: 404,
                    path: path.to_string(),
                })
            })
    }
}

pub fn query_value(call: &Call, key: &str) -> Option<String> {
    call.1
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
}

/// Build `count` records with ids `{prefix}{start}..`.
pub fn records(prefix: &str, start: usize, count: usize) -> Vec<Value> {
    (start..start + count)
        .map(|n| json!({"id": format!("{}{}", prefix, n)}))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Schema { stream: String },
    Record { stream: String, record: Value },
    State { value: Value },
}

/// Captures emitted messages in order for assertions.
#[derive(Default)]
pub struct CaptureEmitter {
    pub messages: Vec<Message>,
}

impl CaptureEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self, stream: &str) -> Vec<&Value> {
        self.messages
            .iter()
            .filter_map(|message| match message {
                Message::Record { stream: s, record } if s == stream => Some(record),
                _ => None,
            })
            .collect()
    }

    pub fn schemas(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter_map(|message| match message {
                Message::Schema { stream } => Some(stream.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn states(&self) -> Vec<&Value> {
        self.messages
            .iter()
            .filter_map(|message| match message {
                Message::State { value } => Some(value),
                _ => None,
            })
            .collect()
    }
}

impl Emitter for CaptureEmitter {
    fn schema(&mut self, stream: &str, _schema: &Value, _key_properties: &[&str]) -> Result<()> {
        self.messages.push(Message::Schema {
            stream: stream.to_string(),
        });
        Ok(())
    }

    fn record(&mut self, stream: &str, record: &Value) -> Result<()> {
        self.messages.push(Message::Record {
            stream: stream.to_string(),
            record: record.clone(),
        });
        Ok(())
    }

    fn state(&mut self, state: &Value) -> Result<()> {
        self.messages.push(Message::State {
            value: state.clone(),
        });
        Ok(())
    }
}
