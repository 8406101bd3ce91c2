use extractor_core::{Error, Result};
use once_cell::sync::Lazy;
use serde_json::Value;

/// The closed set of record streams this extractor knows how to sync.
///
/// Keeping the catalog as an enum (rather than dispatching on stream
/// names at runtime) lets the compiler verify the stream set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Incidents,
    Alerts,
    Services,
    EscalationPolicies,
    Teams,
    Users,
    Vendors,
}

static INCIDENTS_SCHEMA: Lazy<Value> =
    Lazy::new(|| load_schema(include_str!("../schemas/incidents.json")));
static ALERTS_SCHEMA: Lazy<Value> = Lazy::new(|| load_schema(include_str!("../schemas/alerts.json")));
static SERVICES_SCHEMA: Lazy<Value> =
    Lazy::new(|| load_schema(include_str!("../schemas/services.json")));
static ESCALATION_POLICIES_SCHEMA: Lazy<Value> =
    Lazy::new(|| load_schema(include_str!("../schemas/escalation_policies.json")));
static TEAMS_SCHEMA: Lazy<Value> = Lazy::new(|| load_schema(include_str!("../schemas/teams.json")));
static USERS_SCHEMA: Lazy<Value> = Lazy::new(|| load_schema(include_str!("../schemas/users.json")));
static VENDORS_SCHEMA: Lazy<Value> =
    Lazy::new(|| load_schema(include_str!("../schemas/vendors.json")));

fn load_schema(raw: &str) -> Value {
    serde_json::from_str(raw).expect("embedded schema is valid JSON")
}

impl StreamKind {
    pub const ALL: [StreamKind; 7] = [
        StreamKind::Incidents,
        StreamKind::Alerts,
        StreamKind::Services,
        StreamKind::EscalationPolicies,
        StreamKind::Teams,
        StreamKind::Users,
        StreamKind::Vendors,
    ];

    /// Stream name used in emitted messages and bookmark keys.
    pub fn name(self) -> &'static str {
        match self {
            StreamKind::Incidents => "incidents",
            StreamKind::Alerts => "alerts",
            StreamKind::Services => "services",
            StreamKind::EscalationPolicies => "escalationPolicies",
            StreamKind::Teams => "teams",
            StreamKind::Users => "users",
            StreamKind::Vendors => "vendors",
        }
    }

    /// Listing path driven during sync. Alerts are only reachable per
    /// incident, so their sync starts from the parent incident listing.
    pub fn path(self) -> &'static str {
        match self {
            StreamKind::Incidents | StreamKind::Alerts => "incidents",
            StreamKind::Services => "services",
            StreamKind::EscalationPolicies => "escalation_policies",
            StreamKind::Teams => "teams",
            StreamKind::Users => "users",
            StreamKind::Vendors => "vendors",
        }
    }

    /// Key of the item array inside a list response body.
    pub fn resource(self) -> &'static str {
        match self {
            StreamKind::Incidents | StreamKind::Alerts => "incidents",
            StreamKind::Services => "services",
            StreamKind::EscalationPolicies => "escalation_policies",
            StreamKind::Teams => "teams",
            StreamKind::Users => "users",
            StreamKind::Vendors => "vendors",
        }
    }

    /// Streams whose listing endpoint rejects unbounded date ranges.
    pub fn is_windowed(self) -> bool {
        matches!(self, StreamKind::Incidents | StreamKind::Alerts)
    }

    pub fn schema(self) -> &'static Value {
        match self {
            StreamKind::Incidents => &INCIDENTS_SCHEMA,
            StreamKind::Alerts => &ALERTS_SCHEMA,
            StreamKind::Services => &SERVICES_SCHEMA,
            StreamKind::EscalationPolicies => &ESCALATION_POLICIES_SCHEMA,
            StreamKind::Teams => &TEAMS_SCHEMA,
            StreamKind::Users => &USERS_SCHEMA,
            StreamKind::Vendors => &VENDORS_SCHEMA,
        }
    }

    pub fn from_name(name: &str) -> Option<StreamKind> {
        StreamKind::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One paginated response batch from a list endpoint.
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<Value>,
    pub limit: u64,
    pub offset: u64,
    pub more: bool,
}

impl Page {
    /// Pull the resource-named item array and paging flags out of a
    /// response body. A missing or non-array item key is malformed.
    pub fn from_body(mut body: Value, resource: &str, path: &str) -> Result<Self> {
        let items = match body.get_mut(resource).map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(Error::MalformedResponse {
                    path: path.to_string(),
                    details: format!("missing '{}' array", resource),
                })
            }
        };

        Ok(Page {
            items,
            limit: body.get("limit").and_then(Value::as_u64).unwrap_or(0),
            offset: body.get("offset").and_then(Value::as_u64).unwrap_or(0),
            more: body.get("more").and_then(Value::as_bool).unwrap_or(false),
        })
    }
}

/// A bounded date sub-range used to satisfy the API's maximum query span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: chrono::DateTime<chrono::Utc>,
    pub end: chrono::DateTime<chrono::Utc>,
}

/// Outcome of one stream's sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub stream: &'static str,
    pub records: usize,
    pub failed_fetches: u64,
}

impl SyncSummary {
    pub fn new(kind: StreamKind, records: usize, failed_fetches: u64) -> Self {
        Self {
            stream: kind.name(),
            records,
            failed_fetches,
        }
    }
}
