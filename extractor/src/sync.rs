use crate::client::Transport;
use crate::emit::Emitter;
use crate::model::{StreamKind, SyncSummary};
use crate::state::State;
use crate::{paginate, windows};
use chrono::{DateTime, NaiveTime, Utc};
use extractor_core::backoff::retry_with_backoff;
use extractor_core::config::SyncConfig;
use extractor_core::{Error, Result};
use futures::stream::{self, StreamExt};
use metrics::counter;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Drives one stream at a time: schema announcement, record emission,
/// bookmark update. Transport and paginator failures surface here as
/// `Result`s and this layer decides, per call, whether to abort the
/// stream or log-and-continue.
pub struct Syncer<E> {
    client: Arc<dyn Transport>,
    emitter: E,
    state: State,
    state_path: Option<PathBuf>,
    page_limit: u32,
    config: SyncConfig,
}

impl<E: Emitter> Syncer<E> {
    pub fn new(
        client: Arc<dyn Transport>,
        emitter: E,
        state: State,
        state_path: Option<PathBuf>,
        page_limit: u32,
        config: SyncConfig,
    ) -> Self {
        Self {
            client,
            emitter,
            state,
            state_path,
            page_limit,
            config,
        }
    }

    /// Sync one stream end to end. On failure the stream's bookmark is
    /// left untouched so the next run re-covers the same range.
    #[instrument(skip(self), fields(stream = %kind))]
    pub async fn sync(&mut self, kind: StreamKind) -> Result<SyncSummary> {
        match kind {
            StreamKind::Incidents => self.sync_incidents().await,
            StreamKind::Alerts => self.sync_alerts().await,
            kind => self.sync_full_table(kind).await,
        }
    }

    fn fallback_since(&self) -> DateTime<Utc> {
        self.config.start_date.and_time(NaiveTime::MIN).and_utc()
    }

    fn window_start(&self, stream: &str) -> DateTime<Utc> {
        self.state
            .since(stream)
            .unwrap_or_else(|| self.fallback_since())
    }

    async fn fetch_all_retrying(
        &self,
        path: &str,
        base_query: &[(String, String)],
        resource: &str,
    ) -> Result<Vec<Value>> {
        retry_with_backoff(
            || paginate::fetch_all(self.client.as_ref(), path, base_query, resource, self.page_limit),
            self.config.max_retries,
            self.config.retry_base_delay_ms,
            path,
            Error::is_retryable,
        )
        .await
    }

    async fn fetch_windowed_retrying(
        &self,
        path: &str,
        resource: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Value>> {
        retry_with_backoff(
            || windows::fetch_windowed(self.client.as_ref(), path, resource, since, until, self.page_limit),
            self.config.max_retries,
            self.config.retry_base_delay_ms,
            path,
            Error::is_retryable,
        )
        .await
    }

    fn advance_bookmark(&mut self, stream: &str, ts: DateTime<Utc>) -> Result<()> {
        self.state.advance(stream, ts);
        let snapshot = self.state.to_value()?;
        self.emitter.state(&snapshot)?;
        if let Some(path) = &self.state_path {
            self.state.save(path)?;
        }
        Ok(())
    }

    /// Full-table streams: services, escalation policies, teams, users,
    /// vendors. No windowing, no bookmark.
    async fn sync_full_table(&mut self, kind: StreamKind) -> Result<SyncSummary> {
        self.emitter.schema(kind.name(), kind.schema(), &["id"])?;

        let records = self
            .fetch_all_retrying(kind.path(), &[], kind.resource())
            .await?;

        let mut emitted = 0usize;
        for record in &records {
            self.emitter.record(kind.name(), record)?;
            emitted += 1;
        }

        info!(stream = kind.name(), records = emitted, "Stream completed");
        Ok(SyncSummary::new(kind, emitted, 0))
    }

    /// Incidents: windowed from the bookmark (or configured start date)
    /// through a `until` captured once at fetch start. The bookmark
    /// advances to exactly that instant, which is also the final
    /// window's end, so records created mid-fetch fall to the next run.
    async fn sync_incidents(&mut self) -> Result<SyncSummary> {
        let kind = StreamKind::Incidents;
        let since = self.window_start(kind.name());
        let until = Utc::now();

        self.emitter.schema(kind.name(), kind.schema(), &["id"])?;

        let records = self
            .fetch_windowed_retrying(kind.path(), kind.resource(), since, until)
            .await?;

        let mut emitted = 0usize;
        for record in &records {
            self.emitter.record(kind.name(), record)?;
            emitted += 1;
        }

        self.advance_bookmark(kind.name(), until)?;

        info!(
            stream = kind.name(),
            records = emitted,
            since = %since,
            until = %until,
            "Stream completed, bookmark advanced"
        );
        Ok(SyncSummary::new(kind, emitted, 0))
    }

    /// Alerts are only reachable per incident: enumerate incidents with
    /// the same windowing rule (no alert bookmark is ever written), then
    /// paginate each incident's alerts through a bounded pool. One
    /// incident failing must not sink the rest.
    async fn sync_alerts(&mut self) -> Result<SyncSummary> {
        let kind = StreamKind::Alerts;
        let since = self.window_start(kind.name());
        let until = Utc::now();

        self.emitter.schema(kind.name(), kind.schema(), &["id"])?;

        let incidents = self
            .fetch_windowed_retrying(kind.path(), "incidents", since, until)
            .await?;

        let ids: Vec<String> = incidents
            .iter()
            .filter_map(|incident| incident.get("id").and_then(Value::as_str))
            .map(str::to_owned)
            .collect();
        if ids.len() < incidents.len() {
            warn!(
                stream = kind.name(),
                skipped = incidents.len() - ids.len(),
                "Skipping parent incidents without an id field"
            );
        }

        let client = Arc::clone(&self.client);
        let limit = self.page_limit;
        let mut fetches = stream::iter(ids.into_iter().map(move |id| {
            let client = Arc::clone(&client);
            async move {
                let path = format!("incidents/{}/alerts", id);
                let result = paginate::fetch_all(client.as_ref(), &path, &[], "alerts", limit).await;
                (id, result)
            }
        }))
        .buffer_unordered(self.config.alert_concurrency);

        let mut emitted = 0usize;
        let mut failed = 0u64;
        while let Some((incident_id, result)) = fetches.next().await {
            match result {
                Ok(alerts) => {
                    for alert in &alerts {
                        self.emitter.record(kind.name(), alert)?;
                        emitted += 1;
                    }
                }
                Err(e) => {
                    failed += 1;
                    counter!("extractor_fetch_failures", "stream" => kind.name()).increment(1);
                    warn!(
                        stream = kind.name(),
                        incident_id = %incident_id,
                        error = %e,
                        "Alert sub-fetch failed, skipping incident"
                    );
                }
            }
        }

        info!(
            stream = kind.name(),
            records = emitted,
            failed_fetches = failed,
            "Stream completed"
        );
        Ok(SyncSummary::new(kind, emitted, failed))
    }
}
