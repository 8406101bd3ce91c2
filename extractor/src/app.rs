use crate::client::{RestClient, Transport};
use crate::emit::MessageWriter;
use crate::model::StreamKind;
use crate::state::State;
use crate::sync::Syncer;
use extractor_core::{Config, Result};
use metrics::counter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

pub struct App {
    config: Config,
    state_path: Option<PathBuf>,
}

impl App {
    pub fn new(config: Config, state_path: Option<PathBuf>) -> Self {
        Self { config, state_path }
    }

    /// Run the selected streams in order. A stream failing aborts only
    /// that stream; the run degrades to partial data and keeps going.
    pub async fn run(&self, streams: &[StreamKind]) -> Result<()> {
        let state = match &self.state_path {
            Some(path) => State::load(path)?,
            None => State::default(),
        };

        let client: Arc<dyn Transport> = Arc::new(RestClient::new(
            &self.config.api.base_url,
            &self.config.api.token,
        )?);
        let emitter = MessageWriter::new(std::io::stdout().lock());

        let mut syncer = Syncer::new(
            client,
            emitter,
            state,
            self.state_path.clone(),
            self.config.api.page_limit,
            self.config.sync.clone(),
        );

        let mut failed_streams = 0usize;
        for kind in streams {
            match syncer.sync(*kind).await {
                Ok(summary) => info!(
                    stream = summary.stream,
                    records = summary.records,
                    failed_fetches = summary.failed_fetches,
                    "Stream sync finished"
                ),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    failed_streams += 1;
                    counter!("extractor_stream_failures", "stream" => kind.name()).increment(1);
                    error!(
                        stream = %kind,
                        error = %e,
                        "Stream sync failed; bookmark left untouched"
                    );
                }
            }
        }

        if failed_streams > 0 {
            info!(
                failed_streams,
                total = streams.len(),
                "Run finished with degraded streams"
            );
        }

        Ok(())
    }
}
