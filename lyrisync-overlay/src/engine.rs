//! Engine wiring
//!
//! Builds the cache, providers, resolution pipeline, session machine,
//! transport supervisor and renderer sinks from configuration, runs them as
//! tasks and waits for all of them after shutdown.

use crate::api::{self, AppContext};
use crate::playback::PollSettings;
use crate::render::run_log_renderer;
use crate::resolver::lrclib::LrclibProvider;
use crate::resolver::netease::NeteaseProvider;
use crate::resolver::spotify::SpotifyProvider;
use crate::resolver::{http, LyricsProvider, ResolutionPipeline, SqliteLyricsCache};
use crate::session::{SessionMachine, SessionTracker};
use crate::telemetry::decoder_for;
use crate::transport::TransportSupervisor;
use crate::{Error, Result};
use lyrisync_common::config::{ProviderKind, ProvidersConfig, TomlConfig};
use lyrisync_common::db::init_database;
use lyrisync_common::events::EventBus;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Per-subscriber buffer of the event bus
const EVENT_BUS_CAPACITY: usize = 256;

/// Requests one provider call may make: token refresh, search, fetch
const REQUESTS_PER_PROVIDER_CALL: u32 = 3;

/// Providers in configured order
///
/// Repeated kinds are ignored; Spotify is left out without complete
/// credentials.
pub fn build_providers(config: &ProvidersConfig) -> Result<Vec<Arc<dyn LyricsProvider>>> {
    let client = http::build_client(config.http_timeout())
        .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

    let mut seen = Vec::new();
    let mut providers: Vec<Arc<dyn LyricsProvider>> = Vec::new();
    for kind in &config.order {
        if seen.contains(kind) {
            continue;
        }
        seen.push(*kind);

        match kind {
            ProviderKind::Lrclib => providers.push(Arc::new(LrclibProvider::new(
                client.clone(),
                config.lrclib_base_url.as_str(),
            ))),
            ProviderKind::Spotify => match SpotifyProvider::from_config(client.clone(), &config.spotify) {
                Some(provider) => providers.push(Arc::new(provider)),
                None => info!("Spotify credentials incomplete, provider disabled"),
            },
            ProviderKind::Netease => providers.push(Arc::new(NeteaseProvider::new(
                client.clone(),
                config.netease_base_url.as_str(),
            ))),
        }
    }

    Ok(providers)
}

/// Open the cache and assemble the resolution pipeline
pub async fn build_pipeline(config: &TomlConfig, root_folder: &Path) -> Result<ResolutionPipeline> {
    let pool = init_database(&config.database_path(root_folder)).await?;
    let cache = Arc::new(SqliteLyricsCache::new(pool));
    let providers = build_providers(&config.providers)?;

    let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
    info!("Lyrics providers: {}", names.join(", "));

    Ok(ResolutionPipeline::new(
        cache,
        providers,
        config.providers.http_timeout() * REQUESTS_PER_PROVIDER_CALL,
    ))
}

/// Run the overlay until `cancel` fires
pub async fn run(config: TomlConfig, root_folder: &Path, cancel: CancellationToken) -> Result<()> {
    let pipeline = Arc::new(build_pipeline(&config, root_folder).await?);
    let event_bus = EventBus::new(EVENT_BUS_CAPACITY);

    let game = config.telemetry.game;
    let decoder = decoder_for(game);
    let tracker = SessionTracker::new(decoder.guards_first_sample());
    let (samples_tx, samples_rx) = mpsc::unbounded_channel();

    let settings = PollSettings {
        interval: config.playback.poll_interval(),
        lines_shown: config.playback.lines_shown.max(1),
    };
    let machine = SessionMachine::new(tracker, pipeline, event_bus.clone(), settings, cancel.clone());

    let supervisor = TransportSupervisor::new(
        &config.telemetry.url(),
        config.telemetry.reconnect_backoff(),
        decoder,
        samples_tx,
        cancel.clone(),
    )?;
    info!("Telemetry profile: {:?}", game);

    let renderer_task = tokio::spawn(run_log_renderer(event_bus.clone(), cancel.clone()));
    let machine_task = tokio::spawn(machine.run(samples_rx));
    let transport_task = tokio::spawn(supervisor.run());

    let server_result = if config.server.enabled {
        let ctx = AppContext {
            event_bus: event_bus.clone(),
        };
        let result = api::run(&config.server.bind, ctx, cancel.clone()).await;
        if result.is_err() {
            cancel.cancel();
        }
        result
    } else {
        cancel.cancelled().await;
        Ok(())
    };

    for (name, task) in [
        ("transport", transport_task),
        ("session machine", machine_task),
        ("log renderer", renderer_task),
    ] {
        if let Err(e) = task.await {
            error!("{} task failed: {}", name, e);
        }
    }

    info!("Engine stopped");
    server_result
}
