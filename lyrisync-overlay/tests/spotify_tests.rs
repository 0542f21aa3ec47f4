//! Spotify provider against a local stand-in for its four endpoints

mod helpers;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use helpers::MemoryCache;
use lyrisync_common::config::SpotifyConfig;
use lyrisync_overlay::resolver::http::build_client;
use lyrisync_overlay::resolver::spotify::SpotifyProvider;
use lyrisync_overlay::resolver::{LyricsProvider, ProviderError, ProviderOutcome, ResolutionPipeline};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Call counters plus how many leading searches are rejected
#[derive(Default)]
struct Upstream {
    app_tokens: AtomicUsize,
    web_player_tokens: AtomicUsize,
    searches: AtomicUsize,
    lyrics: AtomicUsize,
    reject_searches: usize,
}

async fn app_token(State(upstream): State<Arc<Upstream>>) -> Json<serde_json::Value> {
    let n = upstream.app_tokens.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "access_token": format!("app-{}", n), "expires_in": 3600 }))
}

async fn web_player_token(State(upstream): State<Arc<Upstream>>) -> Json<serde_json::Value> {
    upstream.web_player_tokens.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "accessToken": "web",
        "accessTokenExpirationTimestampMs": chrono::Utc::now().timestamp_millis() + 3_600_000,
    }))
}

async fn search(State(upstream): State<Arc<Upstream>>) -> Response {
    let n = upstream.searches.fetch_add(1, Ordering::SeqCst);
    if n < upstream.reject_searches {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "tracks": { "items": [{
            "id": "track1",
            "name": "Greeting (Remastered)",
            "popularity": 50,
            "duration_ms": 4000,
            "artists": [{ "name": "The Testers" }],
            "album": { "images": [{ "url": "http://cover/1.jpg" }] },
        }]}
    }))
    .into_response()
}

async fn lyrics(State(upstream): State<Arc<Upstream>>, Path(id): Path<String>) -> Response {
    upstream.lyrics.fetch_add(1, Ordering::SeqCst);
    if id != "track1" {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!({
        "lyrics": {
            "syncType": "LINE_SYNCED",
            "lines": [
                { "startTimeMs": "1000", "words": "Hello" },
                { "startTimeMs": "2500", "words": "World" },
            ],
        }
    }))
    .into_response()
}

/// Serve the stand-in on an ephemeral port; returns its base URL
async fn serve(upstream: Arc<Upstream>) -> String {
    let app = Router::new()
        .route("/api/token", post(app_token))
        .route("/get_access_token", get(web_player_token))
        .route("/v1/search", get(search))
        .route("/lyrics/track/:id", get(lyrics))
        .with_state(upstream);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    base
}

fn provider(base: &str) -> SpotifyProvider {
    let config = SpotifyConfig {
        client_id: Some("id".to_string()),
        client_secret: Some("secret".to_string()),
        sp_dc_cookie: Some("cookie".to_string()),
        accounts_base_url: base.to_string(),
        api_base_url: format!("{}/v1/", base),
        web_player_base_url: base.to_string(),
        lyrics_base_url: format!("{}/lyrics", base),
    };
    SpotifyProvider::from_config(build_client(Duration::from_secs(5)).unwrap(), &config)
        .expect("complete credentials")
}

fn pipeline(provider: SpotifyProvider) -> (Arc<SpotifyProvider>, ResolutionPipeline) {
    let provider = Arc::new(provider);
    let providers: Vec<Arc<dyn LyricsProvider>> = vec![provider.clone()];
    let pipeline = ResolutionPipeline::new(
        Arc::new(MemoryCache::default()),
        providers,
        Duration::from_secs(10),
    );
    (provider, pipeline)
}

#[tokio::test]
async fn test_rejected_search_refreshes_token_and_retries_once() {
    let upstream = Arc::new(Upstream {
        reject_searches: 1,
        ..Default::default()
    });
    let base = serve(upstream.clone()).await;
    let (provider, pipeline) = pipeline(provider(&base));

    let outcome = pipeline
        .query_provider(provider.as_ref(), "Greeting", "The Testers", None)
        .await;
    let index = match outcome {
        ProviderOutcome::Hit(index) => index,
        other => panic!("expected lyrics, got {:?}", other),
    };

    assert_eq!(index.title(), "Greeting");
    assert_eq!(index.artist(), "The Testers");
    assert_eq!(index.cover_art(), Some("http://cover/1.jpg"));
    assert_eq!(index.len(), 2);
    assert_eq!(index.end_ms(), 4000);

    assert_eq!(upstream.app_tokens.load(Ordering::SeqCst), 2);
    assert_eq!(upstream.searches.load(Ordering::SeqCst), 2);
    assert_eq!(upstream.web_player_tokens.load(Ordering::SeqCst), 1);
    assert_eq!(upstream.lyrics.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_second_rejection_fails_the_provider() {
    let upstream = Arc::new(Upstream {
        reject_searches: usize::MAX,
        ..Default::default()
    });
    let base = serve(upstream.clone()).await;
    let (provider, pipeline) = pipeline(provider(&base));

    let outcome = pipeline
        .query_provider(provider.as_ref(), "Greeting", "The Testers", None)
        .await;
    assert!(matches!(
        outcome,
        ProviderOutcome::Failed(ProviderError::Unauthorized)
    ));

    // One refresh, one retry, then give up
    assert_eq!(upstream.app_tokens.load(Ordering::SeqCst), 2);
    assert_eq!(upstream.searches.load(Ordering::SeqCst), 2);
    assert_eq!(upstream.lyrics.load(Ordering::SeqCst), 0);
    assert!(pipeline.resolve("Greeting", "The Testers", None).await.is_none());
}
