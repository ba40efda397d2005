use super::model::{fallback_tracks, Track, TrackDocument};
use super::{PlayerConfig, PlayerError};
use dioxus::logger::tracing::{info, warn};
use futures_util::future::{FutureExt, LocalBoxFuture};

#[cfg(not(target_arch = "wasm32"))]
use once_cell::sync::Lazy;

#[cfg(not(target_arch = "wasm32"))]
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

/// Where the ordered track list comes from.
pub trait TrackSource {
    fn fetch(&self) -> LocalBoxFuture<'static, Result<Vec<Track>, PlayerError>>;
}

/// Fetches the `music.json` document over HTTP.
pub struct HttpTrackSource {
    url: String,
}

impl HttpTrackSource {
    pub fn new(config: &PlayerConfig) -> Self {
        #[cfg(target_arch = "wasm32")]
        let origin = "";
        #[cfg(not(target_arch = "wasm32"))]
        let origin = config.native_origin.as_str();

        Self {
            url: resolve_url(origin, &config.tracklist_url),
        }
    }

    #[cfg(target_arch = "wasm32")]
    async fn request(url: String) -> Result<Vec<Track>, PlayerError> {
        let response = gloo_net::http::Request::get(&url)
            .send()
            .await
            .map_err(|e| PlayerError::TrackList(e.to_string()))?;
        if !response.ok() {
            return Err(PlayerError::TrackList(format!(
                "HTTP {} for {url}",
                response.status()
            )));
        }
        let document = response
            .json::<TrackDocument>()
            .await
            .map_err(|e| PlayerError::TrackList(e.to_string()))?;
        validate(document)
    }

    #[cfg(not(target_arch = "wasm32"))]
    async fn request(url: String) -> Result<Vec<Track>, PlayerError> {
        let document = HTTP_CLIENT
            .get(&url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| PlayerError::TrackList(e.to_string()))?
            .json::<TrackDocument>()
            .await
            .map_err(|e| PlayerError::TrackList(e.to_string()))?;
        validate(document)
    }
}

impl TrackSource for HttpTrackSource {
    fn fetch(&self) -> LocalBoxFuture<'static, Result<Vec<Track>, PlayerError>> {
        Self::request(self.url.clone()).boxed_local()
    }
}

/// Absolute URLs pass through; anything else is anchored at the site root.
fn resolve_url(origin: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    format!(
        "{}/{}",
        origin.trim_end_matches('/'),
        url.trim_start_matches('/')
    )
}

fn validate(document: TrackDocument) -> Result<Vec<Track>, PlayerError> {
    if document.tracks.is_empty() {
        return Err(PlayerError::EmptyTrackList);
    }
    Ok(document.tracks)
}

/// The fetched list, or the built-in list when fetching fails for any reason.
pub async fn load_tracks_or_fallback(source: &dyn TrackSource) -> Vec<Track> {
    match source.fetch().await {
        Ok(tracks) => {
            info!("Loaded {} tracks", tracks.len());
            tracks
        }
        Err(err) => {
            warn!("Using built-in track list: {err}");
            fallback_tracks()
        }
    }
}
