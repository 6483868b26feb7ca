//! Client-side site settings polling.
//!
//! Admin dashboard toggles (preorder mode, the announcement bar) reach open
//! storefronts by polling `GET /api/site-settings`. [`SiteSettingsPoller`]
//! fetches once on start and then on a fixed interval, publishing into a
//! watch channel.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use url::Url;

use sareine_core::{SiteSettings, SiteSettingsResponse};

use crate::config::ClientConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors fetching site settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// HTTP request failed or the body was not a settings response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("settings endpoint returned status {0}")]
    Status(u16),
}

/// Latest known settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsSnapshot {
    pub settings: SiteSettings,
    /// True until the first fetch attempt finishes.
    pub loading: bool,
}

/// Periodically fetches site settings.
///
/// Until the first fetch succeeds the settings are the defaults with the
/// configured preorder fallback. A failed fetch keeps whatever was last
/// known. Cheap to clone; clones share one polling task.
#[derive(Clone)]
pub struct SiteSettingsPoller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    client: reqwest::Client,
    url: Url,
    interval: Duration,
    state: watch::Sender<SettingsSnapshot>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for PollerInner {
    fn drop(&mut self) {
        let task = self.task.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = task.take() {
            task.abort();
        }
    }
}

impl SiteSettingsPoller {
    /// Create a stopped poller.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, SettingsError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let (state, _) = watch::channel(SettingsSnapshot {
            settings: SiteSettings::with_preorder_fallback(config.preorder_fallback),
            loading: true,
        });

        Ok(Self {
            inner: Arc::new(PollerInner {
                client,
                url: config.site_settings_url.clone(),
                interval: config.settings_poll_interval,
                state,
                task: Mutex::new(None),
            }),
        })
    }

    #[must_use]
    pub fn current(&self) -> SettingsSnapshot {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SettingsSnapshot> {
        self.inner.state.subscribe()
    }

    /// Fetch settings now and publish the result.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the fetch fails. The published settings are
    /// left as they were, but `loading` is cleared.
    pub async fn refresh(&self) -> Result<SiteSettings, SettingsError> {
        self.inner.refresh().await
    }

    /// Start polling: fetch now, then every interval. Does nothing if
    /// already polling.
    pub fn start(&self) {
        let mut task = self.inner.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.interval;
        info!(url = %self.inner.url, interval_secs = period.as_secs(), "Polling site settings");
        *task = Some(tokio::spawn(poll(weak, period)));
    }

    /// Stop polling. The last published settings remain readable.
    pub fn stop(&self) {
        let task = self
            .inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
            debug!("Stopped polling site settings");
        }
    }

    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }
}

async fn poll(poller: Weak<PollerInner>, period: Duration) {
    let mut ticks = tokio::time::interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticks.tick().await;
        let Some(inner) = poller.upgrade() else {
            return;
        };
        if let Err(e) = inner.refresh().await {
            warn!(error = %e, "Failed to fetch site settings, keeping previous values");
        }
    }
}

impl PollerInner {
    async fn refresh(&self) -> Result<SiteSettings, SettingsError> {
        match self.fetch().await {
            Ok(settings) => {
                self.state.send_replace(SettingsSnapshot {
                    settings: settings.clone(),
                    loading: false,
                });
                Ok(settings)
            }
            Err(e) => {
                self.state.send_if_modified(|snapshot| {
                    let was_loading = snapshot.loading;
                    snapshot.loading = false;
                    was_loading
                });
                Err(e)
            }
        }
    }

    async fn fetch(&self) -> Result<SiteSettings, SettingsError> {
        let response = self
            .client
            .get(self.url.clone())
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SettingsError::Status(status.as_u16()));
        }
        let body: SiteSettingsResponse = response.json().await?;
        Ok(body.settings)
    }
}
