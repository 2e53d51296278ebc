use anyhow::{anyhow, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;
use tracing::{debug, info, warn};

use super::{PageFetcher, ScrapeError, SessionLifecycle};
use crate::config::BrowserConfig;

/// A live browser with one tab that all navigation goes through.
///
/// Methods block; [`BrowserResource`] calls them on the blocking thread pool.
pub trait BrowserSession: Send + Sync + 'static {
    fn navigate(&self, url: &str) -> Result<()>;
    fn content(&self) -> Result<String>;
    /// Whether the browser behind the session still answers.
    fn is_alive(&self) -> bool;
}

pub trait BrowserLauncher: Send + Sync + 'static {
    type Session: BrowserSession;

    fn launch(&self, config: &BrowserConfig) -> Result<Self::Session>;
}

/// Starts a local headless Chrome/Chromium.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeLauncher;

pub struct ChromeSession {
    // Owns the Chrome process; dropping it kills the process.
    browser: Browser,
    tab: Arc<Tab>,
}

impl BrowserLauncher for ChromeLauncher {
    type Session = ChromeSession;

    fn launch(&self, config: &BrowserConfig) -> Result<ChromeSession> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false) // Often needed in containerized environments
            .idle_browser_timeout(config.idle_timeout())
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-extensions"),
                OsStr::new("--disable-infobars"),
                OsStr::new("--disable-blink-features=AutomationControlled"),
                OsStr::new("--window-size=1920,1080"),
            ])
            .build()
            .map_err(|e| anyhow!("Failed to create launch options: {}", e))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(PathBuf::from(chrome_path));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| anyhow!("Failed to launch browser: {}", e))?;

        let tab = browser.new_tab()
            .map_err(|e| anyhow!("Failed to create tab: {}", e))?;
        tab.set_default_timeout(config.page_load_timeout());
        tab.set_user_agent(&config.user_agent, Some("tr-TR,tr;q=0.9,en;q=0.8"), None)
            .map_err(|e| anyhow!("Failed to set user agent: {}", e))?;

        Ok(ChromeSession { browser, tab })
    }
}

impl BrowserSession for ChromeSession {
    fn navigate(&self, url: &str) -> Result<()> {
        self.tab.navigate_to(url)
            .map_err(|e| anyhow!("Navigation failed: {}", e))?;
        self.tab.wait_until_navigated()
            .map_err(|e| anyhow!("Page load failed: {}", e))?;
        Ok(())
    }

    fn content(&self) -> Result<String> {
        self.tab.get_content()
            .map_err(|e| anyhow!("Failed to get page content: {}", e))
    }

    fn is_alive(&self) -> bool {
        self.browser.get_version().is_ok()
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        let _ = self.tab.close(true);
    }
}

/// The single headless-browser session shared by every check in the process.
///
/// The session is started by the first [`acquire`](SessionLifecycle::acquire) or fetch
/// and lives until [`release`](SessionLifecycle::release). Fetches hold the session lock
/// for their whole duration, so navigation is never interleaved.
pub struct BrowserResource<L: BrowserLauncher = ChromeLauncher> {
    launcher: Arc<L>,
    config: BrowserConfig,
    session: Mutex<Option<Arc<L::Session>>>,
}

impl BrowserResource<ChromeLauncher> {
    pub fn new(config: BrowserConfig) -> Self {
        Self::with_launcher(ChromeLauncher, config)
    }
}

impl<L: BrowserLauncher> BrowserResource<L> {
    pub fn with_launcher(launcher: L, config: BrowserConfig) -> Self {
        Self {
            launcher: Arc::new(launcher),
            config,
            session: Mutex::new(None),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.session.lock().await.is_some()
    }

    async fn ensure_session(
        &self,
        slot: &mut Option<Arc<L::Session>>,
    ) -> Result<Arc<L::Session>, ScrapeError> {
        if let Some(session) = slot.as_ref().map(Arc::clone) {
            let candidate = Arc::clone(&session);
            let alive = tokio::task::spawn_blocking(move || candidate.is_alive())
                .await
                .unwrap_or(false);
            if alive {
                return Ok(session);
            }

            warn!("Browser session stopped responding; relaunching");
            slot.take();
            let _ = tokio::task::spawn_blocking(move || drop(session)).await;
        }

        info!("Launching headless browser");
        let launcher = Arc::clone(&self.launcher);
        let config = self.config.clone();
        let session = tokio::task::spawn_blocking(move || launcher.launch(&config))
            .await
            .map_err(|e| ScrapeError::ResourceInit(e.to_string()))?
            .map_err(|e| ScrapeError::ResourceInit(format!("{:#}", e)))?;

        let session = Arc::new(session);
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Returns how many attempts the navigation took.
    async fn navigate_with_retry(
        &self,
        session: &Arc<L::Session>,
        url: &str,
    ) -> Result<u32, ScrapeError> {
        let attempts = self.config.fetch_attempts.max(1);
        let strategy = FixedInterval::new(self.config.retry_delay()).take(attempts as usize - 1);
        let mut attempt = 0u32;

        let navigated = Retry::spawn(strategy, || {
            attempt += 1;
            let current = attempt;
            let session = Arc::clone(session);
            let target = url.to_string();
            async move {
                debug!(url = %target, attempt = current, "Navigating");
                let result = tokio::task::spawn_blocking(move || session.navigate(&target))
                    .await
                    .map_err(anyhow::Error::from)
                    .and_then(|navigated| navigated);
                if let Err(e) = &result {
                    warn!(attempt = current, of = attempts, "Navigation attempt failed: {:#}", e);
                }
                result
            }
        })
        .await;

        navigated.map(|_| attempt).map_err(|e| ScrapeError::Fetch {
            url: url.to_string(),
            attempts: attempt,
            reason: format!("{:#}", e),
        })
    }
}

#[async_trait]
impl<L: BrowserLauncher> PageFetcher for BrowserResource<L> {
    async fn fetch_rendered_html(&self, url: &str) -> Result<String, ScrapeError> {
        let mut slot = self.session.lock().await;
        let session = self.ensure_session(&mut slot).await?;

        let attempts = self.navigate_with_retry(&session, url).await?;

        // Let client-side rendering fill in prices before reading the DOM
        tokio::time::sleep(self.config.settle_delay()).await;

        tokio::task::spawn_blocking(move || session.content())
            .await
            .map_err(anyhow::Error::from)
            .and_then(|content| content)
            .map_err(|e| ScrapeError::Fetch {
                url: url.to_string(),
                attempts,
                reason: format!("page content unreadable: {:#}", e),
            })
    }
}

#[async_trait]
impl<L: BrowserLauncher> SessionLifecycle for BrowserResource<L> {
    async fn acquire(&self) -> Result<(), ScrapeError> {
        let mut slot = self.session.lock().await;
        self.ensure_session(&mut slot).await.map(|_| ())
    }

    async fn release(&self) {
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            info!("Closing headless browser");
            // Shutting Chrome down waits on the child process
            let _ = tokio::task::spawn_blocking(move || drop(session)).await;
        }
    }
}

impl<L: BrowserLauncher> Drop for BrowserResource<L> {
    fn drop(&mut self) {
        if self.session.get_mut().is_some() {
            warn!("Browser resource dropped without release; closing session");
        }
    }
}
