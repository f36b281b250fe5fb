//! Browser driver.
//!
//! Launches a headless Chromium via CDP (chromiumoxide) and exposes
//! pages implementing [`PageDriver`](crate::page::PageDriver). URL
//! construction for the slide app's two router modes lives here as plain
//! functions so it stays testable without a browser.

use crate::options::RouterMode;

/// Query parameters recognized by the slide page
#[derive(Debug, Clone, Default)]
pub struct PageQuery {
    pairs: Vec<(String, String)>,
}

impl PageQuery {
    /// Empty query
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `print=true` (stacked print layout)
    #[must_use]
    pub fn print(mut self) -> Self {
        self.pairs.push(("print".into(), "true".into()));
        self
    }

    /// `print=clicks` (stacked print layout, one container per click state)
    #[must_use]
    pub fn print_clicks(mut self) -> Self {
        self.pairs.push(("print".into(), "clicks".into()));
        self
    }

    /// `embedded=true` (play mode used by the MP4 recorder)
    #[must_use]
    pub fn embedded(mut self) -> Self {
        self.pairs.push(("embedded".into(), "true".into()));
        self
    }

    /// `range=<expr>`
    #[must_use]
    pub fn range(mut self, expr: &str) -> Self {
        self.pairs.push(("range".into(), expr.into()));
        self
    }

    /// `clicks=<n>` (open the slide at a specific click state)
    #[must_use]
    pub fn clicks(mut self, n: u32) -> Self {
        self.pairs.push(("clicks".into(), n.to_string()));
        self
    }

    /// Render as a query string without the leading `?`
    #[must_use]
    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Whether any parameter is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// URL of one slide, shaped by the router mode:
/// hash `<base>/?query#no`, history `<base>/no?query`.
#[must_use]
pub fn slide_url(base: &str, mode: RouterMode, no: u32, query: &PageQuery) -> String {
    let base = base.trim_end_matches('/');
    let qs = query.to_query_string();
    match mode {
        RouterMode::Hash if qs.is_empty() => format!("{base}/#{no}"),
        RouterMode::Hash => format!("{base}/?{qs}#{no}"),
        RouterMode::History if qs.is_empty() => format!("{base}/{no}"),
        RouterMode::History => format!("{base}/{no}?{qs}"),
    }
}

/// URL of the stacked print route (`/print`), which renders every
/// selected slide in one document.
#[must_use]
pub fn print_url(base: &str, mode: RouterMode, query: &PageQuery) -> String {
    let base = base.trim_end_matches('/');
    let qs = query.to_query_string();
    match mode {
        RouterMode::Hash if qs.is_empty() => format!("{base}/#/print"),
        RouterMode::Hash => format!("{base}/?{qs}#/print"),
        RouterMode::History if qs.is_empty() => format!("{base}/print"),
        RouterMode::History => format!("{base}/print?{qs}"),
    }
}

/// Selector of a slide's root element
#[must_use]
pub fn slide_selector(no: u32) -> String {
    format!("[data-slidev-no=\"{no}\"]")
}

// ============================================================================
// Real CDP implementation (when the `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
mod cdp {
    use crate::options::{ExportOptions, WaitUntil};
    use crate::page::{ClipRect, PageDriver, PdfPrintOptions, ScreenshotOptions};
    use crate::result::{ExportError, ExportResult};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::cdp::browser_protocol::dom::Rgba;
    use chromiumoxide::cdp::browser_protocol::emulation::{
        MediaFeature, SetDefaultBackgroundColorOverrideParams, SetDeviceMetricsOverrideParams,
        SetEmulatedMediaParams,
    };
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, CaptureScreenshotParams, PrintToPdfParams,
        Viewport as CdpViewport,
    };
    use chromiumoxide::page::Page as InnerPage;
    use futures::StreamExt;
    use std::time::Duration;

    /// Headless browser owning the CDP connection
    pub struct SlideBrowser {
        inner: Browser,
        handle: tokio::task::JoinHandle<()>,
    }

    impl SlideBrowser {
        /// Launch a headless browser sized for the given capture viewport
        ///
        /// # Errors
        ///
        /// Returns [`ExportError::BrowserLaunch`] when Chromium cannot be
        /// started (missing executable, bad configuration).
        pub async fn launch(
            options: &ExportOptions,
            width: u32,
            height: u32,
            scale: f64,
        ) -> ExportResult<Self> {
            let mut builder = BrowserConfig::builder()
                .window_size(width, height)
                .viewport(chromiumoxide::handler::viewport::Viewport {
                    width,
                    height,
                    device_scale_factor: Some(scale),
                    emulating_mobile: false,
                    is_landscape: false,
                    has_touch: false,
                });

            if let Some(ref path) = options.executable_path {
                builder = builder.chrome_executable(path);
            }
            if std::env::var_os("EXPORTAR_NO_SANDBOX").is_some() {
                builder = builder.no_sandbox();
            }

            let config = builder
                .build()
                .map_err(|e| ExportError::BrowserLaunch { message: e })?;

            let (browser, mut handler) =
                Browser::launch(config)
                    .await
                    .map_err(|e| ExportError::BrowserLaunch {
                        message: e.to_string(),
                    })?;

            // The handler stream must be polled for the connection to
            // make progress.
            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            Ok(Self {
                inner: browser,
                handle,
            })
        }

        /// Open a fresh page
        pub async fn new_page(&self, options: &ExportOptions) -> ExportResult<SlidePage> {
            let page = self
                .inner
                .new_page("about:blank")
                .await
                .map_err(|e| ExportError::BrowserLaunch {
                    message: e.to_string(),
                })?;
            Ok(SlidePage {
                inner: page,
                timeout: Duration::from_millis(options.timeout_ms),
                wait_until: options.wait_until,
            })
        }

        /// Shut the browser down
        pub async fn close(mut self) -> ExportResult<()> {
            let result = self.inner.close().await;
            self.handle.abort();
            result.map_err(|e| ExportError::BrowserLaunch {
                message: e.to_string(),
            })?;
            Ok(())
        }
    }

    /// A single CDP page
    pub struct SlidePage {
        inner: InnerPage,
        timeout: Duration,
        wait_until: WaitUntil,
    }

    impl SlidePage {
        fn eval_err(e: impl std::fmt::Display) -> ExportError {
            ExportError::Evaluation {
                message: e.to_string(),
            }
        }
    }

    #[async_trait]
    impl PageDriver for SlidePage {
        async fn navigate(&self, url: &str) -> ExportResult<()> {
            let nav = async {
                self.inner
                    .goto(url)
                    .await
                    .map_err(|e| ExportError::Navigation {
                        url: url.to_string(),
                        message: e.to_string(),
                    })?;
                if self.wait_until != WaitUntil::None {
                    self.inner.wait_for_navigation().await.map_err(|e| {
                        ExportError::Navigation {
                            url: url.to_string(),
                            message: e.to_string(),
                        }
                    })?;
                }
                Ok(())
            };
            tokio::time::timeout(self.timeout, nav)
                .await
                .map_err(|_| ExportError::Timeout {
                    ms: self.timeout.as_millis() as u64,
                })?
        }

        async fn evaluate(&self, script: &str) -> ExportResult<serde_json::Value> {
            let result = self
                .inner
                .evaluate(script)
                .await
                .map_err(Self::eval_err)?;
            result.into_value().map_err(Self::eval_err)
        }

        async fn screenshot(&self, opts: ScreenshotOptions) -> ExportResult<Vec<u8>> {
            let shot_err = |e: String| ExportError::Screenshot { message: e };

            if opts.omit_background {
                self.inner
                    .execute(SetDefaultBackgroundColorOverrideParams {
                        color: Some(Rgba {
                            r: 0,
                            g: 0,
                            b: 0,
                            a: Some(0.0),
                        }),
                    })
                    .await
                    .map_err(|e| shot_err(e.to_string()))?;
            }

            let mut builder = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png);
            if let Some(ClipRect {
                x,
                y,
                width,
                height,
            }) = opts.clip
            {
                builder = builder.clip(CdpViewport {
                    x,
                    y,
                    width,
                    height,
                    scale: 1.0,
                });
            }
            let response = self
                .inner
                .execute(builder.build())
                .await
                .map_err(|e| shot_err(e.to_string()))?;

            if opts.omit_background {
                self.inner
                    .execute(SetDefaultBackgroundColorOverrideParams { color: None })
                    .await
                    .map_err(|e| shot_err(e.to_string()))?;
            }

            use base64::Engine;
            base64::engine::general_purpose::STANDARD
                .decode(AsRef::<[u8]>::as_ref(&response.data))
                .map_err(|e| shot_err(e.to_string()))
        }

        async fn print_to_pdf(&self, opts: &PdfPrintOptions) -> ExportResult<Vec<u8>> {
            let params = PrintToPdfParams::builder()
                .print_background(true)
                .prefer_css_page_size(true)
                .paper_width(opts.paper_width_in())
                .paper_height(opts.paper_height_in())
                .margin_top(0.0)
                .margin_bottom(0.0)
                .margin_left(0.0)
                .margin_right(0.0)
                .build();
            self.inner
                .pdf(params)
                .await
                .map_err(|e| ExportError::Pdf {
                    message: e.to_string(),
                })
        }

        async fn set_color_scheme(&self, dark: bool) -> ExportResult<()> {
            let scheme = if dark { "dark" } else { "light" };
            let params = SetEmulatedMediaParams::builder()
                .features(vec![MediaFeature {
                    name: "prefers-color-scheme".to_string(),
                    value: scheme.to_string(),
                }])
                .build();
            self.inner
                .execute(params)
                .await
                .map_err(Self::eval_err)?;
            Ok(())
        }

        async fn set_viewport(&self, width: u32, height: u32, scale: f64) -> ExportResult<()> {
            let params = SetDeviceMetricsOverrideParams::builder()
                .width(i64::from(width))
                .height(i64::from(height))
                .device_scale_factor(scale)
                .mobile(false)
                .build()
                .map_err(Self::eval_err)?;
            self.inner
                .execute(params)
                .await
                .map_err(Self::eval_err)?;
            Ok(())
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{SlideBrowser, SlidePage};
