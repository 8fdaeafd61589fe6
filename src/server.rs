//! Development server with rebuild-on-request.
//!
//! An axum router serves the build directory through `tower_http`'s
//! [`ServeDir`]. In front of it sits a middleware that, before every request
//! reaches the file service, recomputes the staleness timestamp and rebuilds
//! the whole site inline when any watched path is newer than the last build.
//!
//! ```text
//! IDLE ──request──▶ CHECKING ──current > baseline──▶ REBUILDING
//!  ▲                   │                               │ ok: baseline = current
//!  │                   │ current <= baseline           │ err: 500, baseline kept
//!  └──── RESPONDING ◀──┴───────────────────────────────┘
//! ```
//!
//! The baseline only advances after a successful build, and to the value
//! measured *before* that build started. A failing build leaves it untouched,
//! so the next request retries; an edit made while a build runs triggers one
//! more rebuild.
//!
//! The server runs on a current-thread runtime and the [`RebuildState`] sits
//! behind a mutex held from the staleness check until the file response is
//! produced, so requests are answered one at a time and every client waits
//! for a running rebuild. The check runs for every request hyper parses,
//! whatever its method; bytes that never parse as a request (a malformed
//! request line, a connection closed before sending anything) are rejected
//! by hyper and never reach the site.
//!
//! Static serving is `ServeDir`'s: `GET`/`HEAD` only (`405` otherwise),
//! percent-decoded paths, `..` never escaping the build directory (`404`),
//! `index.html` for directories and a redirect to add the trailing slash.

use axum::Router;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use std::future::Future;
use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use tokio::sync::Mutex;
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::output;
use crate::site::{BuildError, BuildReport, Site};
use crate::staleness::StalenessError;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Build failed: {0}")]
    Build(#[from] BuildError),
    #[error("Change check failed: {0}")]
    Staleness(#[from] StalenessError),
}

// ============================================================================
// Rebuild state
// ============================================================================

/// The site plus the timestamp of the last completed build.
#[derive(Debug)]
pub struct RebuildState {
    site: Site,
    baseline: SystemTime,
    rebuilds: usize,
}

/// Rebuild state shared between the server and its request middleware.
pub type SharedState = Arc<Mutex<RebuildState>>;

impl RebuildState {
    /// Run the initial full build and record the baseline.
    pub fn new(site: Site) -> Result<(Self, BuildReport), ServeError> {
        let report = site.build()?;
        let baseline = site.latest_change()?;
        info!(?baseline, files = report.files.len(), "initial build complete");
        Ok((
            Self {
                site,
                baseline,
                rebuilds: 0,
            },
            report,
        ))
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn baseline(&self) -> SystemTime {
        self.baseline
    }

    /// Rebuilds run since the initial build.
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    /// Rebuild if anything watched changed since the last build.
    ///
    /// Returns the build report when a rebuild ran. Equal timestamps never
    /// rebuild.
    pub fn check_and_rebuild(&mut self) -> Result<Option<BuildReport>, ServeError> {
        let current = self.site.latest_change()?;
        if current > self.baseline {
            output::print_rebuild_started();
            info!(?current, baseline = ?self.baseline, "sources changed, rebuilding");
            let report = self.site.build()?;
            self.baseline = current;
            self.rebuilds += 1;
            return Ok(Some(report));
        }
        Ok(None)
    }
}

// ============================================================================
// Request middleware
// ============================================================================

#[derive(Clone)]
struct ServerState {
    rebuild_state: SharedState,
    rebuild: bool,
}

/// Check for changes and rebuild before handing the request to the file
/// service. The state lock is held until the inner response is ready.
async fn rebuild_on_request(
    State(server): State<ServerState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let mut state = server.rebuild_state.lock().await;

    if server.rebuild {
        match state.check_and_rebuild() {
            Ok(Some(report)) => output::print_build_output(&report, &state.site().build_dir()),
            Ok(None) => {}
            Err(e) => {
                error!(%method, %path, error = %e, "rebuild failed");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Rebuild failed: {e}\n"),
                )
                    .into_response();
            }
        }
    }

    let response = next.run(request).await;
    drop(state);
    info!(%method, %path, status = response.status().as_u16(), "request");
    response
}

// ============================================================================
// Server
// ============================================================================

/// Development server over the site's build directory.
pub struct DevServer {
    listener: TcpListener,
    state: SharedState,
    build_dir: PathBuf,
    rebuild: bool,
}

impl DevServer {
    /// Bind the listener. With `rebuild` off the server only serves files.
    ///
    /// Binding is synchronous so the address is known before a runtime
    /// starts serving.
    pub fn bind(addr: impl ToSocketAddrs, state: RebuildState, rebuild: bool) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            build_dir: state.site().build_dir(),
            state: Arc::new(Mutex::new(state)),
            rebuild,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle on the rebuild state, for inspection while serving.
    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    /// The request pipeline: rebuild middleware in front of `ServeDir`.
    pub fn router(&self) -> Router {
        let server = ServerState {
            rebuild_state: self.state(),
            rebuild: self.rebuild,
        };
        Router::new()
            .fallback_service(ServeDir::new(&self.build_dir))
            .layer(middleware::from_fn_with_state(server, rebuild_on_request))
    }

    /// Serve until `shutdown` resolves. Must run inside a Tokio runtime;
    /// a current-thread runtime keeps request handling single-threaded.
    pub async fn serve<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();
        let listener = tokio::net::TcpListener::from_std(self.listener)?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
