//! # atrium-store
//!
//! Client-side cache of the Atrium dashboard: one [`EntityStore`] per entity
//! kind, each running its requests through a `pending -> fulfilled |
//! rejected` lifecycle and keeping `items`, `current`, `loading` and `error`
//! consistent with what the backend answered.
//!
//! ```rust,no_run
//! use atrium_core::AtriumConfig;
//! use atrium_store::{AppStore, Scope};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mut config = AtriumConfig::new();
//! config.set("api.base_url", "https://api.example.com");
//! let app = AppStore::from_config(&config.snapshot())?;
//!
//! let page = Scope::new("dashboard");
//! app.load_dashboard(&page).await;
//! let stats = app.dashboard_stats(chrono::Utc::now());
//! println!("{} users", stats.total_users);
//!
//! // Leaving the page: anything still in flight is discarded.
//! drop(page);
//! # Ok(())
//! # }
//! ```
//!
//! Pure pieces ([`views`], [`gantt`], [`files`], [`action::reduce`]) never
//! touch the network and can be used on snapshots.

pub mod action;
pub mod app;
pub mod files;
pub mod gantt;
pub mod operations;
pub mod scope;
pub mod state;
pub mod store;
pub mod views;

pub use action::{reduce, Action, Outcome};
pub use app::{AppServices, AppStore, DashboardLoad};
pub use files::{breadcrumbs, build_tree, directory_contents, Breadcrumb, FileNode, NavigationHistory};
pub use gantt::{GanttBar, GanttLayout, GanttOptions};
pub use scope::Scope;
pub use state::EntityState;
pub use store::{EntityStore, Settled};
pub use views::{DashboardStats, LazyView, NewUserPolicy};

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
#[cfg(feature = "tracing-basic")]
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
