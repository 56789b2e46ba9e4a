pub mod api;
pub mod data_io;
pub mod runtime;
pub mod state;
mod tui;
pub mod types;
mod ui_utils;

pub use api::{ApiClient, ApiError};
pub use data_io::OutputFormat;
pub use runtime::{AppError, Dashboard, run, run_headless};
pub use state::{DashboardFailure, DashboardState, SubmitRejection};
pub use types::{BrokenLinkDetail, DashboardEvent, PageAnalysis, Phase};
