use chrono::{DateTime, Utc};
use tracing::warn;
use url::Url;

use super::api::ApiError;
use super::types::{PageAnalysis, Phase};

pub const LOAD_FAILURE_MESSAGE: &str = "Failed to fetch data";
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

#[derive(Debug, thiserror::Error)]
pub enum DashboardFailure {
    #[error("Failed to fetch data")]
    Load(#[source] ApiError),

    #[error("{}", submit_message(.0))]
    Submit(#[source] ApiError),
}

fn submit_message(err: &ApiError) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        UNKNOWN_ERROR_MESSAGE.to_string()
    } else {
        message
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejection {
    #[error("a crawl is already in progress")]
    Busy,
    #[error("enter a website URL")]
    Empty,
    #[error("`{0}` is not a valid URL")]
    InvalidUrl(String),
}

#[derive(Debug, Default)]
pub struct DashboardState {
    pages: Vec<PageAnalysis>,
    url_input: String,
    is_loading: bool,
    error_message: String,
    last_synced: Option<DateTime<Utc>>,
}

impl DashboardState {
    pub fn pages(&self) -> &[PageAnalysis] {
        &self.pages
    }

    pub fn url_input(&self) -> &str {
        &self.url_input
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn last_synced(&self) -> Option<DateTime<Utc>> {
        self.last_synced
    }

    pub fn phase(&self) -> Phase {
        if self.is_loading {
            Phase::Loading
        } else if !self.error_message.is_empty() {
            Phase::Error
        } else if self.last_synced.is_some() {
            Phase::Loaded
        } else {
            Phase::Idle
        }
    }

    pub fn set_url_input(&mut self, value: impl Into<String>) {
        self.url_input = value.into();
    }

    pub fn push_input_char(&mut self, ch: char) {
        if !ch.is_control() {
            self.url_input.push(ch);
        }
    }

    pub fn pop_input_char(&mut self) {
        self.url_input.pop();
    }

    pub fn clear_input(&mut self) {
        self.url_input.clear();
    }

    pub fn apply_load(&mut self, outcome: Result<Vec<PageAnalysis>, ApiError>) {
        match outcome {
            Ok(pages) => self.replace_pages(pages),
            Err(err) => self.fail(DashboardFailure::Load(err)),
        }
    }

    pub fn begin_submit(&mut self) -> Result<String, SubmitRejection> {
        if self.is_loading {
            return Err(SubmitRejection::Busy);
        }
        let url = self.url_input.trim();
        if url.is_empty() {
            return Err(SubmitRejection::Empty);
        }
        if Url::parse(url).is_err() {
            return Err(SubmitRejection::InvalidUrl(url.to_string()));
        }

        let url = url.to_string();
        self.is_loading = true;
        self.error_message.clear();
        Ok(url)
    }

    // The input is only cleared once both the crawl and the refresh succeeded.
    pub fn finish_submit(&mut self, outcome: Result<Vec<PageAnalysis>, ApiError>) {
        self.is_loading = false;
        match outcome {
            Ok(pages) => {
                self.replace_pages(pages);
                self.url_input.clear();
            }
            Err(err) => self.fail(DashboardFailure::Submit(err)),
        }
    }

    fn replace_pages(&mut self, pages: Vec<PageAnalysis>) {
        self.pages = pages;
        self.last_synced = Some(Utc::now());
    }

    fn fail(&mut self, failure: DashboardFailure) {
        let (DashboardFailure::Load(cause) | DashboardFailure::Submit(cause)) = &failure;
        warn!(%cause, "{failure}");
        self.error_message = failure.to_string();
    }
}
