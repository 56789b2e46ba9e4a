use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Deserializer, Serialize};

use super::api::ApiError;

pub const DEFAULT_API_BASE: &str = "http://localhost:8080";

#[derive(Debug, Parser, Clone)]
#[command(
    name = "skyfell",
    version,
    about = "Terminal dashboard for the Skyfell page analyzer"
)]
pub struct Cli {
    #[arg(
        long,
        help = "Base address of the analyzer service",
        value_name = "URL",
        env = "SKYFELL_API_BASE",
        default_value = DEFAULT_API_BASE
    )]
    pub api_base: String,

    #[arg(
        long,
        help = "Print the analyzed pages to stdout instead of opening the dashboard",
        env = "SKYFELL_NO_TUI",
        default_value_t = false
    )]
    pub no_tui: bool,

    #[arg(
        long,
        value_name = "URL",
        requires = "no_tui",
        help = "Submit this URL for analysis before printing"
    )]
    pub crawl: Option<String>,

    #[arg(long, value_enum, env = "SKYFELL_FORMAT", default_value_t = OutputFormatArg::Csv)]
    pub format: OutputFormatArg,

    #[arg(
        long,
        value_name = "PATH",
        env = "SKYFELL_LOG_FILE",
        help = "Write logs here while the dashboard is open"
    )]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, ValueEnum, PartialEq, Eq)]
pub enum OutputFormatArg {
    Csv,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageAnalysis {
    pub id: i64,
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub html_version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headings: BTreeMap<String, u32>,
    pub internal_links: u32,
    pub external_links: u32,
    pub broken_links: u32,
    pub login_form: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub broken_link_details: Vec<BrokenLinkDetail>,
}

impl PageAnalysis {
    pub fn login_form_label(&self) -> &'static str {
        if self.login_form { "Yes" } else { "No" }
    }

    pub fn ordered_headings(&self) -> Vec<(&str, u32)> {
        let mut entries = self
            .headings
            .iter()
            .map(|(level, count)| (level.as_str(), *count))
            .collect::<Vec<_>>();
        entries.sort_by_key(|(level, _)| (heading_rank(level), *level));
        entries
    }
}

fn heading_rank(level: &str) -> u8 {
    match level.to_ascii_lowercase().as_str() {
        "h1" => 1,
        "h2" => 2,
        "h3" => 3,
        "h4" => 4,
        "h5" => 5,
        "h6" => 6,
        _ => u8::MAX,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenLinkDetail {
    pub href: String,
    // 0 when the target could not be reached at all.
    #[serde(default)]
    pub status: u16,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug)]
pub enum DashboardEvent {
    Loaded(Result<Vec<PageAnalysis>, ApiError>),
    SubmitFinished(Result<Vec<PageAnalysis>, ApiError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Error,
    Loaded,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "IDLE",
            Phase::Loading => "LOADING",
            Phase::Error => "ERROR",
            Phase::Loaded => "LOADED",
        }
    }
}
