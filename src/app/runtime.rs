use std::fs::File;
use std::io::{self, Stdout, Write};
use std::path::Path;
use std::sync::Mutex;

use clap::Parser;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

use super::api::{self, ApiClient, ApiError};
use super::data_io::{OutputFormat, write_snapshot};
use super::state::{DashboardState, SubmitRejection};
use super::tui::draw_loop;
use super::types::{Cli, DashboardEvent};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("crawl not submitted: {0}")]
    Rejected(#[from] SubmitRejection),

    #[error("could not install log subscriber: {0}")]
    Logging(#[from] TryInitError),

    #[error("{0}")]
    Dashboard(String),
}

/// Outcomes only reach the state through `apply`, so dropping a
/// `Dashboard` discards anything still in flight.
pub struct Dashboard {
    client: ApiClient,
    state: DashboardState,
    tx: UnboundedSender<DashboardEvent>,
    rx: UnboundedReceiver<DashboardEvent>,
    mounted: bool,
}

impl Dashboard {
    pub fn new(client: ApiClient) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            client,
            state: DashboardState::default(),
            tx,
            rx,
            mounted: false,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut DashboardState {
        &mut self.state
    }

    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;

        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = client.fetch_pages().await;
            if let Ok(pages) = &outcome {
                info!(count = pages.len(), "loaded analyzed pages");
            }
            let _ = tx.send(DashboardEvent::Loaded(outcome));
        });
    }

    pub fn submit(&mut self) -> Result<(), SubmitRejection> {
        let url = self.state.begin_submit()?;
        info!(%url, "crawl submitted");

        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let request = tokio::spawn(async move { api::submit_and_refresh(&client, &url).await });
            // A panicking request task still has to end the loading state.
            let outcome = match request.await {
                Ok(outcome) => outcome,
                Err(err) => Err(ApiError::Task(err.to_string())),
            };
            if let Ok(pages) = &outcome {
                info!(count = pages.len(), "crawl accepted, pages refreshed");
            }
            let _ = tx.send(DashboardEvent::SubmitFinished(outcome));
        });
        Ok(())
    }

    pub fn apply(&mut self, event: DashboardEvent) {
        debug!(?event, "applying dashboard event");
        match event {
            DashboardEvent::Loaded(outcome) => self.state.apply_load(outcome),
            DashboardEvent::SubmitFinished(outcome) => self.state.finish_submit(outcome),
        }
    }

    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    pub async fn next_event(&mut self) {
        if let Some(event) = self.rx.recv().await {
            self.apply(event);
        }
    }
}

pub async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let client = ApiClient::new(&cli.api_base)?;
    info!(api_base = %client.base(), "starting dashboard");
    let mut dashboard = Dashboard::new(client);

    if cli.no_tui {
        return run_headless(
            &mut dashboard,
            cli.crawl.as_deref(),
            cli.format.into(),
            io::stdout(),
        )
        .await;
    }
    run_tui(&mut dashboard)?;
    Ok(())
}

fn init_logging(cli: &Cli) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if cli.no_tui {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .finish()
            .try_init()?;
    } else if let Some(path) = cli.log_file.as_deref() {
        let file = open_log_file(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .finish()
            .try_init()?;
    }
    Ok(())
}

fn open_log_file(path: &Path) -> io::Result<File> {
    File::options().create(true).append(true).open(path)
}

/// Prints the table after the initial load and the optional crawl. Fails when
/// the dashboard ends up showing an error, after the table was written.
pub async fn run_headless<W: Write>(
    dashboard: &mut Dashboard,
    crawl: Option<&str>,
    format: OutputFormat,
    out: W,
) -> Result<(), AppError> {
    dashboard.mount();
    dashboard.next_event().await;

    if let Some(url) = crawl {
        dashboard.state_mut().set_url_input(url);
        dashboard.submit()?;
        dashboard.next_event().await;
    }

    write_snapshot(out, dashboard.state().pages(), format)?;

    let error = dashboard.state().error_message();
    if error.is_empty() {
        Ok(())
    } else {
        Err(AppError::Dashboard(error.to_string()))
    }
}

fn run_tui(dashboard: &mut Dashboard) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal: Terminal<CrosstermBackend<Stdout>> = Terminal::new(backend)?;
    terminal.clear()?;

    let tui_result = draw_loop(&mut terminal, dashboard);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    tui_result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_subscriber_install_is_reported() {
        let cli = Cli::parse_from(["skyfell", "--no-tui"]);
        let _ = init_logging(&cli);

        let err = init_logging(&cli).unwrap_err();
        assert!(matches!(err, AppError::Logging(_)));
    }

    #[test]
    fn crawl_requires_headless_mode() {
        assert!(Cli::try_parse_from(["skyfell", "--crawl", "https://example.com"]).is_err());
        let cli = Cli::try_parse_from(["skyfell", "--no-tui", "--crawl", "https://example.com"])
            .unwrap();
        assert_eq!(cli.crawl.as_deref(), Some("https://example.com"));
    }
}
