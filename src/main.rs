use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use careboard::api::{DashboardApi, RestClient};
use careboard::command::{self, Command, HELP};
use careboard::config;
use careboard::dashboard::{Dashboard, Views};
use careboard::model::ListKind;
use careboard::render::{
    TerminalActivityView, TerminalBell, TerminalDetailView, TerminalListView,
    TerminalNotifications,
};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Do not start the background alert poller
    #[arg(long)]
    no_poll: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let client = RestClient::from_config(&cfg)?;
    if cfg.has_credentials() {
        client
            .login(&cfg.server.email, &cfg.server.password)
            .await
            .context("login failed")?;
    } else {
        warn!("no credentials configured; assuming an existing session");
    }
    let api: Arc<dyn DashboardApi> = Arc::new(client);

    let views = Views {
        active: Arc::new(TerminalListView::new("Active Alerts")),
        archived: Arc::new(TerminalListView::new("Archived Alerts")),
        detail: Arc::new(TerminalDetailView),
        activities: Arc::new(TerminalActivityView),
        notifications: Arc::new(TerminalNotifications),
        chime: Some(Arc::new(TerminalBell)),
    };
    let dashboard = Dashboard::new(api, &cfg, views);
    dashboard
        .init()
        .await
        .context("failed to load facilities")?;
    if !args.no_poll {
        dashboard.start_poller().await;
    }

    info!("dashboard ready; type `help` for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(cmd) => handle_command(&dashboard, cmd).await,
            Err(err) => println!("{}", err),
        }
    }

    dashboard.shutdown().await;
    info!("bye");
    Ok(())
}

async fn handle_command(dashboard: &Dashboard, cmd: Command) {
    match cmd {
        Command::Navigate(kind, nav) => dashboard.navigate(kind, nav).await,
        Command::Toggle {
            facility_id,
            checked,
        } => {
            if !dashboard.toggle_facility(&facility_id, checked).await {
                println!("no change for facility {}", facility_id);
            }
        }
        Command::ToggleAll(checked) => dashboard.toggle_all(checked).await,
        Command::Review(kind, row) => {
            let action = dashboard
                .loader(kind)
                .row(row - 1)
                .await
                .and_then(|r| r.review_action().cloned());
            match action {
                Some(action) => dashboard.dispatch(action).await,
                None => println!("no row {} in the {} list", row, kind.as_str()),
            }
        }
        Command::Archive(row) => {
            let action = dashboard
                .loader(ListKind::Active)
                .row(row - 1)
                .await
                .and_then(|r| r.archive_action().cloned());
            match action {
                Some(action) => dashboard.dispatch(action).await,
                None => println!("no row {} in the active list", row),
            }
        }
        Command::Dismiss(id) => {
            if !dashboard.notifications().dismiss(id) {
                println!("notification {} is already gone", id);
            }
        }
        Command::Facilities => {
            let selection = dashboard.selection().lock().await;
            let all = if selection.all_selected() { "x" } else { " " };
            println!("[{}] All facilities", all);
            for f in selection.known() {
                let mark = if selection.is_selected(&f.facility_id) {
                    "x"
                } else {
                    " "
                };
                println!("[{}] {:>4}  {}", mark, f.facility_id, f.facility_name);
            }
        }
        Command::Activities => dashboard.refresh_activities().await,
        Command::Check => {
            let outcome = dashboard.poll_now().await;
            info!(?outcome, "manual poll finished");
        }
        Command::Help => println!("{}", HELP),
        // Handled by the input loop.
        Command::Quit => {}
    }
}
