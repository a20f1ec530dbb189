use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use careboard::api::{DashboardApi, ListQuery, RestClient};
use careboard::config;
use careboard::facility::FacilitySelection;
use careboard::model::ListKind;

#[derive(Parser, Debug)]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Inspect the archived list instead of the active one
    #[arg(long)]
    archived: bool,

    /// Page to fetch
    #[arg(long, default_value_t = 1)]
    page: u32,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let client = RestClient::from_config(&cfg)?;
    if cfg.has_credentials() {
        client.login(&cfg.server.email, &cfg.server.password).await?;
    }

    let facilities = client.facilities().await?;
    println!("Facilities ({}):", facilities.len());
    for f in &facilities {
        println!("  {} -> {}", f.facility_id, f.facility_name);
    }

    let mut selection = FacilitySelection::new();
    selection.replace_known(facilities);
    let kind = if args.archived {
        ListKind::Archived
    } else {
        ListKind::Active
    };
    let query = ListQuery::new(&selection.snapshot(), args.page, cfg.dashboard.page_size);
    let page = client.alerts(kind, &query).await?;
    let total = page
        .total
        .map(|t| t.to_string())
        .unwrap_or_else(|| "?".into());
    println!(
        "{} alerts: page {} of {} ({} total)",
        kind.as_str(),
        page.page,
        page.total_pages,
        total
    );
    for a in &page.alerts {
        println!(
            "  #{} {} [{}] {} @ {}",
            a.alert_id,
            a.patient_name(),
            a.facility_name,
            a.alert_type,
            a.alert_date_time.as_deref().unwrap_or("-")
        );
    }

    match client.check_new_alerts().await {
        Ok(flag) => println!(
            "check-new-alerts: has_new_alerts={} count={}",
            flag.has_new_alerts, flag.count
        ),
        Err(err) => println!("check-new-alerts: {}", err),
    }
    Ok(())
}
