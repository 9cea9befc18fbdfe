use std::path::PathBuf;
use std::sync::atomic::Ordering;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use order_desk::client::{BackendClient, OrderSource};
use order_desk::config::Config;
use order_desk::error::Result;
use order_desk::session::OrderDeskSession;
use order_desk::sync::SyncDriver;
use order_desk::types::OrderQuery;
use order_desk::view::html::{render_dashboard, render_page};
use order_desk::view::products::{render_products, render_products_error};
use order_desk::view::{Dashboard, FilterCriteria};

const PAGE_TITLE: &str = "주문 관리";
const PRODUCTS_TITLE: &str = "재고 현황";

#[derive(Parser, Debug)]
#[command(name = "order-desk", version, about = "Order dashboard client: list, sync and stock views rendered as HTML")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render the backend's cached order list
    List {
        #[command(flatten)]
        view: ViewArgs,
        /// Fetch an absolute date range instead of the cache (YYYY-MM-DD)
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
    },
    /// Run the chunked sync, then render the reloaded list
    Sync {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Render product stock cards
    Products {
        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Forget the once-per-session automatic sync flag
    ResetSession,
}

#[derive(Args, Debug)]
struct ViewArgs {
    /// Raw status code to keep, e.g. PAYED
    #[arg(long, default_value = "")]
    status: String,
    /// Case-insensitive text matched against ids, buyer, product and option
    #[arg(long, default_value = "")]
    search: String,
    /// Render every group expanded
    #[arg(long)]
    expand_all: bool,
    /// Output file (stdout when omitted)
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    // stdout carries the rendered HTML.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli, cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, cfg: Config) -> Result<()> {
    let client = BackendClient::from_config(&cfg)?;
    info!(api_url = client.base_url(), "order-desk starting");

    match cli.command {
        Commands::List { view, from, to } => {
            let query = match (from, to) {
                (Some(start), Some(end)) => OrderQuery::Range { start, end },
                _ => OrderQuery::Cached,
            };
            list(&client, &cfg, query, view).await
        }
        Commands::Sync { view } => sync(client, &cfg, view).await,
        Commands::Products { out } => products(&client, out).await,
        Commands::ResetSession => {
            OrderDeskSession::load(&cfg.session_file).reset()?;
            info!(path = %cfg.session_file.display(), "Session flag cleared");
            Ok(())
        }
    }
}

async fn list(client: &BackendClient, cfg: &Config, query: OrderQuery, view: ViewArgs) -> Result<()> {
    let mut dash = Dashboard::new(cfg.sync_total_days);
    dash.on_filter_changed(FilterCriteria::new(view.status.as_str(), view.search.as_str()));
    dash.on_load_started();

    // One-shot renders never trigger the automatic sync.
    let mut session = OrderDeskSession::in_memory();
    let outcome = match client.fetch_orders(&query).await {
        Ok(orders) => {
            info!(lines = orders.len(), "Orders loaded");
            dash.on_orders_loaded(orders, &mut session);
            Ok(())
        }
        Err(e) => {
            dash.on_load_failed(e.user_message());
            Err(e)
        }
    };

    write_dashboard(&mut dash, &view)?;
    outcome
}

async fn sync(client: BackendClient, cfg: &Config, view: ViewArgs) -> Result<()> {
    let mut dash = Dashboard::new(cfg.sync_total_days);
    dash.on_filter_changed(FilterCriteria::new(view.status.as_str(), view.search.as_str()));
    dash.on_sync_requested();

    let driver = SyncDriver::new(client, cfg);
    let cancel = driver.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, stopping sync after the current request");
            cancel.store(true, Ordering::Relaxed);
        }
    });

    let result = driver
        .run(|p| {
            info!(
                offset = p.offset_days,
                percent = p.percent_complete,
                "Syncing {}~{} days back ({}%)",
                p.offset_days,
                p.window_end_days,
                p.percent_complete,
            )
        })
        .await;

    let outcome = match result {
        Ok(outcome) => {
            dash.on_sync_finished(Ok(outcome.orders));
            Ok(())
        }
        Err(e) => {
            dash.on_sync_finished(Err(e.user_message()));
            Err(e)
        }
    };

    write_dashboard(&mut dash, &view)?;
    outcome
}

async fn products(client: &BackendClient, out: Option<PathBuf>) -> Result<()> {
    match client.fetch_products().await {
        Ok(products) => {
            info!(products = products.len(), "Products loaded");
            write_output(out.as_ref(), &render_page(PRODUCTS_TITLE, &render_products(products)))
        }
        Err(e) => {
            write_output(out.as_ref(), &render_page(PRODUCTS_TITLE, &render_products_error(&e)))?;
            Err(e)
        }
    }
}

fn write_dashboard(dash: &mut Dashboard, view: &ViewArgs) -> Result<()> {
    if view.expand_all {
        let ids: Vec<String> = dash.table().rows.iter().map(|r| r.order_id().to_string()).collect();
        for id in ids {
            dash.on_group_toggled(&id);
        }
    }
    write_output(view.out.as_ref(), &render_page(PAGE_TITLE, &render_dashboard(dash)))
}

fn write_output(out: Option<&PathBuf>, html: &str) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, html)?;
            info!(path = %path.display(), bytes = html.len(), "Wrote HTML");
        }
        None => print!("{html}"),
    }
    Ok(())
}
