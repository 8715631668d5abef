//! Planner entry-point: wires the routing backend, route cache and headless map.
//!
//! Every subcommand prints JSON on stdout; logs go to stderr.

use std::ffi::OsString;
use std::io::{self, Write};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};
use mockable::{Clock, DefaultClock};
use ortho_config::OrthoConfig;
use serde::Serialize;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use walk_planner::config::PlannerSettings;
use walk_planner::domain::ports::MountPoint;
use walk_planner::domain::{
    AddressSuggestionDebouncer, MapFailureNotice, MapLifecycleController, RouteDataCache,
    RouteQuery, RouteResult, RouteView, RouteViewContent, SuggestionField, load_featured,
    warm_featured,
};
use walk_planner::outbound::headless_map::{HeadlessMapLibrary, MapSnapshot};
use walk_planner::outbound::routing_http::RoutingHttpClient;

const MOUNT_POINT: &str = "route-map";

#[derive(Debug, Parser)]
#[command(name = "walk-planner", about = "Plan walking and running routes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Plan one route and show what the map would display.
    Route(RouteArgs),
    /// List the featured walks with fetched metrics.
    Featured,
    /// Look up address suggestions for one form field.
    Suggest(SuggestArgs),
}

#[derive(Debug, Args)]
struct RouteArgs {
    /// Start address.
    #[arg(long = "from")]
    origin: String,
    /// End address.
    #[arg(long = "to")]
    destination: String,
    /// Activity mode: walking or running.
    #[arg(long, default_value = "walking")]
    mode: String,
    /// Unit system: metric or imperial.
    #[arg(long, default_value = "metric")]
    units: String,
    /// Show the static map image instead of the interactive map.
    #[arg(long)]
    static_map: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FieldArg {
    Origin,
    Destination,
}

impl From<FieldArg> for SuggestionField {
    fn from(field: FieldArg) -> Self {
        match field {
            FieldArg::Origin => Self::Origin,
            FieldArg::Destination => Self::Destination,
        }
    }
}

#[derive(Debug, Args)]
struct SuggestArgs {
    /// Field the text was typed into.
    #[arg(long, value_enum, default_value_t = FieldArg::Origin)]
    field: FieldArg,
    /// Text typed so far.
    #[arg(long)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RouteReport {
    route: RouteResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    map: Option<MapSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    map_notice: Option<MapFailureNotice>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let cli = Cli::parse();
    let settings = PlannerSettings::load_from_iter([OsString::from("walk-planner")])
        .map_err(|error| eyre!("failed to load planner settings: {error}"))?;
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build planner runtime")?;
    runtime.block_on(run(cli.command, settings))
}

async fn run(command: Command, settings: PlannerSettings) -> Result<()> {
    let backend = Arc::new(
        RoutingHttpClient::new(settings.backend_url()?, settings.request_timeout())
            .wrap_err("failed to build routing backend client")?,
    );
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let cache = Arc::new(match settings.cache_capacity() {
        Some(capacity) => RouteDataCache::with_capacity(backend.clone(), clock, capacity),
        None => RouteDataCache::new(backend.clone(), clock),
    });
    if settings.warm_featured {
        let report = warm_featured(&cache).await;
        info!(
            warmed = report.warmed.len(),
            failed = report.failed.len(),
            "featured walks warmed"
        );
    }

    match command {
        Command::Route(args) => plan_route(args, cache).await,
        Command::Featured => print_json(&load_featured(&cache).await),
        Command::Suggest(args) => {
            let debouncer = AddressSuggestionDebouncer::new(backend, settings.debounce());
            suggest(&debouncer, args).await
        }
    }
}

async fn plan_route(args: RouteArgs, cache: Arc<RouteDataCache>) -> Result<()> {
    let query = RouteQuery::parse(&args.origin, &args.destination, &args.mode, &args.units)
        .wrap_err("invalid route request")?;

    let library = Arc::new(HeadlessMapLibrary::new());
    let map = Arc::new(MapLifecycleController::new(library.clone()));
    map.attach(MountPoint::new(MOUNT_POINT)).await;
    map.set_interactive(!args.static_map).await;
    let view = RouteView::new(cache).with_map(Arc::clone(&map));

    view.show(&query).await;
    let report = match view.content() {
        RouteViewContent::Loaded {
            route, map_notice, ..
        } => RouteReport {
            route: RouteResult::clone(&route),
            map: (!args.static_map).then(|| library.snapshot()),
            map_notice,
        },
        RouteViewContent::Failed { message, .. } => return Err(eyre!(message)),
        RouteViewContent::Empty | RouteViewContent::Loading { .. } => {
            return Err(eyre!("route request did not settle"));
        }
    };
    print_json(&report)?;
    map.detach().await;
    Ok(())
}

async fn suggest(debouncer: &AddressSuggestionDebouncer, args: SuggestArgs) -> Result<()> {
    let field = SuggestionField::from(args.field);
    let mut results = debouncer.subscribe(field);
    debouncer.on_input(field, &args.text);
    results
        .changed()
        .await
        .wrap_err("suggestion lookup was abandoned")?;
    let suggestions = results.borrow_and_update().clone();
    print_json(&suggestions)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).wrap_err("failed to encode output")?;
    writeln!(stdout).wrap_err("failed to write output")?;
    Ok(())
}
