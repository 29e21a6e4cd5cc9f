//! Application entry point for outage-bot.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use dotenv::dotenv;
use log::debug;
use log::info;
use outage_bot::config::Config;
use outage_bot::entity::ChatId;
use outage_bot::feed::OutageSource;
use outage_bot::feed::loe_feed::LoeOutageFeed;
use outage_bot::logging::setup_logging;
use outage_bot::notification::NotificationCycle;
use outage_bot::notification::formatter::render_timestamp;
use outage_bot::repository::SubscriberLocks;
use outage_bot::repository::SubscriberStore;
use outage_bot::repository::file_store::FileSubscriberStore;
use outage_bot::sender::telegram_sender::TelegramSender;
use outage_bot::service::Services;
use outage_bot::task::notifier_task::NotifierTask;
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser)]
#[command(name = "outage-bot", about = "Power outage notifications for chat subscribers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the outage feed and notify subscribers.
    Notifier {
        /// Run a single cycle and exit.
        #[arg(long)]
        once: bool,
    },
    /// Print the current outages.
    Outages,
    /// List all subscribers.
    Users,
    /// Subscribe a chat to a street and building.
    Subscribe {
        chat_id: ChatId,
        street_id: i64,
        street_name: String,
        building: String,
    },
    /// Remove a chat's subscription.
    Unsubscribe { chat_id: ChatId },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let init_start = Instant::now();
    let (config, _log_guard) = load_config()?;

    match cli.command {
        Command::Notifier { once } => run_notifier(&config, once, init_start).await,
        Command::Outages => print_outages(&config).await,
        Command::Users => print_users(&config).await,
        Command::Subscribe {
            chat_id,
            street_id,
            street_name,
            building,
        } => {
            let services = setup_services(&config).await?;
            let result = services
                .subscription
                .subscribe(chat_id, street_id, &street_name, &building)
                .await?;
            println!("{result:?}");
            Ok(())
        }
        Command::Unsubscribe { chat_id } => {
            let services = setup_services(&config).await?;
            let removed = services.subscription.unsubscribe(chat_id).await?;
            println!("{}", if removed { "Unsubscribed." } else { "Not subscribed." });
            Ok(())
        }
    }
}

fn load_config() -> Result<(Arc<Config>, WorkerGuard)> {
    debug!("Loading configuration...");
    let mut config = Config::new();
    config.load()?;
    let guard = setup_logging(&config)?;
    Ok((Arc::new(config), guard))
}

async fn setup_store(config: &Config) -> Result<Arc<FileSubscriberStore>> {
    debug!("Setting up subscriber store...");
    Ok(Arc::new(
        FileSubscriberStore::new(config.subscribers_path()).await?,
    ))
}

async fn setup_services(config: &Config) -> Result<Services> {
    let store = setup_store(config).await?;
    Ok(Services::new(store, Arc::new(SubscriberLocks::new())))
}

async fn run_notifier(config: &Config, once: bool, init_start: Instant) -> Result<()> {
    info!("Starting outage-bot notifier...");
    let store = setup_store(config).await?;
    let source = Arc::new(LoeOutageFeed::new(&config.outage_api_url)?);
    let transport = Arc::new(TelegramSender::new(
        &config.telegram_api_url,
        config.telegram_token()?,
    )?);

    let cycle = Arc::new(NotificationCycle::new(
        source,
        store,
        transport,
        Arc::new(SubscriberLocks::new()),
        config.cycle_options()?,
    ));

    if once {
        let report = cycle.run_once().await?;
        info!("Single cycle finished: {report:?}");
        return Ok(());
    }

    let task = NotifierTask::new(cycle, config.poll_interval, config.quiet_hours);
    task.clone().start()?;

    info!(
        "outage-bot is up in {:.2}s. Press Ctrl+C to stop.",
        init_start.elapsed().as_secs_f64()
    );
    tokio::signal::ctrl_c().await?;
    info!("Ctrl+C received, waiting for deliveries in progress...");
    task.shutdown().await?;

    Ok(())
}

async fn print_outages(config: &Config) -> Result<()> {
    let source = LoeOutageFeed::new(&config.outage_api_url)?;
    let outages = source.list_current_outages().await?;

    println!("{} outages", outages.len());
    for o in outages {
        println!(
            "#{}\t{} - {}\t{}, {} ({})\t{}\t{}",
            o.id,
            render_timestamp(&o.start_timestamp),
            render_timestamp(&o.end_timestamp),
            o.city_name,
            o.street_name,
            o.street_id,
            o.affected_buildings,
            o.comment,
        );
    }
    Ok(())
}

async fn print_users(config: &Config) -> Result<()> {
    let store = setup_store(config).await?;
    let subscribers = store.all().await?;

    println!("{} subscribers", subscribers.len());
    for s in subscribers {
        let last = s.watermark.as_ref().map_or("never notified".to_string(), |w| {
            format!(
                "{} - {} ({})",
                render_timestamp(&w.start),
                render_timestamp(&w.end),
                w.comment
            )
        });
        println!(
            "{}\t{} ({})\t{}\t{}",
            s.chat_id, s.street_name, s.street_id, s.building, last
        );
    }
    Ok(())
}
