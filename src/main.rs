use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use primehaul_leads::{
    config::{database, notifications::NotificationSettings, settings},
    core::{distribution, lead, report, tier},
    errors::Result,
    notify::LoggingNotifier,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "primehaul-leads",
    about = "Operate the removal-lead marketplace from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the schema and seed pricing tiers from config.toml
    Init,
    /// Submit a finished survey and distribute it to matching companies
    Submit(SubmitArgs),
    /// Re-run distribution for a lead
    Distribute {
        /// Lead id
        #[arg(long)]
        lead_id: i64,
    },
    /// Expire stale leads and abandon unfinished surveys
    Expire,
    /// List pricing tiers
    Tiers,
    /// Print the revenue summary
    Revenue,
}

#[derive(Args, Debug)]
struct SubmitArgs {
    /// Survey token
    #[arg(long)]
    token: String,
    /// Customer name
    #[arg(long)]
    name: String,
    /// Customer email
    #[arg(long)]
    email: String,
    /// Customer phone
    #[arg(long)]
    phone: Option<String>,
}

async fn run(command: Command) -> Result<()> {
    let config = settings::load_default_config()?;
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    let notifier = Arc::new(LoggingNotifier::new(NotificationSettings::from_env()));

    match command {
        Command::Init => {
            database::create_tables(&db).await?;
            let seeded = tier::seed_tiers(&db, &config.pricing_tiers).await?;
            info!("Schema ready, {} pricing tiers seeded", seeded);
        }
        Command::Submit(args) => {
            let submitted = lead::submit_lead(
                &db,
                &args.token,
                lead::ContactDetails {
                    name: args.name,
                    email: args.email,
                    phone: args.phone,
                },
                &config.leads,
                Utc::now(),
            )
            .await?;
            println!(
                "Lead {} submitted: £{}-£{}",
                submitted.id,
                submitted.estimate_low.unwrap_or_default(),
                submitted.estimate_high.unwrap_or_default()
            );
            let task = distribution::spawn_distribution(Arc::new(db), submitted.id, notifier);
            if let Err(e) = task.await {
                error!("Distribution task for lead {} panicked: {}", submitted.id, e);
            }
        }
        Command::Distribute { lead_id } => {
            match distribution::distribute_lead(&db, lead_id, notifier.as_ref()).await? {
                Some(outcome) => println!(
                    "Lead {}: {} matched, {} newly notified, {} already notified",
                    outcome.lead_id,
                    outcome.matched,
                    outcome.newly_notified.len(),
                    outcome.already_notified
                ),
                None => println!("Lead {lead_id} is not active, nothing distributed"),
            }
        }
        Command::Expire => {
            let now = Utc::now();
            let expired = lead::expire_stale_leads(&db, now).await?;
            let cutoff = now - config.leads.abandon_after()?;
            let abandoned = lead::abandon_stale_surveys(&db, cutoff).await?;
            println!("{expired} leads expired, {abandoned} surveys abandoned");
        }
        Command::Tiers => {
            for t in tier::list_tiers(&db).await? {
                let max = t
                    .max_cbm
                    .map_or_else(|| "+".to_string(), |max| format!("-{max}"));
                println!(
                    "{:>3}  {:<12} {}{} CBM  {}{}",
                    t.id,
                    t.name,
                    t.min_cbm,
                    max,
                    report::format_price_pence(t.price_pence),
                    if t.is_active { "" } else { "  (inactive)" }
                );
            }
        }
        Command::Revenue => {
            let revenue = report::revenue_report(&db).await?;
            print!("{}", report::format_revenue_summary(&revenue));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Tracing first, so config loading is logged
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    dotenv().ok(); // env vars can be set externally
    info!("Attempted to load .env file.");

    run(Cli::parse().command)
        .await
        .inspect_err(|e| error!("Command failed: {}", e))
}
