use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Days, Local};
use clap::{ArgAction, Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use relief_forecast::{
    advisor::{briefing_prompt, restock_email, CommandProvider, ModelCascade},
    audit::{audit_health, sample_audit},
    coverage::{latest_status, CoverageReport},
    store::upload_csv,
    utils::{default_profiles, generate_usage_history},
    AppConfig, CsvDirectoryStore, ForecastProcedure, TableStore, UsageTable,
};
use serde::Serialize;
use tracing::info;

#[derive(Parser)]
#[command(name = "aid_ops", about = "Relief supply forecasting and data health", version)]
struct Cli {
    #[arg(long, global = true, help = "Configuration file (defaults to ./aidops.toml if present)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the table store directory")]
    data_dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[arg(long, global = true, default_value = "info", help = "Default log level")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill the input table with generated demo history
    Seed(SeedArgs),
    /// Replace a table with the contents of a CSV file
    Upload(UploadArgs),
    /// Compute the forecast and publish the result table
    Run(RunArgs),
    /// Report missing quantities and negative stock
    Audit(AuditArgs),
    /// Show stock coverage for a restock scenario
    Coverage(CoverageArgs),
    /// Generate an executive briefing
    Brief,
    /// Draft a restock request email for critical items
    Email,
    /// List stored tables and their grants
    Tables,
}

#[derive(Args)]
struct SeedArgs {
    #[arg(long, default_value_t = 60, help = "Days of history per item")]
    days: usize,
    #[arg(long, help = "Random seed for reproducible data")]
    seed: Option<u64>,
}

#[derive(Args)]
struct UploadArgs {
    #[arg(help = "CSV file with a header row")]
    file: PathBuf,
    #[arg(long, help = "Target table (defaults to the input table)")]
    table: Option<String>,
}

#[derive(Args)]
struct RunArgs {
    #[arg(long, help = "Table holding the usage history")]
    input_table: Option<String>,
    #[arg(long, help = "Date column")]
    date_col: Option<String>,
    #[arg(long, help = "Item name column")]
    item_col: Option<String>,
    #[arg(long, help = "Quantity used column")]
    qty_col: Option<String>,
    #[arg(long, help = "Stock remaining column")]
    stock_col: Option<String>,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        conflicts_with = "stock_col",
        help = "Input table has no stock column"
    )]
    no_stock: bool,
}

#[derive(Args)]
struct AuditArgs {
    #[arg(long, help = "Table to audit (defaults to the result table)")]
    table: Option<String>,
    #[arg(long, help = "Audit a random sample of this many rows")]
    sample: Option<usize>,
    #[arg(long, help = "Random seed for the sample")]
    seed: Option<u64>,
}

#[derive(Args)]
struct CoverageArgs {
    #[arg(long, help = "Simulated shipment added to every item")]
    restock: Option<f64>,
    #[arg(long, help = "Days of cover below which an item is critical")]
    critical_days: Option<f64>,
}

struct CliContext {
    config: AppConfig,
    store: CsvDirectoryStore,
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json);

    let mut config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let store = CsvDirectoryStore::open(&config.data_dir)
        .with_context(|| format!("failed to open table store at {}", config.data_dir.display()))?;
    let mut context = CliContext {
        config,
        store,
        json: cli.json,
    };

    match cli.command {
        Commands::Seed(args) => handle_seed(&mut context, args),
        Commands::Upload(args) => handle_upload(&mut context, args),
        Commands::Run(args) => handle_run(&mut context, args),
        Commands::Audit(args) => handle_audit(&context, args),
        Commands::Coverage(args) => handle_coverage(&context, args),
        Commands::Brief => handle_brief(&context),
        Commands::Email => handle_email(&context),
        Commands::Tables => handle_tables(&context),
    }
}

fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("aid_ops={level},relief_forecast={level}");
    let filter_directive = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let builder = fmt()
        .with_env_filter(EnvFilter::new(filter_directive))
        .with_writer(std::io::stderr);
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

fn handle_seed(context: &mut CliContext, args: SeedArgs) -> Result<()> {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let start = Local::now()
        .date_naive()
        .checked_sub_days(Days::new(args.days as u64))
        .context("history start date out of range")?;

    let records = generate_usage_history(&default_profiles(), args.days, start, &mut rng)?;
    let table = UsageTable::from_records(&records, &context.config.columns)?;
    let mut df = table.dataframe().clone();
    context
        .store
        .overwrite_table(&context.config.input_table, &mut df)
        .context("failed to write demo history")?;

    info!(rows = records.len(), table = %context.config.input_table, "demo history written");
    print_output(
        context.json,
        &serde_json::json!({ "table": context.config.input_table, "rows": records.len() }),
        || format!("Seeded {} rows into {}", records.len(), context.config.input_table),
    )
}

fn handle_upload(context: &mut CliContext, args: UploadArgs) -> Result<()> {
    let table = args.table.unwrap_or_else(|| context.config.input_table.clone());
    let rows = upload_csv(&mut context.store, &args.file, &table)
        .with_context(|| format!("upload of {} failed", args.file.display()))?;

    print_output(
        context.json,
        &serde_json::json!({ "table": table, "rows": rows }),
        || format!("Uploaded {} records into {}", rows, table),
    )
}

fn handle_run(context: &mut CliContext, args: RunArgs) -> Result<()> {
    let mut mapping = context.config.columns.clone();
    if let Some(date) = args.date_col {
        mapping.date = date;
    }
    if let Some(item) = args.item_col {
        mapping.item = item;
    }
    if let Some(qty) = args.qty_col {
        mapping.quantity = qty;
    }
    let input_table = args
        .input_table
        .unwrap_or_else(|| context.config.input_table.clone());
    if args.no_stock {
        mapping.stock = None;
    } else if let Some(stock) = args.stock_col {
        mapping.stock = Some(stock);
    } else {
        // The configured stock column is optional; an explicit one is not
        let usage = context
            .store
            .read_table(&input_table)
            .with_context(|| format!("failed to read input table {}", input_table))?;
        mapping = mapping.stock_if_present(&usage.get_column_names());
    }

    let procedure = ForecastProcedure::from_config(&context.config)?;
    let outcome = procedure
        .run(&mut context.store, &input_table, &mapping)
        .with_context(|| format!("forecast of {} failed; previous results kept", input_table))?;

    print_output(context.json, &outcome, || {
        format!(
            "{}\n  rows: {}\n  missing quantities: {}\n  negative stock: {}",
            outcome.message,
            outcome.rows,
            outcome.health.null_quantity_count,
            outcome.health.negative_stock_count
        )
    })
}

fn handle_audit(context: &CliContext, args: AuditArgs) -> Result<()> {
    let table = args
        .table
        .unwrap_or_else(|| context.config.result_table.clone());
    let procedure = ForecastProcedure::new(context.config.window, &table, &context.config.grant_role)?;
    let records = procedure
        .load_results(&context.store)
        .with_context(|| format!("failed to read forecast table {}", table))?
        .records()?;

    let health = match args.sample {
        Some(n) => {
            let mut rng = match args.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            sample_audit(&records, n, &mut rng)
        }
        None => audit_health(&records),
    };

    print_output(context.json, &health, || {
        format!(
            "Rows audited:       {}\nMissing records:    {} ({})\nNegative stock:     {} ({})\nData quality score: {:.0}%",
            health.rows,
            health.null_quantity_count,
            if health.null_quantity_count > 0 { "dirty" } else { "clean" },
            health.negative_stock_count,
            if health.negative_stock_count > 0 { "errors" } else { "perfect" },
            health.quality_score() * 100.0
        )
    })
}

fn handle_coverage(context: &CliContext, args: CoverageArgs) -> Result<()> {
    let records = load_forecast(context)?;
    let report = CoverageReport::build(
        &records,
        args.restock.unwrap_or(context.config.scenario.restock_units),
        args.critical_days
            .unwrap_or(context.config.scenario.critical_days),
    )?;

    print_output(context.json, &report, || {
        format!(
            "Active SKUs:     {}\nCritical risks:  {}{}\nCoverage buffer: +{}",
            report.active_skus,
            report.critical_count(),
            if report.has_risks() {
                format!(" ({})", report.critical_items.join(", "))
            } else {
                String::new()
            },
            report.restock_units
        )
    })
}

fn handle_brief(context: &CliContext) -> Result<()> {
    let records = load_forecast(context)?;
    let sector = context.config.sector()?;
    let scenario = &context.config.scenario;
    let report = CoverageReport::build(&records, scenario.restock_units, scenario.critical_days)?;

    let mut statuses = latest_status(&records);
    statuses.truncate(context.config.advisor.context_rows);
    let prompt = briefing_prompt(sector, &statuses);

    let cascade = match &context.config.advisor.command {
        Some(command) => ModelCascade::new(
            Box::new(CommandProvider::from_command_line(command)?),
            context.config.advisor.models.clone(),
        ),
        None => ModelCascade::offline(),
    };
    let briefing = cascade.brief(&prompt, &report);

    print_output(context.json, &briefing, || briefing.text.clone())
}

fn handle_email(context: &CliContext) -> Result<()> {
    let records = load_forecast(context)?;
    let sector = context.config.sector()?;
    let scenario = &context.config.scenario;
    let report = CoverageReport::build(&records, scenario.restock_units, scenario.critical_days)?;

    let critical: Vec<_> = latest_status(&records)
        .into_iter()
        .filter(|status| report.critical_items.contains(&status.item_id))
        .collect();
    let email = restock_email(sector, &critical);

    print_output(
        context.json,
        &serde_json::json!({ "critical_items": report.critical_items, "email": email }),
        || email.clone(),
    )
}

fn handle_tables(context: &CliContext) -> Result<()> {
    let mut tables = Vec::new();
    for name in context.store.table_names()? {
        let grants = context.store.grants(&name)?;
        tables.push(serde_json::json!({ "table": name, "grants": grants }));
    }

    print_output(context.json, &tables, || {
        tables
            .iter()
            .map(|t| {
                format!(
                    "{}\t{}",
                    t["table"].as_str().unwrap_or_default(),
                    t["grants"]
                        .as_array()
                        .map(|roles| roles
                            .iter()
                            .filter_map(|r| r.as_str())
                            .collect::<Vec<_>>()
                            .join(","))
                        .unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    })
}

fn load_forecast(context: &CliContext) -> Result<Vec<relief_forecast::ForecastRecord>> {
    let procedure = ForecastProcedure::from_config(&context.config)?;
    let table = procedure
        .load_results(&context.store)
        .context("no forecast results found; run `aid_ops run` first")?;
    Ok(table.records()?)
}

fn print_output<T, F>(json: bool, value: &T, text: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce() -> String,
{
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}
