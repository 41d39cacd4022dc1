//! livesql - print the statement a query compiles to

use anyhow::{bail, Context, Result};
use clap::{Parser as ClapParser, ValueEnum};
use livesql::config::LiveConfig;
use livesql::query::{
    compile, compile_count, compile_fingerprint, compile_incremental, CompiledQuery, Criteria,
    OrderBy, QueryObject, SortDirection,
};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Full SELECT, as run by fetch_all
    Select,
    /// SELECT with LIMIT 1, as run by fetch_one
    One,
    /// COUNT(*) over the predicate
    Count,
    /// (row_count, max_id) change fingerprint
    Fingerprint,
    /// Rows past a watermark, as polled by for_each_new
    Incremental,
}

/// Compile a query description and print the SQL and its parameters
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base table
    #[arg(short, long)]
    table: String,

    /// Columns to select, comma separated
    #[arg(short, long, value_delimiter = ',')]
    select: Vec<String>,

    /// Object-style filter as JSON, e.g. '{"age": {"$gt": 18}}'
    #[arg(short, long)]
    filter: Option<String>,

    /// Ordering entry as field[:asc|desc]; repeatable
    #[arg(short, long)]
    order: Vec<String>,

    #[arg(short, long)]
    limit: Option<u64>,

    #[arg(long)]
    offset: Option<u64>,

    #[arg(short, long, value_enum, default_value = "select")]
    mode: Mode,

    /// Watermark for incremental mode
    #[arg(short, long, default_value = "0")]
    watermark: i64,

    /// JSON configuration file (id_column, poll_interval_ms, ...)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            LiveConfig::from_json(&text).context("Failed to parse config")?
        }
        None => LiveConfig::default(),
    };

    let iqo = build_query_object(&args)?;
    log::debug!("query object: {:?}", iqo);

    let compiled = match args.mode {
        Mode::Select => compile(&args.table, &iqo),
        Mode::One => {
            let mut single = iqo.clone();
            single.limit = Some(1);
            compile(&args.table, &single)
        }
        Mode::Count => compile_count(&args.table, &iqo),
        Mode::Fingerprint => compile_fingerprint(&args.table, &iqo, &config.id_column),
        Mode::Incremental => {
            compile_incremental(&args.table, &iqo, &config.id_column, args.watermark)
        }
    };

    print_compiled(&compiled)
}

fn build_query_object(args: &Args) -> Result<QueryObject> {
    let mut iqo = QueryObject::new();
    iqo.selected_columns = args.select.clone();
    iqo.limit = args.limit;
    iqo.offset = args.offset;

    if let Some(filter) = &args.filter {
        let json: serde_json::Value =
            serde_json::from_str(filter).context("Filter is not valid JSON")?;
        let resolved = Criteria::from_json(&json)?.resolve()?;
        iqo.conditions = resolved.conditions;
        iqo.or_groups = resolved.or_groups;
    }

    for entry in &args.order {
        iqo.ordering.push(parse_order(entry)?);
    }
    Ok(iqo)
}

fn parse_order(entry: &str) -> Result<OrderBy> {
    let (field, direction) = match entry.split_once(':') {
        Some((field, direction)) => (field, direction.parse::<SortDirection>()),
        None => (entry, Ok(SortDirection::Asc)),
    };
    if field.is_empty() {
        bail!("Empty field in ordering '{}'", entry);
    }
    let direction = direction.map_err(anyhow::Error::msg)?;
    Ok(OrderBy {
        field: field.to_string(),
        direction,
    })
}

fn print_compiled(compiled: &CompiledQuery) -> Result<()> {
    println!("{}", compiled.sql);
    println!("{}", serde_json::to_string(&compiled.params)?);
    Ok(())
}
