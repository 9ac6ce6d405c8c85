//! Cohort CLI - offline query classification and SQL generation
//!
//! Usage:
//!   cohort classify "按照地区统计销售额" [--industry ecommerce]
//!   cohort compile skill.json [--digest]
//!   cohort rfm-sql --table orders --columns customer_id,order_date,amount
//!
//! Examples:
//!   cohort classify "top 10 customers by revenue" --output json
//!   cohort rfm-sql --table orders --columns customer_id,order_id,order_date,amount

use clap::{Parser, Subcommand, ValueEnum};
use cohort::config::Settings;
use cohort::digest::{render_digest, SkillConfig};
use cohort::rfm::{
    detect_rfm_columns, generate_customer_count_sql, generate_rfm_sql, validate_rfm_columns,
    TableSchema,
};
use cohort::routing::classify_by_keywords;
use cohort::sql::{compile_filter, compile_metrics};
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cohort")]
#[command(about = "Cohort - query-intent compiler and RFM segmentation engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a natural-language analytics question
    Classify {
        /// The question to classify
        query: String,

        /// Industry whose domain terms should be preferred
        #[arg(short, long)]
        industry: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Compile a skill configuration (JSON) to SQL fragments
    Compile {
        /// Path to the skill configuration JSON file
        file: PathBuf,

        /// Render the prompt digest instead of SQL
        #[arg(long)]
        digest: bool,
    },

    /// Detect RFM column roles and generate the feature query
    RfmSql {
        /// Table name
        #[arg(short, long)]
        table: String,

        /// Comma-separated column names
        #[arg(short, long)]
        columns: String,

        /// Random-sample cap override
        #[arg(long)]
        sample_size: Option<usize>,

        /// Recency baseline date (YYYY-MM-DD)
        #[arg(long)]
        baseline_date: Option<NaiveDate>,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Classify {
            query,
            industry,
            output,
        } => classify(&query, industry.as_deref(), output),
        Commands::Compile { file, digest } => compile(&file, digest),
        Commands::RfmSql {
            table,
            columns,
            sample_size,
            baseline_date,
        } => rfm_sql(&table, &columns, sample_size, baseline_date),
    }
}

fn classify(query: &str, industry: Option<&str>, output: OutputFormat) -> Result<(), String> {
    let result = classify_by_keywords(query, industry);
    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("type:       {}", result.query_type.as_str());
            println!("confidence: {:.2}", result.confidence);
            if let Some(n) = result.top_n {
                println!("top n:      {}", n);
            }
            if !result.matched_keywords.is_empty() {
                println!("keywords:   {}", result.matched_keywords.join(", "));
            }
        }
    }
    Ok(())
}

fn compile(file: &PathBuf, digest: bool) -> Result<(), String> {
    let content = fs::read_to_string(file).map_err(|e| format!("{}: {}", file.display(), e))?;
    let config: SkillConfig =
        serde_json::from_str(&content).map_err(|e| format!("invalid skill config: {}", e))?;

    if digest {
        let settings = Settings::load().map_err(|e| e.to_string())?;
        println!("{}", render_digest(&config, &settings.digest));
        return Ok(());
    }

    for filter in &config.filters {
        let sql = compile_filter(filter).map_err(|e| e.to_string())?;
        println!("filter: {}", sql);
    }
    for compiled in compile_metrics(&config.metrics, None).map_err(|e| e.to_string())? {
        println!("metric: {}", compiled.sql);
    }
    Ok(())
}

fn rfm_sql(
    table: &str,
    columns: &str,
    sample_size: Option<usize>,
    baseline_date: Option<NaiveDate>,
) -> Result<(), String> {
    let names: Vec<&str> = columns
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    let schema = TableSchema::new(table, &names);

    let detected = detect_rfm_columns(&schema);
    validate_rfm_columns(&detected).map_err(|e| e.to_string())?;

    let detection = serde_json::to_string_pretty(&detected).map_err(|e| e.to_string())?;
    println!("-- detection: {}", detection.replace('\n', "\n-- "));

    let count_sql = generate_customer_count_sql(table, &detected).map_err(|e| e.to_string())?;
    println!("-- customer count query:\n{};\n", count_sql);

    let query = generate_rfm_sql(table, &detected, sample_size, baseline_date)
        .map_err(|e| e.to_string())?;
    println!("-- rfm feature query (precomputed: {}):", query.is_precomputed);
    println!("{};", query.sql);
    Ok(())
}
