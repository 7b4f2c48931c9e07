// ==========================================
// 车队排班系统 - 命令行入口
// ==========================================
// 子命令: quick / date / range / analyze
// 退出码: 任意顶层失败（含就绪检查未通过）返回非零
// ==========================================

use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fleet_scheduler::api::{ApiError, ApiResult, ScheduleOptions, SchedulingApi};
use fleet_scheduler::config::ConfigManager;
use fleet_scheduler::db::{
    default_db_path, init_schema, open_sqlite_connection, read_schema_version,
    CURRENT_SCHEMA_VERSION, DATE_FORMAT,
};
use fleet_scheduler::domain::Report;
use fleet_scheduler::engine::{AssignedRouteTripGenerator, CancellationSignal, GenerationOptions};
use fleet_scheduler::repository::SqliteFleetRepository;
use fleet_scheduler::{i18n, logging, perf, render};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database path (default: FLEET_SCHEDULER_DB_PATH or the user data dir)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Output language (en, zh-CN)
    #[arg(long, global = true, default_value = "en")]
    locale: String,

    /// Print the report as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Cap trips per bus per day for this run (cannot exceed the configured limit)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    max_daily_trips: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule from today for N days (default from config, 7)
    Quick { days: Option<u32> },
    /// Schedule a single date
    Date {
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
    },
    /// Schedule an inclusive date range
    Range {
        #[arg(value_parser = parse_date)]
        start: NaiveDate,
        #[arg(value_parser = parse_date)]
        end: NaiveDate,
    },
    /// Print the route optimization report of one depot (read-only)
    Analyze {
        depot_id: String,
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
}

fn parse_date(input: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .map_err(|e| format!("invalid date '{}' (expected YYYY-MM-DD): {}", input, e))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if !i18n::set_locale(&cli.locale) {
        warn!(locale = %cli.locale, supported = ?i18n::SUPPORTED_LOCALES, "不支持的语言，使用默认语言");
    }

    let db_path = cli.db.clone().unwrap_or_else(default_db_path);
    info!(
        app = fleet_scheduler::APP_NAME,
        version = fleet_scheduler::VERSION,
        locale = %i18n::current_locale(),
        db_path = %db_path,
        "启动排班"
    );

    // ===== 共享连接: 配置与仓储使用同一连接 =====
    let mut conn = open_sqlite_connection(&db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path))?;
    init_schema(&conn).context("数据库初始化失败")?;
    let schema_version = read_schema_version(&conn)?;
    if schema_version != Some(CURRENT_SCHEMA_VERSION) {
        warn!(found = ?schema_version, expected = CURRENT_SCHEMA_VERSION, "schema_version 不一致");
    }
    perf::install_sqlite_tracing(&mut conn);
    let conn = Arc::new(Mutex::new(conn));

    let config_manager = ConfigManager::from_connection(Arc::clone(&conn));
    let config = Arc::new(config_manager.load_scheduler_config()?);
    debug!(overrides = %config_manager.get_config_snapshot()?, "生效配置覆写");
    let repo = Arc::new(SqliteFleetRepository::from_connection(conn));
    let generator = Arc::new(AssignedRouteTripGenerator::new(
        Arc::clone(&repo),
        config.trip_generation.clone(),
    ));

    let cancel = CancellationSignal::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let api = SchedulingApi::with_cancellation(repo, generator, Arc::clone(&config), cancel);
    let options = ScheduleOptions {
        generation: GenerationOptions {
            max_daily_trips: cli.max_daily_trips,
            ..Default::default()
        },
        ..Default::default()
    };

    match cli.command {
        Commands::Quick { days } => {
            let days = days.unwrap_or(config.scheduling.default_days_to_schedule);
            print_report(api.quick_schedule(days, options).await, cli.json)
        }
        Commands::Date { date } => {
            print_report(api.schedule_for_date(date, options).await, cli.json)
        }
        Commands::Range { start, end } => print_report(
            api.schedule_date_range(start, end, options).await,
            cli.json,
        ),
        Commands::Analyze { depot_id, days } => {
            let report = api.analyze_depot(&depot_id, days).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render::render_optimization_report(&report));
            }
            Ok(())
        }
    }
}

fn print_report(result: ApiResult<Report>, json: bool) -> anyhow::Result<()> {
    match result {
        Ok(report) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render::render_report(&report));
            }
            Ok(())
        }
        Err(ApiError::NotReady { report }) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                eprint!("{}", render::render_readiness(&report));
            }
            anyhow::bail!("{}", i18n::t("readiness.not_ready"))
        }
        Err(e) => Err(e.into()),
    }
}
