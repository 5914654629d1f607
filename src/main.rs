//! 程序入口：解析参数、初始化日志、执行更新计划并输出审计日志

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::fmt::SubscriberBuilder;

use store_am_patch::{run_plan, PatchPlan, RunOptions};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "store_am_patch",
    disable_help_subcommand = true,
    about = "Batch-update a field of store records from a patch plan",
    long_about = "Load a JSON array of store records, update one field per store from the plan's lookup tables (direct or two-stage name -> id), append new stores, optionally sort, and write the result to every configured output.",
    after_help = "Relative paths inside the plan are resolved against the plan file's directory."
)]
struct Cli {
    #[arg(value_name = "PLAN", help = "Path to the JSON patch plan")]
    plan: PathBuf,
    #[arg(long = "dry-run", help = "Print the audit trail without writing any file")]
    dry_run: bool,
    #[arg(
        long,
        help = "Fail before writing if any name or store id in the plan could not be resolved"
    )]
    strict: bool,
    #[arg(
        long = "log-level",
        value_enum,
        default_value_t = LogLevel::Info,
        help = "Maximum log level written to stderr"
    )]
    log_level: LogLevel,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 日志写到 stderr，stdout 只保留审计日志
    let _ = SubscriberBuilder::default()
        .with_max_level(tracing::Level::from(cli.log_level))
        .with_writer(std::io::stderr)
        .try_init();

    let plan = PatchPlan::load(&cli.plan)
        .with_context(|| format!("加载更新计划失败: {}", cli.plan.display()))?;

    let options = RunOptions {
        dry_run: cli.dry_run,
        strict: cli.strict,
    };
    let outcome = run_plan(&plan, options)
        .with_context(|| format!("执行更新计划失败: {}", plan.input.display()))?;

    for change in &outcome.report.changes {
        println!("{}", change);
    }
    println!();
    for line in outcome.summary_lines() {
        println!("✅ {}", line);
    }
    Ok(())
}
