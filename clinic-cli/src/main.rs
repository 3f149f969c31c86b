mod config;

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use clinic_reports::{ClinicCatalog, ReportKind};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "clinic-cli",
    about = "Sinh dữ liệu mẫu và dashboard KPI cho phòng khám siêu âm."
)]
struct Args {
    /// Đường dẫn tới file cấu hình TOML.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Hạt giống cố định để tái tạo đúng dữ liệu.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Tên báo cáo (`volume`, `aging`, ...) hoặc `all` cho cả dashboard.
    #[arg(short, long, default_value = "all")]
    report: String,

    /// Ngày kết thúc cửa sổ lịch sử (YYYY-MM-DD).
    #[arg(short, long)]
    anchor: Option<NaiveDate>,

    /// In JSON có thụt lề.
    #[arg(long)]
    pretty: bool,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let settings = config::load_settings(args.config.as_deref())?;
    let mut report_config = settings.report;
    if args.seed.is_some() {
        report_config.seed = args.seed;
    }
    if args.anchor.is_some() {
        report_config.anchor_date = args.anchor;
    }
    let catalog = settings.catalog.unwrap_or_else(ClinicCatalog::default);

    if args.report.trim().eq_ignore_ascii_case("all") {
        let snapshot = clinic_reports::build_dashboard(&report_config, &catalog)
            .context("Không tạo được dashboard")?;
        print_json(&snapshot, args.pretty)
    } else {
        let kind: ReportKind = args.report.parse()?;
        let report = clinic_reports::build_report(kind, &report_config, &catalog)
            .with_context(|| format!("Không tạo được báo cáo {kind}"))?;
        print_json(&report, args.pretty)
    }
}
