use clap::Parser;
use online_sim_rs::sim::params::{
    DISABLE_STATISTICS, REFRESH_TIME, SIM_EVENTS, SIM_TIME, TRANSITORY_EVENTS, TRANSITORY_TIME,
};
use online_sim_rs::sim::{ParamMap, Progress, Reason, ScenarioSpec, SimListener, SimState};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Parser)]
#[command(
    name = "online-sim",
    about = "Run an online network-design scenario and report time-weighted statistics"
)]
struct Args {
    /// Path to scenario.json
    #[arg(long)]
    scenario: PathBuf,

    /// Write the full report (statistics + module fragments) as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Stop after this many processed events
    #[arg(long)]
    sim_events: Option<u64>,

    /// Stop once the next event time reaches this value (seconds)
    #[arg(long)]
    sim_time: Option<f64>,

    /// End the transitory after this many processed events
    #[arg(long)]
    transitory_events: Option<u64>,

    /// End the transitory at this simulation time (seconds)
    #[arg(long)]
    transitory_time: Option<f64>,

    /// Minimum CPU seconds between progress refreshes
    #[arg(long)]
    refresh_time: Option<f64>,

    /// Do not collect statistics
    #[arg(long)]
    disable_statistics: bool,
}

impl Args {
    /// 命令行参数覆盖场景中的仿真参数
    fn overrides(&self) -> ParamMap {
        let mut map = ParamMap::new();
        if let Some(n) = self.sim_events {
            map.insert(SIM_EVENTS.to_string(), n.to_string());
        }
        if let Some(t) = self.sim_time {
            map.insert(SIM_TIME.to_string(), t.to_string());
        }
        if let Some(n) = self.transitory_events {
            map.insert(TRANSITORY_EVENTS.to_string(), n.to_string());
        }
        if let Some(t) = self.transitory_time {
            map.insert(TRANSITORY_TIME.to_string(), t.to_string());
        }
        if let Some(t) = self.refresh_time {
            map.insert(REFRESH_TIME.to_string(), t.to_string());
        }
        if self.disable_statistics {
            map.insert(DISABLE_STATISTICS.to_string(), "true".to_string());
        }
        map
    }
}

/// 把状态变化和刷新写到日志，保持标准输出只有报告
struct LogListener;

impl SimListener for LogListener {
    fn on_state_changed(&self, state: SimState, reason: &Reason) {
        info!(?state, %reason, "仿真状态变化");
    }

    fn on_refresh(&self, forced: bool, progress: &Progress) {
        debug!(
            forced,
            processed = progress.processed,
            pending = progress.pending,
            sim_time = %progress.sim_time,
            cpu_s = progress.cpu_time.as_secs_f64(),
            "进度"
        );
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    let scenario = match ScenarioSpec::from_path(&args.scenario) {
        Ok(s) => s,
        Err(e) => {
            error!(path = %args.scenario.display(), error = %e, "加载场景失败");
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };
    let mut runner = match scenario.build_runner(&args.overrides(), Some(Arc::new(LogListener))) {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "配置仿真失败");
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = runner.control().start() {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }
    let reason = runner.run();
    let report = runner.report();

    match &report.statistics {
        Some(stats) => print!("{}", stats.to_text()),
        None => println!("(no statistics)"),
    }
    for m in &report.modules {
        println!("[{}] {}", m.destination, m.title);
        print!("{}", m.body);
    }
    println!(
        "done @ t={}, events={}, reason={}",
        report.end_time, report.processed_events, report.reason
    );

    if let Some(path) = &args.report_json {
        let written = serde_json::to_string_pretty(&report)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(path, json).map_err(|e| e.to_string()));
        match written {
            Ok(()) => eprintln!("wrote report to {}", path.display()),
            Err(e) => {
                eprintln!("error: failed to write {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        }
    }

    if reason.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
