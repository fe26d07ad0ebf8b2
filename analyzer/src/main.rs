use anyhow::{bail, Context};
use clap::Parser;
use generator::profile::{write_synthetic_epoch, GeneratorConfig};
use masercore::interface::{NoTsysCorrection, TsysSource};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::operator::Operator;
use workflow::runner::{Runner, WorkflowResult};

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Frequency-switched maser spectrum reduction")]
struct Args {
    /// Source name, as used in scan directories and result stores
    source: String,
    /// Scan directory below `<data_dir>/<source>/`
    #[arg(required_unless_present = "monitor")]
    iteration: Option<String>,
    /// Observation log below `log_dir`
    #[arg(required_unless_present = "monitor")]
    log_file: Option<PathBuf>,
    /// Load the workflow config from YAML
    #[arg(long, default_value = "config/analyzer.yaml")]
    config: PathBuf,
    /// Modified z-score above which a channel is replaced
    #[arg(long, allow_hyphen_values = true)]
    threshold: Option<f64>,
    /// Skip outlier cleanup
    #[arg(long, default_value_t = false)]
    no_filter: bool,
    /// Pause after every pair and ask for missing system temperatures
    #[arg(long, default_value_t = false)]
    interactive: bool,
    /// Generate a synthetic epoch under the configured paths before reducing it
    #[arg(long, default_value_t = false)]
    synthetic: bool,
    /// Print variability and fluctuation indices of the source's components
    #[arg(long, default_value_t = false)]
    monitor: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut workflow_config = WorkflowConfig::load(&args.config)?;
    workflow_config.apply_overrides(args.threshold, args.no_filter)?;

    if args.monitor {
        return print_monitoring(&Runner::new(workflow_config), &args.source);
    }

    let (Some(iteration), Some(log_file)) = (args.iteration.as_deref(), args.log_file.as_ref())
    else {
        bail!("iteration and log file are required unless --monitor is given");
    };

    if args.synthetic {
        let generator = GeneratorConfig::default();
        let epoch = write_synthetic_epoch(
            &generator,
            &args.source,
            &workflow_config.scan_dir(&args.source, iteration),
            &workflow_config.log_path(log_file),
        )?;
        println!(
            "Synthetic epoch -> {} scans in {}, log {}",
            epoch.scan_files.len(),
            epoch.scan_dir.display(),
            epoch.log_path.display()
        );
        workflow_config
            .doppler
            .fixed_total_velocity
            .get_or_insert(0.0);
    }

    let runner = Runner::new(workflow_config.clone());
    let doppler = runner.doppler()?;
    let result = if args.interactive {
        let operator = Operator::console();
        runner.execute(
            &args.source,
            iteration,
            log_file,
            doppler.as_ref(),
            &operator,
            |pair| operator.review(pair).context("waiting for operator review"),
        )?
    } else {
        let tsys: &dyn TsysSource = &NoTsysCorrection;
        runner.execute(
            &args.source,
            iteration,
            log_file,
            doppler.as_ref(),
            tsys,
            |_| Ok(()),
        )?
    };

    print_summary(&result);
    append_journal(&workflow_config, &args.source, iteration, &result)
}

fn print_summary(result: &WorkflowResult) {
    let report = &result.report;
    println!(
        "{} -> {} of {} pairs averaged, {} channels, rejected {:?}, excluded {:?}",
        report.epoch.experiment_key(),
        report.record.averaged_pairs,
        report.record.pair_count,
        report.spectrum.len(),
        result.rejected_pairs,
        report
            .excluded
            .iter()
            .map(|pair| pair.index)
            .collect::<Vec<_>>()
    );
    for component in &report.record.components {
        println!(
            "  {:>8.3} km/s: A {:.3} Jy, B {:.3} Jy, avg {:.3} Jy",
            component.velocity, component.flux_a, component.flux_b, component.flux_average
        );
    }
    for warning in &result.metrics.warnings {
        println!("  warning: {warning}");
    }
}

fn append_journal(
    config: &WorkflowConfig,
    source: &str,
    iteration: &str,
    result: &WorkflowResult,
) -> anyhow::Result<()> {
    let metrics = serde_json::to_string(&result.metrics).context("serialising run metrics")?;
    let line = format!(
        "source={} iteration={} key={} averaged={} metrics={}\n",
        source,
        iteration,
        result.report.epoch.experiment_key(),
        result.report.record.averaged_pairs,
        metrics
    );
    let journal = config.paths.result_dir.join("analyzer.log");
    if let Some(parent) = journal.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&journal)
        .with_context(|| format!("opening run journal {}", journal.display()))?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

fn print_monitoring(runner: &Runner, source: &str) -> anyhow::Result<()> {
    let indices = runner.monitor(source)?;
    if indices.is_empty() {
        println!("{source}: no component amplitudes recorded yet");
        return Ok(());
    }
    let show = |value: Option<f64>| value.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"));
    for component in indices {
        println!(
            "{source} {:>8.3} km/s over {} epochs: VI A {} B {} avg {}, FI A {} B {} avg {}",
            component.velocity,
            component.epochs,
            show(component.variability_a),
            show(component.variability_b),
            show(component.variability_average),
            show(component.fluctuation_a),
            show(component.fluctuation_b),
            show(component.fluctuation_average)
        );
    }
    Ok(())
}
