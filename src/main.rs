use clap::Parser;
use mels_schedule::locator::OccupancySourceLocator;
use mels_schedule::model::InMemoryModel;
use mels_schedule::output::{FileOutput, SinkOutput};
use mels_schedule::{run_measure, RunConfig, RunSummary};
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser, Default, Debug)]
#[clap(author, version, about, long_about = None)]
struct MelsArgs {
    #[arg(help = "Path to the building model in .json format")]
    model_file: PathBuf,
    #[arg(long, short, help = "Path to a run configuration in .json format")]
    config: Option<PathBuf>,
    #[arg(
        long,
        short,
        help = "Occupancy schedule to use instead of looking in the default locations"
    )]
    occ_schedule: Option<PathBuf>,
    #[arg(
        long,
        help = "Directory the measure runs in, schedules are written here (defaults to the current directory)"
    )]
    run_dir: Option<PathBuf>,
    #[arg(long, help = "Directory of the measure, used to find workflow files")]
    measure_dir: Option<PathBuf>,
    #[arg(long, short, help = "Minutes per value in the occupancy schedule")]
    minutes_per_step: Option<u32>,
    #[arg(
        long,
        help = "Where to write the updated model (defaults to overwriting the input model)"
    )]
    output_model: Option<PathBuf>,
    #[clap(
        long,
        default_value_t = false,
        help = "Create schedules without writing them or changing the model"
    )]
    dry_run: bool,
    #[clap(long, default_value_t = false, help = "Whether to log out spans")]
    log_spans: bool,
}

fn main() -> anyhow::Result<()> {
    let args = MelsArgs::parse();

    // set up basic tracing
    let tracing_subscriber = {
        let mut builder = tracing_subscriber::fmt::fmt().with_max_level(tracing::Level::INFO);

        if args.log_spans {
            builder = builder.with_span_events(FmtSpan::CLOSE);
        }

        builder.finish()
    };
    tracing::subscriber::set_global_default(tracing_subscriber)?;

    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if let Some(occ_schedule) = args.occ_schedule {
        config.occ_schedule_path = Some(occ_schedule);
    }
    if let Some(minutes_per_step) = args.minutes_per_step {
        config.minutes_per_step = minutes_per_step;
    }
    config.validate()?;
    debug!("Running with {config:?}");

    let run_dir = match args.run_dir {
        Some(run_dir) => run_dir,
        None => env::current_dir()?,
    };
    let locator = OccupancySourceLocator::for_run(
        args.measure_dir.as_deref(),
        &run_dir,
        &config.occupancy_file_name,
    );

    let mut model = InMemoryModel::load(&args.model_file)?;

    let summary = if args.dry_run {
        run_measure(&mut model, &config, &locator, SinkOutput)?
    } else {
        run_measure(&mut model, &config, &locator, FileOutput::new(run_dir))?
    };

    if !args.dry_run {
        let output_model = args.output_model.unwrap_or(args.model_file);
        model.save(&output_model)?;
        debug!("Saved updated model to {}", output_model.display());
    }

    print_summary(&summary);

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("Occupancy schedule: {}", summary.source_path.display());
    match &summary.schedule_path {
        Some(path) => println!("Equipment schedules: {}", path.display()),
        None => println!("Equipment schedules: not written"),
    }
    println!("Rooms with new schedules: {}", summary.rooms_processed);
    for excluded in &summary.rooms_excluded {
        println!("  skipped {} ({:?})", excluded.room, excluded.reason);
    }
    println!(
        "Electric equipment removed: {}, added: {}",
        summary.equipment_removed, summary.equipment_attached
    );
}
