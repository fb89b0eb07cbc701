use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use lumina_core::display::{StatsReport, Telemetry};
use lumina_core::io::save_frame;
use lumina_core::pipeline::{IngestOutcome, ProcessedFrame};
use lumina_core::source::{FrameSource, ImageSequenceSource, SourceHub, Translation};
use tracing::info;

use super::PipelineArgs;
use crate::summary::{print_config_summary, print_frame_summary};

#[derive(Args)]
pub struct RunArgs {
    /// Image directories, one source each, as DIR or DIR@x,y
    #[arg(required = true)]
    pub sources: Vec<String>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Number of acquisition ticks
    #[arg(short, long, default_value = "20")]
    pub ticks: usize,

    /// Stop when a source runs out of images instead of starting over
    #[arg(long)]
    pub no_loop: bool,

    /// Store the first composed frame as background
    #[arg(long)]
    pub freeze_background: bool,

    /// Print telemetry messages
    #[arg(long)]
    pub telemetry: bool,

    /// Save the last display frame (.png for 8-bit, otherwise 16-bit TIFF)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn parse_source(arg: &str, looping: bool) -> Result<(Box<dyn FrameSource>, Translation)> {
    let (dir, translation) = match arg.rsplit_once('@') {
        Some((dir, offsets)) => (dir, offsets.parse::<Translation>()?),
        None => (arg, Translation::default()),
    };
    let source = ImageSequenceSource::from_dir(Path::new(dir), looping)
        .with_context(|| format!("Failed to open source {dir}"))?;
    Ok((Box::new(source), translation))
}

pub fn run(args: &RunArgs) -> Result<()> {
    let mut config = args.pipeline.load_config()?;
    let mut processor = args.pipeline.processor(&config)?;
    let sources = args
        .sources
        .iter()
        .map(|arg| parse_source(arg, !args.no_loop))
        .collect::<Result<Vec<_>>>()?;

    print_config_summary(&config, &args.sources);
    let mut hub = SourceHub::start(sources, config.refresh_rate)?;
    if args.telemetry {
        println!("{}", Telemetry::start().to_message()?);
    }

    let mut last: Option<ProcessedFrame> = None;
    let mut frozen = false;
    for tick in 0..args.ticks {
        let partials = hub.collect_tick();
        let request = config.stats.request();
        let (outcome, processed) = processor.tick(partials, &config, &request);
        if let IngestOutcome::Error { message, interrupt } = outcome {
            if interrupt {
                bail!("Source error: {message}");
            }
            eprintln!("Source error: {message}");
        }
        if let Some(processed) = processed {
            config = config.adjusted(&processed.adjustments);
            if args.freeze_background && !frozen && processor.freeze_background() {
                config.background.apply = true;
                frozen = true;
            }
            let report = StatsReport::new(&processed.statistics, config.display.scaling, config.stats.without_scaling);
            if args.telemetry {
                println!("{}", Telemetry::alive(&report).to_message()?);
            }
            print_frame_summary(processor.previous_name(), &processed, &report);
            last = Some(processed);
        }
        if hub.is_finished() {
            info!(tick, "All sources finished");
            break;
        }
    }
    hub.shutdown();
    if args.telemetry {
        println!("{}", Telemetry::stop().to_message()?);
    }

    if let Some(path) = &args.output {
        let Some(processed) = &last else {
            bail!("No frame was displayed");
        };
        let Some(display) = &processed.display else {
            bail!("Last frame has nothing to display");
        };
        save_frame(display, processed.statistics.auto_levels(), path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
        println!("Display frame saved to {}", path.display());
    }

    Ok(())
}
