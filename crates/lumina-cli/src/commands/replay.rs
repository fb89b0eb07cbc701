use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use lumina_core::display::StatsReport;
use lumina_core::frame::PartialFrame;
use lumina_core::io::{load_frame, save_frame};
use lumina_core::pipeline::IngestOutcome;

use super::PipelineArgs;
use crate::summary::{print_config_summary, print_frame_summary};

#[derive(Args)]
pub struct ReplayArgs {
    /// Image files, processed in order as consecutive frames
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Directory for the processed display frames
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Save 8-bit PNG instead of 16-bit TIFF
    #[arg(long)]
    pub png: bool,
}

/// Push image files through the live pipeline without source threads.
pub fn run(args: &ReplayArgs) -> Result<()> {
    let mut config = args.pipeline.load_config()?;
    let mut processor = args.pipeline.processor(&config)?;
    print_config_summary(&config, &[format!("{} image file(s)", args.files.len())]);

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let pb = ProgressBar::new(args.files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:20} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );

    let mut last = None;
    let mut warnings = 0;
    for path in &args.files {
        let frame = load_frame(path).with_context(|| format!("Failed to load {}", path.display()))?;
        let name = path.display().to_string();
        pb.set_message(name.clone());

        let request = config.stats.request();
        let (outcome, processed) = processor.tick(vec![PartialFrame::new(name, frame)], &config, &request);
        if let IngestOutcome::Error { message, .. } = outcome {
            pb.println(format!("Source error: {message}"));
        }
        if let Some(processed) = processed {
            config = config.adjusted(&processed.adjustments);
            warnings += processed.warnings.len();
            if let (Some(dir), Some(display)) = (&args.output_dir, &processed.display) {
                let stem = path.file_stem().map_or_else(|| "frame".into(), |s| s.to_string_lossy());
                let target = dir.join(format!("{stem}.{}", if args.png { "png" } else { "tiff" }));
                save_frame(display, processed.statistics.auto_levels(), &target)
                    .with_context(|| format!("Failed to save {}", target.display()))?;
            }
            last = Some(processed);
        }
        pb.inc(1);
    }
    pb.finish_with_message("Done");
    println!();

    if let Some(processed) = &last {
        let report = StatsReport::new(&processed.statistics, config.display.scaling, config.stats.without_scaling);
        print_frame_summary(processor.previous_name(), processed, &report);
    }
    if warnings > 0 {
        println!("{warnings} warning(s) while processing, see the log for details");
    }
    if let Some(dir) = &args.output_dir {
        println!("Display frames saved to {}", dir.display());
    }

    Ok(())
}
