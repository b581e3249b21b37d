use std::io;

use tonetrace::{BatchReport, ColorMode, FileOutcome, TraceOptions, Tonetrace, VectorizeResult};

use crate::cli::{BatchArgs, BlackAndWhiteCommand, ColorCommand, GlobalOptions};
use crate::report::report_failure;

use super::utils::{build_tonetrace, derive_svg_path, load_uploads, write_svg};

/// The main function to run the color command.
pub fn run_color(global: &GlobalOptions, cmd: ColorCommand) -> VectorizeResult<bool> {
    let tonetrace = build_tonetrace(global)
        .with_trace_options(TraceOptions::from(&cmd.trace_options))
        .with_steps(cmd.steps)
        .with_cohort_order(cmd.cohort_order.into())
        .with_palette_size(cmd.palette_size);
    run_batch(&tonetrace, &cmd.batch, ColorMode::Color)
}

/// The main function to run the black-and-white command.
pub fn run_black_and_white(
    global: &GlobalOptions,
    cmd: BlackAndWhiteCommand,
) -> VectorizeResult<bool> {
    let tonetrace = build_tonetrace(global)
        .with_trace_options(TraceOptions::from(&cmd.trace_options))
        .with_binary_threshold(cmd.threshold);
    run_batch(&tonetrace, &cmd.batch, ColorMode::BlackAndWhite)
}

fn run_batch(tonetrace: &Tonetrace, batch: &BatchArgs, mode: ColorMode) -> VectorizeResult<bool> {
    let uploads = load_uploads(&batch.inputs)?;
    let report = tonetrace.process_files(&uploads, mode);
    write_outputs(&report, batch)?;

    if batch.json {
        let json = serde_json::to_string_pretty(&report).map_err(io::Error::from)?;
        println!("{json}");
    }
    Ok(report.all_processed())
}

/// Save every processed file and report every failed one; outcomes line up with inputs.
fn write_outputs(report: &BatchReport, batch: &BatchArgs) -> VectorizeResult<()> {
    for (input, outcome) in batch.inputs.iter().zip(&report.files) {
        match outcome {
            FileOutcome::Processed(result) => {
                let path = derive_svg_path(input, batch.output_dir.as_deref());
                write_svg(&path, &result.svg)?;
                if !batch.json {
                    println!("SVG saved to {}", path.display());
                }
            }
            FileOutcome::Failed(failure) => report_failure(failure),
        }
    }
    Ok(())
}
