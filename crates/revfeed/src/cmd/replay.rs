use std::fs::File;
use std::io::BufWriter;
use std::time::Instant;

use revfeed::run_session;

use crate::cmd::ReplayArgs;
use crate::exit::{io_error, report_exit_code, session_error, CliResult};
use crate::output::{print_summary, OutputFormat};

pub fn run(args: ReplayArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.tuning.session_config()?;
    let source = args.path.display().to_string();
    let input =
        File::open(&args.path).map_err(|err| io_error(&format!("cannot open {source}"), err))?;

    let started = Instant::now();
    let report = match &args.output {
        Some(path) => {
            let output = File::create(path)
                .map_err(|err| io_error(&format!("cannot create {}", path.display()), err))?;
            let report = run_session(input, BufWriter::new(output), &(), &config)
                .map_err(|err| session_error("replay failed", err))?;
            print_summary(&report, &source, started.elapsed(), format);
            report
        }
        // stdout carries the result rows, so the summary only goes to the log.
        None => run_session(input, std::io::stdout().lock(), &(), &config)
            .map_err(|err| session_error("replay failed", err))?,
    };

    Ok(report_exit_code(&report))
}
