use std::net::Shutdown;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use revfeed::run_session;
use revfeed::transport::{ServerAddress, ServerStream};
use revfeed::StopInput;
use tracing::{info, warn};

use crate::cmd::{parse_duration, RunArgs};
use crate::exit::{
    report_exit_code, session_error, transport_error, CliError, CliResult, FAILURE, INTERNAL,
};
use crate::output::{print_summary, OutputFormat};

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.tuning.session_config()?;
    let read_timeout = args.read_timeout.as_deref().map(parse_duration).transpose()?;
    let address = ServerAddress::parse(&args.data_server)
        .map_err(|err| transport_error("invalid data server address", err))?;

    let mut stream =
        ServerStream::connect(&address).map_err(|err| transport_error("connect failed", err))?;
    stream
        .authenticate(&args.auth_token)
        .map_err(|err| transport_error("authentication failed", err))?;

    let input = stream
        .try_clone()
        .map_err(|err| transport_error("cannot clone connection", err))?;
    input
        .set_read_timeout(read_timeout)
        .map_err(|err| transport_error("cannot set read timeout", err))?;
    let control = Arc::new(
        stream
            .try_clone()
            .map_err(|err| transport_error("cannot clone connection", err))?,
    );
    let interrupted = Arc::new(AtomicBool::new(false));
    install_ctrlc_handler(Arc::clone(&control), Arc::clone(&interrupted))?;

    info!(peer = stream.peer_address(), ?read_timeout, "session started");
    let started = Instant::now();
    let report = run_session(input, &mut stream, &*control, &config)
        .map_err(|err| session_error("session failed", err))?;

    if let Err(err) = stream.shutdown(Shutdown::Both) {
        warn!(peer = stream.peer_address(), %err, "failed to close data server connection");
    }
    print_summary(&report, &address.to_string(), started.elapsed(), format);

    if interrupted.load(Ordering::SeqCst) {
        return Err(CliError::new(FAILURE, "session interrupted"));
    }
    Ok(report_exit_code(&report))
}

/// Ctrl-C ends the input; the session then winds down through its normal
/// end-of-stream path and the scores written so far stay valid.
fn install_ctrlc_handler(control: Arc<ServerStream>, interrupted: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        interrupted.store(true, Ordering::SeqCst);
        control.stop_input();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
