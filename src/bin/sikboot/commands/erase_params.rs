use sikboot::api;

use crate::cli;
use crate::context;
use crate::exit_codes;
use crate::output::{Event, OperationRecorder, Reporter};

pub fn run(args: cli::DeviceArgs, out: &mut dyn Reporter) -> i32 {
    let opts = context::upload_opts(&args.port);
    let selection = context::port_selection(&args.port);

    let mut recorder = OperationRecorder::new("erase_params");
    let r = api::erase_params(&selection, &opts, |ev| {
        recorder.observe(&ev);
        out.emit(Event::Operation(ev));
    });
    let code = match r {
        Ok(()) => exit_codes::EXIT_OK,
        Err(e) => super::report_error(&e, out),
    };
    out.emit(Event::OperationSummary(recorder.finish(code, None)));
    code
}
