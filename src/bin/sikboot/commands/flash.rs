use sikboot::api;

use crate::cli;
use crate::context;
use crate::exit_codes;
use crate::output::{DryRunSummary, Event, OperationRecorder, Reporter};

pub fn run(args: cli::FlashArgs, out: &mut dyn Reporter) -> i32 {
    let opts = context::flash_opts(&args);
    let selection = context::port_selection(&args.port);

    if args.dry_run {
        return dry_run(&args, &opts, &selection, out);
    }

    let mut recorder = OperationRecorder::new("flash");
    let r = api::flash_image(&args.hex, &selection, &opts, |ev| {
        recorder.observe(&ev);
        out.emit(Event::Operation(ev));
    });

    let (code, message) = match r {
        Ok(()) => (exit_codes::EXIT_OK, None),
        Err(e) => (super::report_error(&e, out), Some(e.to_string())),
    };

    out.emit(Event::OperationSummary(recorder.finish(code, message)));
    code
}

fn dry_run(
    args: &cli::FlashArgs,
    opts: &api::UploadOptions,
    selection: &api::PortSelection,
    out: &mut dyn Reporter,
) -> i32 {
    let r = api::plan_upload(&args.hex, selection, opts, |ev| {
        out.emit(Event::Operation(ev))
    });
    match r {
        Ok(plan) => {
            out.emit(Event::DryRun(DryRunSummary {
                bytes: plan.firmware.byte_count,
                segments: plan.firmware.segments.len(),
                chunks: plan.chunks,
                signed: plan.firmware.is_signed(&opts.layout),
                port: plan.port,
            }));
            exit_codes::EXIT_OK
        }
        Err(e) => super::report_error(&e, out),
    }
}
