use sikboot::api;

use crate::cli;
use crate::context;
use crate::exit_codes;
use crate::output::{Event, Reporter};

pub fn run(args: cli::DeviceArgs, out: &mut dyn Reporter) -> i32 {
    let opts = context::upload_opts(&args.port);
    let selection = context::port_selection(&args.port);

    let r = api::reboot(&selection, &opts, |ev| out.emit(Event::Operation(ev)));
    match r {
        Ok(()) => exit_codes::EXIT_OK,
        Err(e) => super::report_error(&e, out),
    }
}
