use sikboot::boot::ProcessJumper;
use sikboot::{emulator, serial};

use crate::cli;
use crate::context;
use crate::exit_codes;
use crate::output::{Event, Reporter};

pub fn run(args: cli::EmulateArgs, out: &mut dyn Reporter) -> i32 {
    let opts = context::emulator_opts(&args);

    let transport = match serial::SerialTransport::open(&args.port, args.baud) {
        Ok(t) => t,
        Err(e) => {
            out.emit(Event::Error {
                code: exit_codes::EXIT_NO_DEVICE,
                message: e.to_string(),
            });
            return exit_codes::EXIT_NO_DEVICE;
        }
    };

    out.emit(Event::Status(format!(
        "emulating on {} ({} baud), image {}",
        args.port,
        args.baud,
        opts.image.display()
    )));

    let mut jumper = ProcessJumper {
        program: args.app.clone(),
        args: args.app_args.clone(),
    };

    match emulator::serve(transport, &opts, &mut jumper) {
        Ok(resets) => {
            out.emit(Event::Status(format!("stopped after {resets} reset(s)")));
            exit_codes::EXIT_OK
        }
        Err(e) => {
            out.emit(Event::Error {
                code: exit_codes::EXIT_UNEXPECTED,
                message: e.to_string(),
            });
            exit_codes::EXIT_UNEXPECTED
        }
    }
}
