use sikboot::api;

use crate::cli;
use crate::context;
use crate::exit_codes;
use crate::output::{Event, Reporter};

pub fn run(args: cli::DumpArgs, out: &mut dyn Reporter) -> i32 {
    let opts = context::upload_opts(&args.port);
    let selection = context::port_selection(&args.port);

    let r = api::dump(&selection, args.addr, args.len, &opts, |ev| {
        out.emit(Event::Operation(ev))
    });
    let data = match r {
        Ok(data) => data,
        Err(e) => return super::report_error(&e, out),
    };

    match &args.output {
        Some(path) => match std::fs::write(path, &data) {
            Ok(()) => {
                out.emit(Event::Status(format!(
                    "wrote {} bytes to {}",
                    data.len(),
                    path.display()
                )));
                exit_codes::EXIT_OK
            }
            Err(e) => {
                out.emit(Event::Error {
                    code: exit_codes::EXIT_UNEXPECTED,
                    message: format!("{}: {e}", path.display()),
                });
                exit_codes::EXIT_UNEXPECTED
            }
        },
        None => {
            out.emit(Event::Dump {
                addr: args.addr,
                data,
            });
            exit_codes::EXIT_OK
        }
    }
}
