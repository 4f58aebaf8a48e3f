use std::process;

use clap::Parser;

mod cli;
mod commands;
mod context;
mod exit_codes;
mod logging;
mod output;

fn main() {
    logging::init_tracing();

    let cli = cli::Cli::parse();

    let exit_code = match cli.command {
        cli::Command::Flash(args) => {
            let mut out = output::make_for_flash(&args);
            let code = commands::flash::run(args, &mut *out);
            out.finish();
            code
        }
        cli::Command::Identify(args) => {
            let mut out = output::make_for_device(&args);
            let code = commands::identify::run(args, &mut *out);
            out.finish();
            code
        }
        cli::Command::EraseParams(args) => {
            let mut out = output::make_for_device(&args);
            let code = commands::erase_params::run(args, &mut *out);
            out.finish();
            code
        }
        cli::Command::Reboot(args) => {
            let mut out = output::make_for_device(&args);
            let code = commands::reboot::run(args, &mut *out);
            out.finish();
            code
        }
        cli::Command::Dump(args) => {
            let mut out = output::make_for_dump(&args);
            let code = commands::dump::run(args, &mut *out);
            out.finish();
            code
        }
        cli::Command::List(args) => {
            let mut out = output::make_for_list(&args);
            let code = commands::list::run(args, &mut *out);
            out.finish();
            code
        }
        cli::Command::Emulate(args) => {
            let mut out = output::make_for_emulate(&args);
            let code = commands::emulate::run(args, &mut *out);
            out.finish();
            code
        }
    };

    process::exit(exit_code);
}
