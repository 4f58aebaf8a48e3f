pub mod dump;
pub mod emulate;
pub mod erase_params;
pub mod flash;
pub mod identify;
pub mod list;
pub mod reboot;

use sikboot::api::UploadError;

use crate::exit_codes;
use crate::output::{Event, Reporter};

fn report_error(e: &UploadError, out: &mut dyn Reporter) -> i32 {
    let code = exit_codes::for_upload_error(e);
    out.emit(Event::Error {
        code,
        message: e.to_string(),
    });
    if code == exit_codes::EXIT_AMBIGUOUS {
        out.emit(Event::HintAmbiguousTargets);
    }
    code
}
