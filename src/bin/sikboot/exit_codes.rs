use sikboot::api::{UploadError, UploadErrorKind};

pub const EXIT_OK: i32 = 0;
pub const EXIT_NO_DEVICE: i32 = 10;
pub const EXIT_INVALID_HEX: i32 = 11;
pub const EXIT_WRITE_FAILED: i32 = 12;
pub const EXIT_VERIFY_FAILED: i32 = 13;
pub const EXIT_NO_SYNC: i32 = 14;
pub const EXIT_BOARD_MISMATCH: i32 = 15;
pub const EXIT_AMBIGUOUS: i32 = 16;
pub const EXIT_UNEXPECTED: i32 = 20;

pub fn for_upload_error(e: &UploadError) -> i32 {
    match e.kind() {
        UploadErrorKind::NoDevice => EXIT_NO_DEVICE,
        UploadErrorKind::AmbiguousTarget => EXIT_AMBIGUOUS,
        UploadErrorKind::InvalidHex => EXIT_INVALID_HEX,
        UploadErrorKind::NoSync => EXIT_NO_SYNC,
        UploadErrorKind::WriteFailed => EXIT_WRITE_FAILED,
        UploadErrorKind::VerifyFailed => EXIT_VERIFY_FAILED,
        UploadErrorKind::BoardMismatch => EXIT_BOARD_MISMATCH,
        UploadErrorKind::Unexpected => EXIT_UNEXPECTED,
    }
}
