use anyhow::Error;
use gallery::error::GalleryError;

/// Process exit code: 2 for bad input or unknown records, 3 when the tally service
/// is unavailable, 1 otherwise.
pub fn exit_code(err: &Error) -> i32 {
    match err.downcast_ref::<GalleryError>() {
        Some(GalleryError::Validation { .. } | GalleryError::NotFound { .. }) => 2,
        Some(GalleryError::VotingUnavailable) => 3,
        _ => 1,
    }
}
