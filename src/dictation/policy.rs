use super::DictationConfig;
use thiserror::Error;

/// Reasons dictation refuses to start before any socket is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolicyRejection {
    #[error("dictation unavailable: terminal is read-only (server needs --permit-write)")]
    WriteNotPermitted,
    #[error("dictation unavailable: no microphone found")]
    NoMicrophone,
    #[error("dictation needs https (or localhost) to access the microphone")]
    InsecureContext,
}

/// Checks in the order the user can fix them: write access, hardware, transport.
pub fn check_policy(
    config: &DictationConfig,
    microphone_available: bool,
) -> Result<(), PolicyRejection> {
    if !config.permit_write {
        return Err(PolicyRejection::WriteNotPermitted);
    }
    if !microphone_available {
        return Err(PolicyRejection::NoMicrophone);
    }
    if !config.secure_context {
        return Err(PolicyRejection::InsecureContext);
    }
    Ok(())
}
