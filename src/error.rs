use thiserror::Error;

//
// -----

/// Reasons for throwing away an entire PES payload.
///
/// The decoder is best-effort and never reports these to the caller, the
/// payload is logged and dropped instead.
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("empty PES payload")]
    Empty,
    /// Teletext payloads start with an EBU data_identifier, `EN 300 472 V1.3.1` expects `0x10` to `0x1F`.
    #[error("data_identifier {0:#04x} is outside of the EBU Teletext range")]
    NotEbuData(u8),
}
