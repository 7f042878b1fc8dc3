//! Error types for aseq-core
//!
//! Every driver call returns a raw result code. [`Error::from_code`] is the
//! only place those codes are interpreted; the rest of the crate deals in
//! [`Error`] values.

use thiserror::Error;

/// Raw result code reported by the driver (0 means success)
pub type ResultCode = i32;

/// Result of a raw driver call, carrying the non-zero code on failure
pub type RawResult<T> = core::result::Result<T, ResultCode>;

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

/// Device addressing/connectivity failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// Identifier passed to the driver is invalid (500)
    #[error("wrong identifier")]
    WrongId,
    /// No matching device found (501)
    #[error("device not found")]
    NotFound,
    /// Device found but the connection failed (502)
    #[error("connection failed")]
    Failed,
    /// Device reports a different serial number (516)
    #[error("wrong serial number")]
    WrongSerial,
}

/// Protocol-level or state failures on a connected device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OperationError {
    /// Device was not initialized (503)
    #[error("device not initialized")]
    DeviceNotInitialized,
    /// Writing to the device failed (504)
    #[error("writing process failed")]
    WriteFailed,
    /// Reading from the device failed (505)
    #[error("reading process failed")]
    ReadFailed,
    /// Device sent an unexpected reply (506)
    #[error("wrong answer")]
    WrongAnswer,
    /// Remaining packet count mismatch while fetching a frame (507)
    #[error("remaining packets in frame mismatch")]
    FrameRemainingPackets,
    /// Wrong number of packets in a frame (508)
    #[error("wrong number of packets in frame")]
    FramePacketCount,
    /// A required input parameter was not initialized (509)
    #[error("input parameter not initialized")]
    InputNotInitialized,
    /// Remaining packet count mismatch while reading flash (510)
    #[error("remaining packets in flash mismatch")]
    FlashRemainingPackets,
    /// No device context was supplied (585)
    #[error("no device context")]
    NoDeviceContext,
    /// Latest-frame status word outside the documented values
    #[error("invalid frame status {0}")]
    InvalidFrameStatus(u16),
    /// Result code outside the documented set
    #[error("unexpected spectrometer error code: '{0}'")]
    Unexpected(ResultCode),
}

/// Caller misuse, detected before any driver call is issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Precondition {
    /// Operation attempted on a disconnected handle or session
    #[error("device not connected")]
    NotConnected,
    /// Flash offset past the last addressable byte
    #[error("maximum flash offset exceeded: 0x{0:X}")]
    FlashOffset(u32),
}

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Connectivity failure reported by the driver
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Operation failure reported by the driver
    #[error("operation error: {0}")]
    Operation(#[from] OperationError),

    /// Local precondition violation
    #[error("precondition violated: {0}")]
    Precondition(#[from] Precondition),

    /// Frame index outside the frames currently buffered on the device
    #[error("frame index {index} out of range ({len} frames in memory)")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Frames in memory at the time of the request
        len: usize,
    },

    /// The driver returned fewer flash bytes than requested
    #[error("incomplete flash read: expected {expected} bytes, got {actual}")]
    IncompleteRead {
        /// Bytes requested (after clamping)
        expected: usize,
        /// Bytes actually read
        actual: usize,
    },

    /// Capability declared but not implemented
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

impl Error {
    /// Map a non-zero driver result code to an error
    pub fn from_code(code: ResultCode) -> Self {
        match code {
            500 => ConnectionError::WrongId.into(),
            501 => ConnectionError::NotFound.into(),
            502 => ConnectionError::Failed.into(),
            516 => ConnectionError::WrongSerial.into(),
            503 => OperationError::DeviceNotInitialized.into(),
            504 => OperationError::WriteFailed.into(),
            505 => OperationError::ReadFailed.into(),
            506 => OperationError::WrongAnswer.into(),
            507 => OperationError::FrameRemainingPackets.into(),
            508 => OperationError::FramePacketCount.into(),
            509 => OperationError::InputNotInitialized.into(),
            510 => OperationError::FlashRemainingPackets.into(),
            585 => OperationError::NoDeviceContext.into(),
            other => OperationError::Unexpected(other).into(),
        }
    }

    /// Whether this is a connectivity failure
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Check a raw result code, 0 being success
pub fn check(code: ResultCode) -> Result<()> {
    match code {
        0 => Ok(()),
        code => Err(Error::from_code(code)),
    }
}

/// Known driver result codes
pub mod codes {
    use super::ResultCode;

    /// Success
    pub const OK: ResultCode = 0;
    /// Wrong identifier
    pub const CONNECT_ERROR_WRONG_ID: ResultCode = 500;
    /// Device not found
    pub const CONNECT_ERROR_NOT_FOUND: ResultCode = 501;
    /// Connection failed
    pub const CONNECT_ERROR_FAILED: ResultCode = 502;
    /// Device not initialized
    pub const DEVICE_NOT_INITIALIZED: ResultCode = 503;
    /// Writing process failed
    pub const WRITING_PROCESS_FAILED: ResultCode = 504;
    /// Reading process failed
    pub const READING_PROCESS_FAILED: ResultCode = 505;
    /// Wrong answer
    pub const WRONG_ANSWER: ResultCode = 506;
    /// Remaining packets in frame mismatch
    pub const GET_FRAME_REMAINING_PACKETS_ERROR: ResultCode = 507;
    /// Wrong number of packets in frame
    pub const NUM_OF_PACKETS_IN_FRAME_ERROR: ResultCode = 508;
    /// Input parameter not initialized
    pub const INPUT_PARAMETER_NOT_INITIALIZED: ResultCode = 509;
    /// Remaining packets in flash mismatch
    pub const READ_FLASH_REMAINING_PACKETS_ERROR: ResultCode = 510;
    /// Wrong serial number
    pub const CONNECT_ERROR_WRONG_SERIAL_NUMBER: ResultCode = 516;
    /// No device context
    pub const NO_DEVICE_CONTEXT_ERROR: ResultCode = 585;
}
