use derive_more::{Display, Error};

use crate::transpose::Granularity;

/// A specialized [`Result`] where the error is this crate's [`Error`] type.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors reported by lane preparation, transposition setup, and transmission.
///
/// Every variant except [`Error::Submit`] and [`Error::Transport`] is a configuration
/// error and is reported before any timing-critical work begins. A timing overrun is
/// not an error; see [`EmitReport`](crate::emitter::EmitReport).
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The lane set has no lane slots.
    #[display("lane set has no lanes")]
    NoLanes,

    /// More lanes than the chosen packing can carry.
    #[display("{granularity:?} packing carries at most {max} lanes, lane set has {lanes}")]
    TooManyLanes {
        /// Packing that was requested.
        granularity: Granularity,
        /// Lane slots in the lane set.
        lanes: usize,
        /// Most lanes the packing supports.
        max: usize,
    },

    /// A lane index beyond the lane set's slot count.
    #[display("lane index {index} is out of range for {lanes} lanes")]
    LaneIndexOutOfRange {
        /// Requested lane index.
        index: usize,
        /// Lane slots in the lane set.
        lanes: usize,
    },

    /// The transpose buffer cannot hold the interleaved frame.
    #[display("transposed frame needs {needed} bytes but the buffer holds {capacity}")]
    BufferTooSmall {
        /// Bytes the frame needs.
        needed: usize,
        /// Bytes the buffer can hold.
        capacity: usize,
    },

    /// The buffer was packed for a different consumer.
    #[display("buffer is packed as {actual:?} but {expected:?} is required")]
    GranularityMismatch {
        /// Packing the consumer needs.
        expected: Granularity,
        /// Packing the buffer holds.
        actual: Granularity,
    },

    /// The CPU clock is too slow to give every protocol phase at least one cycle.
    #[display("a {cpu_hz} Hz clock cannot resolve the protocol timing")]
    ClockTooSlow {
        /// CPU clock frequency in hertz.
        cpu_hz: u32,
    },

    /// A transmission is still in flight on this lane set.
    #[display("a transmission is already in flight")]
    TransmissionInFlight,

    /// There is no prepared frame (or no outstanding submission) to act on.
    #[display("no prepared frame to send")]
    NothingToSend,

    /// The hardware queue refused the buffer.
    #[display("hardware queue rejected the submission")]
    Submit,

    /// The hardware queue reported a failure while the transfer was running.
    #[display("hardware queue reported a transfer failure")]
    Transport,

    /// The pixel payload buffer is too small for the encoded pixels.
    #[display("encoded pixels need {needed} bytes but the payload holds {capacity}")]
    PayloadTooSmall {
        /// Bytes the encoding needs.
        needed: usize,
        /// Bytes the payload can hold.
        capacity: usize,
    },

    /// Output pins handed to a register-level backend are not consecutive GPIOs.
    #[display("lane pins must be consecutive GPIOs")]
    NonContiguousPins,

    /// An output pin reported an error.
    #[display("output pin error")]
    Pin,
}
