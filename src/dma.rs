//! Hardware-queue path: transpose once, hand the bytes to a DMA-style engine, and
//! wait for completion without holding the CPU.
//!
//! [`ByteLaneTransmitter`] is generic over a [`DmaQueue`], the one seam a platform
//! has to provide (an SPI/PIO DMA channel, a LCD/I2S parallel peripheral, or a test
//! double). The transmitter owns its transpose buffer and refuses to touch it while
//! the queue may still be reading it.
//!
//! ```rust,no_run
//! use embassy_time::Duration;
//! use led_lanes::dma::{ByteLaneTransmitter, DmaQueue};
//! use led_lanes::lane::{Lane, LaneSet};
//! use led_lanes::padding::Protocol;
//! use led_lanes::transpose::Granularity;
//!
//! async fn show(queue: impl DmaQueue, left: &[u8], right: &[u8]) -> led_lanes::Result<()> {
//!     let mut transmitter: ByteLaneTransmitter<_, 2048> =
//!         ByteLaneTransmitter::new(queue, Granularity::Quad);
//!     let lane_set = LaneSet::<2>::new()
//!         .with_lane(0, Lane::new(left, Protocol::Ws2812))?
//!         .with_lane(1, Lane::new(right, Protocol::Ws2812))?;
//!     let done = transmitter.transmit(&lane_set, Duration::from_millis(20)).await?;
//!     if !done {
//!         transmitter.finish().await;
//!     }
//!     Ok(())
//! }
//! ```

use embassy_time::Duration;

use crate::lane::LaneSet;
use crate::transpose::{Granularity, PlaneTransposer, TransposeBuffer};
use crate::{Error, Result};

/// A hardware engine that streams a byte buffer out on its own.
///
/// The queue must finish reading the submitted bytes before reporting the
/// transfer as no longer busy.
pub trait DmaQueue {
    /// Identifies one submitted transfer.
    type Handle: Copy + Eq;

    /// Start streaming `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Submit`] if the engine refuses the buffer.
    fn submit(&mut self, bytes: &[u8]) -> Result<Self::Handle>;

    /// Wait up to `timeout` for `handle` to finish. `Ok(false)` means it is still
    /// running.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the engine reports a failed transfer.
    async fn wait(&mut self, handle: Self::Handle, timeout: Duration) -> Result<bool>;

    /// Whether `handle` is still running.
    fn is_busy(&self, handle: Self::Handle) -> bool;
}

/// Transposes lane sets into an owned buffer and streams it through a [`DmaQueue`].
pub struct ByteLaneTransmitter<Q: DmaQueue, const CAP: usize> {
    queue: Q,
    transposer: PlaneTransposer,
    buffer: TransposeBuffer<CAP>,
    in_flight: Option<Q::Handle>,
}

impl<Q: DmaQueue, const CAP: usize> ByteLaneTransmitter<Q, CAP> {
    /// Create a transmitter packing at `granularity` with the default fill byte.
    #[must_use]
    pub const fn new(queue: Q, granularity: Granularity) -> Self {
        Self::with_transposer(queue, PlaneTransposer::new(granularity))
    }

    /// Create a transmitter around an already configured transposer.
    #[must_use]
    pub const fn with_transposer(queue: Q, transposer: PlaneTransposer) -> Self {
        Self {
            queue,
            transposer,
            buffer: TransposeBuffer::new(),
            in_flight: None,
        }
    }

    /// Transpose `lanes` into the owned buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransmissionInFlight`] while the previous transfer is still
    /// reading the buffer; otherwise any transposition error.
    pub fn prepare<const N: usize>(&mut self, lanes: &LaneSet<'_, N>) -> Result<()> {
        self.ensure_idle()?;
        self.transposer.transpose_into(lanes, &mut self.buffer)
    }

    /// Submit the prepared buffer and return immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransmissionInFlight`] if a transfer is still running,
    /// [`Error::NothingToSend`] if the prepared buffer is empty, or the queue's
    /// submission error.
    pub fn emit_async(&mut self) -> Result<Q::Handle> {
        self.ensure_idle()?;
        if self.buffer.is_empty() {
            return Err(Error::NothingToSend);
        }
        let handle = self.queue.submit(self.buffer.as_bytes()).inspect_err(|_error| {
            #[cfg(feature = "defmt")]
            defmt::warn!("dma: submit failed: {}", _error);
        })?;
        #[cfg(feature = "defmt")]
        defmt::debug!("dma: submitted {} bytes", self.buffer.len());
        self.in_flight = Some(handle);
        Ok(handle)
    }

    /// Wait up to `timeout` for the outstanding transfer. `Ok(false)` means it is
    /// still running and still owns the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NothingToSend`] if nothing was submitted, or the queue's
    /// transport error.
    pub async fn wait(&mut self, timeout: Duration) -> Result<bool> {
        let Some(handle) = self.in_flight else {
            return Err(Error::NothingToSend);
        };
        let result = self.queue.wait(handle, timeout).await;
        match result {
            Ok(true) => self.in_flight = None,
            Ok(false) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("dma: transfer still running after {} ms", timeout.as_millis());
            }
            Err(_) => {
                if !self.queue.is_busy(handle) {
                    self.in_flight = None;
                }
            }
        }
        result
    }

    /// Whether a submitted transfer is still running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight
            .is_some_and(|handle| self.queue.is_busy(handle))
    }

    /// Block (cooperatively) until the outstanding transfer, if any, has released
    /// the buffer.
    pub async fn finish(&mut self) {
        if let Some(handle) = self.in_flight {
            while self.queue.is_busy(handle) {
                embassy_futures::yield_now().await;
            }
            self.in_flight = None;
        }
    }

    /// Prepare `lanes`, submit them, and wait up to `timeout`.
    ///
    /// An all-empty lane set sends nothing and returns `Ok(true)`.
    ///
    /// # Errors
    ///
    /// Any error from [`prepare`](Self::prepare), [`emit_async`](Self::emit_async),
    /// or [`wait`](Self::wait).
    pub async fn transmit<const N: usize>(
        &mut self,
        lanes: &LaneSet<'_, N>,
        timeout: Duration,
    ) -> Result<bool> {
        self.prepare(lanes)?;
        if self.buffer.is_empty() {
            return Ok(true);
        }
        self.emit_async()?;
        self.wait(timeout).await
    }

    /// The prepared buffer.
    #[must_use]
    pub const fn buffer(&self) -> &TransposeBuffer<CAP> {
        &self.buffer
    }

    /// The queue.
    #[must_use]
    pub const fn queue(&self) -> &Q {
        &self.queue
    }

    fn ensure_idle(&mut self) -> Result<()> {
        if let Some(handle) = self.in_flight {
            if self.queue.is_busy(handle) {
                #[cfg(feature = "defmt")]
                defmt::warn!("dma: buffer still owned by the running transfer");
                return Err(Error::TransmissionInFlight);
            }
            self.in_flight = None;
        }
        Ok(())
    }
}
