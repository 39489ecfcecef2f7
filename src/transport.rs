//! # Bus Transport
//!
//! Physical-layer choreography for DiSEqC transactions.
//!
//! Switches and LNBs latch tone and voltage across commands, and the bus
//! message rides on the 22 kHz carrier, so every transaction follows the
//! same fixed order:
//!
//! ```text
//! tone off -> voltage -> 15ms -> (frame -> 15ms)* -> burst -> 15ms -> tone -> 15ms
//! ```
//!
//! Every step is awaited before the next one starts. A failing step aborts the
//! transaction and is reported as [`DiseqcError::Transport`]; retries are up to
//! the caller.

use std::time::Duration;
use tracing::debug;

use crate::diseqc::protocol::{BurstSelector, CommandFrame, ReplyFrame, ToneMode, Voltage};
use crate::error::{DiseqcError, Result, TransportStep};
use crate::frontend::{FrontendIo, Sleeper};

/// Settle delay after voltage/tone changes and after each frame
pub const SETTLE_DELAY: Duration = Duration::from_millis(15);

/// DiSEqC bus transport over a frontend
pub struct BusTransport<F, S> {
    frontend: F,
    sleeper: S,
}

impl<F, S> std::fmt::Debug for BusTransport<F, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusTransport").finish_non_exhaustive()
    }
}

fn fault(step: TransportStep) -> impl FnOnce(std::io::Error) -> DiseqcError {
    move |source| DiseqcError::Transport { step, source }
}

impl<F: FrontendIo, S: Sleeper> BusTransport<F, S> {
    pub fn new(frontend: F, sleeper: S) -> Self {
        Self { frontend, sleeper }
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn frontend_mut(&mut self) -> &mut F {
        &mut self.frontend
    }

    /// Release the frontend and sleeper
    pub fn into_parts(self) -> (F, S) {
        (self.frontend, self.sleeper)
    }

    /// Unconditional, non-cancellable delay
    pub async fn delay(&mut self, duration: Duration) {
        self.sleeper.sleep(duration).await;
    }

    /// Switch the 22 kHz tone off ahead of bus traffic
    pub async fn tone_off(&mut self) -> Result<()> {
        debug!("tone off");
        self.frontend
            .set_tone(ToneMode::Off)
            .await
            .map_err(fault(TransportStep::ToneOff))
    }

    /// Apply a final tone state
    pub async fn set_tone(&mut self, tone: ToneMode) -> Result<()> {
        debug!("tone {:?}", tone);
        self.frontend.set_tone(tone).await.map_err(fault(TransportStep::SetTone))
    }

    pub async fn set_voltage(&mut self, voltage: Voltage) -> Result<()> {
        debug!("voltage {:?}", voltage);
        self.frontend
            .set_voltage(voltage)
            .await
            .map_err(fault(TransportStep::SetVoltage))
    }

    /// Send one frame; `index` is its position in the enclosing sequence
    pub async fn send_frame(&mut self, frame: &CommandFrame, index: usize) -> Result<()> {
        debug!("DiSEqC: {}", frame);
        self.frontend
            .send_master_cmd(frame)
            .await
            .map_err(fault(TransportStep::SendFrame(index)))
    }

    pub async fn send_burst(&mut self, burst: BurstSelector) -> Result<()> {
        debug!("tone burst {:?}", burst);
        self.frontend
            .send_burst(burst)
            .await
            .map_err(fault(TransportStep::SendBurst))
    }

    /// Read a slave reply
    pub async fn recv_reply(&mut self, timeout: Duration) -> Result<ReplyFrame> {
        let reply = self
            .frontend
            .recv_slave_reply(timeout)
            .await
            .map_err(fault(TransportStep::ReceiveReply))?;
        debug!("DiSEqC reply: {:02x?}", reply.as_bytes());
        Ok(reply)
    }

    /// Deliver a command sequence with the full tone/voltage/burst choreography
    ///
    /// Frames are sent strictly in order; the first failing frame aborts the
    /// rest of the sequence.
    ///
    /// # Arguments
    ///
    /// * `sequence` - Frames to send, possibly empty
    /// * `voltage` - LNB voltage to latch before the frames
    /// * `tone` - Tone state to leave behind
    /// * `burst` - Mini-DiSEqC burst sent after the frames
    ///
    /// # Errors
    ///
    /// Returns `Transport` carrying the failing step and the device error
    pub async fn deliver(
        &mut self,
        sequence: &[CommandFrame],
        voltage: Voltage,
        tone: ToneMode,
        burst: BurstSelector,
    ) -> Result<()> {
        self.tone_off().await?;
        self.set_voltage(voltage).await?;
        self.delay(SETTLE_DELAY).await;

        for (index, frame) in sequence.iter().enumerate() {
            self.send_frame(frame, index).await?;
            self.delay(SETTLE_DELAY).await;
        }

        self.send_burst(burst).await?;
        self.delay(SETTLE_DELAY).await;

        self.set_tone(tone).await?;
        self.delay(SETTLE_DELAY).await;

        Ok(())
    }
}
