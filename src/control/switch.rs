//! Committed/uncommitted switch selection (DiSEqC 1.0/1.1)

use tracing::debug;

use crate::diseqc::protocol::{BurstSelector, ToneMode, Voltage};
use crate::diseqc::tables::{committed_frame, committed_index, uncommitted_frame};
use crate::error::Result;
use crate::frontend::{FrontendIo, Sleeper};
use crate::transport::BusTransport;

/// Select an LNB through the uncommitted and committed switch cascade
///
/// The uncommitted frame is delivered first, then the committed frame. Both
/// deliveries latch 18 V if `use_18v`, the 22 kHz tone if `hiband`, and send
/// burst A for even `switch_position`, B for odd.
///
/// # Arguments
///
/// * `switch_position` - Committed switch position (0-3)
/// * `use_18v` - Horizontal polarization
/// * `hiband` - High LNB band
/// * `uncommitted_port` - Uncommitted switch port (0-15)
///
/// # Errors
///
/// Returns `InvalidArgument` if either table index is out of range, before any
/// hardware call. The committed index is deliberately checked ahead of the
/// uncommitted delivery rather than after it, so an invalid committed position
/// never leaves the uncommitted switch changed on its own. Returns `Transport` if a delivery fails; the committed frame
/// is not sent when the uncommitted delivery fails.
pub async fn select_switch<F: FrontendIo, S: Sleeper>(
    bus: &mut BusTransport<F, S>,
    switch_position: i32,
    use_18v: bool,
    hiband: bool,
    uncommitted_port: i32,
) -> Result<()> {
    let uncommitted = *uncommitted_frame(uncommitted_port as i64)?;
    let index = committed_index(switch_position, hiband, use_18v);
    let committed = *committed_frame(index)?;

    let voltage = Voltage::from_18v(use_18v);
    let tone = ToneMode::for_band(hiband);
    let burst = BurstSelector::for_position(switch_position.unsigned_abs());

    debug!("DiSEqC: uncommitted switch port {}", uncommitted_port);
    bus.deliver(&[uncommitted], voltage, tone, burst).await?;

    debug!(
        "DiSEqC: switch pos {}, {}V, {}band (index {})",
        switch_position,
        if use_18v { "18" } else { "13" },
        if hiband { "hi" } else { "lo" },
        index
    );
    bus.deliver(&[committed], voltage, tone, burst).await
}
