//! Directed scenarios with hand-picked payloads

use crate::bus::{DeviceUnderTest, StreamSink, StreamSource};
use crate::error::HarnessError;
use crate::harness::Harness;
use crate::stimulus::CyclePause;
use bytes::Bytes;

#[cfg(feature = "logging")]
use tracing::debug;

/// Payload lengths sent back-to-back by [`idles`]
pub const IDLE_FRAME_SIZES: [usize; 4] = [16, 17, 18, 23];

/// Extra cycles [`idles`] waits after every frame
pub const IDLE_SETTLE_CYCLES: u32 = 5;

/// Bytes `1, 2, …, len` (mod 256)
pub fn counting_payload(len: usize) -> Bytes {
    (1..=len).map(|i| (i % 256) as u8).collect()
}

/// Bytes `0, 1, …, len - 1` (mod 256)
pub fn ramp_payload(len: usize) -> Bytes {
    (0..len).map(|i| (i % 256) as u8).collect()
}

/// Single, repeated and short frames, then a 64-byte one
///
/// Expects a launched harness; settles after each group.
pub async fn basic<S, K, D>(harness: &mut Harness<S, K, D>) -> Result<(), HarnessError>
where
    S: StreamSource,
    K: StreamSink,
    D: DeviceUnderTest,
{
    let payload = Bytes::from_static(&[1, 2, 3, 4, 5, 6, 7]);

    #[cfg(feature = "logging")]
    debug!("Send 7B payload");
    harness.send(payload.clone()).await?;
    harness.settle().await?;

    #[cfg(feature = "logging")]
    debug!("Send 7B payload twice one by one");
    harness.send(payload.clone()).await?;
    harness.send(payload.clone()).await?;
    harness.settle().await?;

    #[cfg(feature = "logging")]
    debug!("Send 2B payload and 1B payload");
    harness.send(payload.slice(1..3)).await?;
    harness.send(payload.slice(1..2)).await?;
    harness.settle().await?;

    #[cfg(feature = "logging")]
    debug!("Send 64B payload");
    harness.send(counting_payload(64)).await?;
    harness.settle().await?;

    Ok(())
}

/// Ramp frames of a few odd sizes under the fixed-cycle pause pattern
pub async fn idles<S, K, D>(harness: &mut Harness<S, K, D>) -> Result<(), HarnessError>
where
    S: StreamSource,
    K: StreamSink,
    D: DeviceUnderTest,
{
    harness.set_pause_pattern(Box::new(CyclePause::new()))?;

    for len in IDLE_FRAME_SIZES {
        harness.send(ramp_payload(len)).await?;
        harness.idle(IDLE_SETTLE_CYCLES).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_payload() {
        let payload = counting_payload(64);
        assert_eq!(payload.len(), 64);
        assert_eq!(payload[0], 1);
        assert_eq!(payload[63], 64);
        assert_eq!(counting_payload(256)[255], 0);
    }

    #[test]
    fn test_ramp_payload() {
        assert_eq!(ramp_payload(3).as_ref(), &[0, 1, 2]);
        assert!(ramp_payload(0).is_empty());
    }
}
