//! Startup check: encoded wire sizes must match the published layouts.

use contracts::{ContractError, CorrectionPacket, FrameHeader, HEADER_SIZE, PACKET_SIZE};

/// Shared-memory header size both sides were built against
const EXPECTED_HEADER_SIZE: usize = 48;
/// Correction datagram size the actuation side expects
const EXPECTED_PACKET_SIZE: usize = 20;

/// Fails with `ProtocolMismatch` if any encoded size drifted
pub fn verify_protocol() -> Result<(), ContractError> {
    check("header constant", EXPECTED_HEADER_SIZE, HEADER_SIZE)?;
    check(
        "encoded header",
        EXPECTED_HEADER_SIZE,
        FrameHeader::new(0, 2, 2, 6, 0).encode().len(),
    )?;
    check("packet constant", EXPECTED_PACKET_SIZE, PACKET_SIZE)?;
    check(
        "encoded packet",
        EXPECTED_PACKET_SIZE,
        CorrectionPacket::release(0).encode().len(),
    )
}

fn check(what: &'static str, expected: usize, actual: usize) -> Result<(), ContractError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ContractError::ProtocolMismatch {
            what,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_sizes_match() {
        verify_protocol().unwrap();
    }

    #[test]
    fn test_mismatch_is_fatal() {
        let err = check("packet constant", 20, 24).unwrap_err();
        assert!(err.is_fatal_at_startup());
        assert!(err.to_string().contains("expected 20, got 24"));
    }
}
