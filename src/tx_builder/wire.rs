//! Raw legacy-transaction byte layout
//!
//! `[compact-u16 signer count][64-byte signature slot] * count [message bytes]`
//!
//! Slots are positional: slot `i` belongs to account key `i` of the message.
//! Reserving every slot up front lets one signer sign the final message bytes
//! before the other signature exists.

use super::errors::WireError;

/// Size of one ed25519 signature slot
pub const SIGNATURE_LEN: usize = 64;

/// Encode a length as Solana's compact-u16 (1 to 3 bytes)
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(3);
    let mut rem = value;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            return out;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

/// Decode a compact-u16, returning the value and the number of bytes consumed
pub fn decode_compact_u16(bytes: &[u8]) -> Result<(u16, usize), WireError> {
    let mut value: u32 = 0;
    for i in 0..3 {
        let byte = *bytes.get(i).ok_or(WireError::Truncated {
            needed: i + 1,
            len: bytes.len(),
        })?;
        value |= u32::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            // the last byte may not be zero unless the value itself is zero
            if i > 0 && byte == 0 {
                return Err(WireError::MalformedLength);
            }
            return u16::try_from(value)
                .map(|v| (v, i + 1))
                .map_err(|_| WireError::MalformedLength);
        }
    }
    Err(WireError::MalformedLength)
}

/// Byte offset of a signature slot given the width of the length prefix
pub fn signature_offset(prefix_len: usize, slot: usize) -> usize {
    prefix_len + slot * SIGNATURE_LEN
}

/// Build `[count][zeroed slots][message]`, ready for signers to fill in
pub fn assemble_placeholder(signer_count: usize, message: &[u8]) -> Result<Vec<u8>, WireError> {
    let count = u16::try_from(signer_count)
        .ok()
        .filter(|c| *c > 0)
        .ok_or(WireError::InvalidSignerCount(signer_count))?;

    let prefix = encode_compact_u16(count);
    let mut out = Vec::with_capacity(prefix.len() + signer_count * SIGNATURE_LEN + message.len());
    out.extend_from_slice(&prefix);
    out.resize(prefix.len() + signer_count * SIGNATURE_LEN, 0);
    out.extend_from_slice(message);
    Ok(out)
}

/// Read back the 64-byte signature in `slot`
pub fn extract_signature(wire: &[u8], slot: usize) -> Result<[u8; SIGNATURE_LEN], WireError> {
    let (count, prefix_len) = decode_compact_u16(wire)?;
    let count = usize::from(count);
    if slot >= count {
        return Err(WireError::SlotOutOfRange { slot, count });
    }

    let start = signature_offset(prefix_len, slot);
    let end = start + SIGNATURE_LEN;
    let window = wire.get(start..end).ok_or(WireError::Truncated {
        needed: end,
        len: wire.len(),
    })?;

    let mut signature = [0u8; SIGNATURE_LEN];
    signature.copy_from_slice(window);
    Ok(signature)
}

/// Write a signature into `slot` of an assembled transaction
pub fn insert_signature(
    wire: &mut [u8],
    slot: usize,
    signature: &[u8; SIGNATURE_LEN],
) -> Result<(), WireError> {
    let (count, prefix_len) = decode_compact_u16(wire)?;
    let count = usize::from(count);
    if slot >= count {
        return Err(WireError::SlotOutOfRange { slot, count });
    }

    let start = signature_offset(prefix_len, slot);
    let len = wire.len();
    let window = wire
        .get_mut(start..start + SIGNATURE_LEN)
        .ok_or(WireError::Truncated {
            needed: start + SIGNATURE_LEN,
            len,
        })?;
    window.copy_from_slice(signature);
    Ok(())
}

/// Message bytes that follow the signature slots
pub fn message_bytes(wire: &[u8]) -> Result<&[u8], WireError> {
    let (count, prefix_len) = decode_compact_u16(wire)?;
    let start = signature_offset(prefix_len, usize::from(count));
    wire.get(start..).ok_or(WireError::Truncated {
        needed: start,
        len: wire.len(),
    })
}

/// Build the final two-signer transaction: slot 0 = user, slot 1 = custodian
pub fn assemble_final(
    message: &[u8],
    sig0: &[u8; SIGNATURE_LEN],
    sig1: &[u8; SIGNATURE_LEN],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + 2 * SIGNATURE_LEN + message.len());
    out.push(2);
    out.extend_from_slice(sig0);
    out.extend_from_slice(sig1);
    out.extend_from_slice(message);
    out
}
