// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Length-prefix framing for stream transports.
//!
//! ```text
//! +----------------+-----------------+
//! | Length (4B BE) | Message payload |
//! +----------------+-----------------+
//! ```

use crate::transport::TransportError;
use std::io::{self, Read, Write};

/// Frame header size (4 bytes for length).
pub const FRAME_HEADER_SIZE: usize = 4;

/// Default maximum message size (16 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Build a frame (header + payload).
pub fn encode(payload: &[u8], max_size: usize) -> Result<Vec<u8>, TransportError> {
    if payload.len() > max_size {
        return Err(TransportError::FrameTooLarge {
            size: payload.len(),
            max: max_size,
        });
    }
    let len = u32::try_from(payload.len()).map_err(|_| TransportError::FrameTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;
    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Write one frame to a stream.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8], max_size: usize) -> io::Result<()> {
    let frame = encode(payload, max_size)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    writer.write_all(&frame)?;
    writer.flush()
}

/// Read one frame from a stream.
///
/// Returns `Ok(None)` on a clean end of stream before a header byte.
pub fn read_frame<R: Read>(reader: &mut R, max_size: usize) -> io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; FRAME_HEADER_SIZE];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds {}", len, max_size),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_encode_header_is_big_endian() {
        let frame = encode(b"hello", DEFAULT_MAX_MESSAGE_SIZE).expect("encode");
        assert_eq!(&frame[..4], &[0, 0, 0, 5]);
        assert_eq!(&frame[4..], b"hello");
    }

    #[test]
    fn test_read_multiple_frames() {
        let mut bytes = Vec::new();
        write_frame(&mut bytes, b"one", 64).expect("write");
        write_frame(&mut bytes, b"", 64).expect("write");
        write_frame(&mut bytes, b"three", 64).expect("write");

        let mut cursor = Cursor::new(bytes);
        assert_eq!(read_frame(&mut cursor, 64).expect("read"), Some(b"one".to_vec()));
        assert_eq!(read_frame(&mut cursor, 64).expect("read"), Some(Vec::new()));
        assert_eq!(read_frame(&mut cursor, 64).expect("read"), Some(b"three".to_vec()));
        assert_eq!(read_frame(&mut cursor, 64).expect("read"), None);
    }

    #[test]
    fn test_oversized_frames_rejected() {
        assert!(matches!(
            encode(&[0u8; 10], 4),
            Err(TransportError::FrameTooLarge { size: 10, max: 4 })
        ));

        let mut cursor = Cursor::new(vec![0, 0, 1, 0]);
        let err = read_frame(&mut cursor, 16).expect_err("too large");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_truncated_payload_is_an_error() {
        let mut cursor = Cursor::new(vec![0, 0, 0, 4, b'a']);
        assert!(read_frame(&mut cursor, 16).is_err());
    }
}
