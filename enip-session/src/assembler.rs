//! Stream reassembly
//!
//! TCP delivers a byte stream; encapsulated frames may arrive split across
//! reads or several to a read. The assembler buffers bytes and yields each
//! frame once its header and full declared body are present.

use crate::encapsulation::ENCAPSULATION_HEADER_LENGTH;
use bytes::{Bytes, BytesMut};

/// Bytes reserved ahead of every stream read
const READ_RESERVE: usize = 4096;

/// Offset of the length field inside the encapsulation header
const LENGTH_OFFSET: usize = 2;

/// Reassembly buffer for encapsulated frames
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buffer: BytesMut,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(READ_RESERVE),
        }
    }

    /// Buffer to read into, with spare capacity reserved
    pub fn read_buffer(&mut self) -> &mut BytesMut {
        self.buffer.reserve(READ_RESERVE);
        &mut self.buffer
    }

    /// Append received bytes
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Take the next complete frame, if one is buffered
    ///
    /// A frame is complete once the buffer holds 24 header bytes plus the
    /// body length the header declares; anything after it stays buffered.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        if self.buffer.len() < ENCAPSULATION_HEADER_LENGTH {
            return None;
        }
        let declared = u16::from_le_bytes([
            self.buffer[LENGTH_OFFSET],
            self.buffer[LENGTH_OFFSET + 1],
        ]) as usize;
        let total = ENCAPSULATION_HEADER_LENGTH + declared;
        if self.buffer.len() < total {
            return None;
        }
        Some(self.buffer.split_to(total).freeze())
    }

    /// Number of buffered bytes not yet returned as a frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encapsulation::frame;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Two frames back to back, so cuts can also land on the boundary
    fn stream() -> (Bytes, Bytes, Vec<u8>) {
        let first = frame::send_rr_data(1, 5, Bytes::from_static(&[0xCC; 10])).unwrap();
        let payload = Bytes::from_static(&[0x01, 0x00, 0x8E]);
        let second = frame::send_unit_data(1, 0x0102, 0xBBBB0002, payload).unwrap();
        let mut bytes = first.to_vec();
        bytes.extend_from_slice(&second);
        (first, second, bytes)
    }

    /// Feed `bytes` cut at the sorted offsets in `cuts`, collecting frames
    fn feed(bytes: &[u8], cuts: &[usize]) -> Vec<Bytes> {
        let mut assembler = FrameAssembler::new();
        let mut frames = Vec::new();
        let mut start = 0;
        for &end in cuts.iter().chain(std::iter::once(&bytes.len())) {
            assembler.extend(&bytes[start..end]);
            while let Some(frame) = assembler.next_frame() {
                frames.push(frame);
            }
            start = end;
        }
        assert_eq!(assembler.buffered(), 0);
        frames
    }

    #[test]
    fn test_frame_split_across_reads() {
        let bytes = frame::send_rr_data(1, 5, Bytes::from_static(&[0xCC; 10])).unwrap();
        for split in [1, 10, 23, 24, 25, bytes.len() - 1] {
            let mut assembler = FrameAssembler::new();
            assembler.extend(&bytes[..split]);
            assert!(assembler.next_frame().is_none(), "split at {}", split);
            assembler.extend(&bytes[split..]);
            assert_eq!(assembler.next_frame().unwrap(), bytes);
            assert_eq!(assembler.buffered(), 0);
        }
    }

    #[test]
    fn test_several_frames_in_one_read() {
        let first = frame::nop(7);
        let second = frame::send_rr_data(7, 3, Bytes::from_static(&[0x01])).unwrap();
        let mut assembler = FrameAssembler::new();
        let mut chunk = first.to_vec();
        chunk.extend_from_slice(&second);
        chunk.extend_from_slice(&first[..4]);
        assembler.extend(&chunk);

        assert_eq!(assembler.next_frame().unwrap(), first);
        assert_eq!(assembler.next_frame().unwrap(), second);
        assert!(assembler.next_frame().is_none());
        assert_eq!(assembler.buffered(), 4);
    }

    #[test]
    fn test_one_byte_per_read() {
        let (first, second, bytes) = stream();
        let cuts: Vec<usize> = (1..bytes.len()).collect();
        assert_eq!(feed(&bytes, &cuts), vec![first, second]);
    }

    #[test]
    fn test_arbitrary_cuts() {
        let (first, second, bytes) = stream();
        let fixed: [&[usize]; 5] = [
            &[],
            &[3, 7, 20],
            &[24, 25, 33],
            &[23, 40, 41, 42],
            &[2, 4, 6, 8, 10, 12, 14, 16, 18, 20, 22, 24, 26, 28, 30],
        ];
        for cuts in fixed {
            assert_eq!(feed(&bytes, cuts), [first.clone(), second.clone()], "cuts {:?}", cuts);
        }

        let mut rng = StdRng::seed_from_u64(0x0E1F);
        for _ in 0..200 {
            let count = rng.gen_range(1..12);
            let mut cuts: Vec<usize> = (0..count)
                .map(|_| rng.gen_range(1..bytes.len()))
                .collect();
            cuts.sort_unstable();
            cuts.dedup();
            assert_eq!(feed(&bytes, &cuts), [first.clone(), second.clone()], "cuts {:?}", cuts);
        }
    }
}
