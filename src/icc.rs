//! ICC profile reconciliation and JPEG APP2 segment reassembly.

use tracing::debug;

/// Fixed size of the ICC profile header.
pub const ICC_HEADER_SIZE: usize = 128;

/// `ICC_PROFILE\0` tag plus the sequence number and segment count bytes.
pub const APP2_SEGMENT_HEADER_LEN: usize = 14;

pub const APP2_TAG: &[u8; 11] = b"ICC_PROFILE";

/// Profile size as declared by the first four header bytes.
#[inline]
pub fn declared_size(profile: &[u8]) -> Option<u32> {
    profile
        .get(..4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

/// Keeps `profile` only if it is at least a full header long and its length
/// matches the size it declares.
pub fn reconcile(profile: Vec<u8>) -> Option<Vec<u8>> {
    if profile.len() < ICC_HEADER_SIZE {
        debug!(len = profile.len(), "ICC profile shorter than its header, dropped");
        return None;
    }

    match declared_size(&profile) {
        Some(size) if size as usize == profile.len() => Some(profile),
        declared => {
            debug!(
                ?declared,
                actual = profile.len(),
                "ICC profile length mismatch, dropped"
            );
            None
        }
    }
}

/// Collects `ICC_PROFILE` APP2 segments, which may arrive in any order.
///
/// Segments are slotted by their 1-based sequence number. The first segment
/// fixes the expected count; any later disagreement poisons the profile.
#[derive(Debug, Default)]
pub struct SegmentedProfile {
    slots: Vec<Option<Vec<u8>>>,
    inconsistent: bool,
}

impl SegmentedProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores one APP2 payload. `segment` starts with the 14-byte
    /// `ICC_PROFILE` header; zero sequence numbers and counts count as 1.
    pub fn add(&mut self, segment: Vec<u8>) {
        if segment.len() < APP2_SEGMENT_HEADER_LEN || !segment.starts_with(APP2_TAG) {
            return;
        }

        let order = segment[12].max(1) as usize;
        let count = segment[13].max(1) as usize;

        if self.slots.is_empty() {
            self.slots = vec![None; count];
        } else if self.slots.len() != count {
            debug!(
                expected = self.slots.len(),
                declared = count,
                "ICC segment count disagrees"
            );
            self.inconsistent = true;
            return;
        }

        match self.slots.get_mut(order - 1) {
            Some(slot) => *slot = Some(segment),
            None => {
                debug!(order, count, "ICC segment number out of range");
                self.inconsistent = true;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Concatenates the segment payloads in sequence order. Returns `None`
    /// unless every declared segment arrived and the result reconciles.
    pub fn assemble(self) -> Option<Vec<u8>> {
        if self.slots.is_empty() {
            return None;
        }
        if self.inconsistent {
            return None;
        }

        let count = self.slots.len();
        let mut profile = Vec::new();
        for (index, slot) in self.slots.into_iter().enumerate() {
            match slot {
                Some(segment) => profile.extend_from_slice(&segment[APP2_SEGMENT_HEADER_LEN..]),
                None => {
                    debug!(missing = index + 1, count, "ICC profile incomplete, dropped");
                    return None;
                }
            }
        }

        reconcile(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(len: usize) -> Vec<u8> {
        let mut data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        data[..4].copy_from_slice(&(len as u32).to_be_bytes());
        data
    }

    fn segment(order: u8, count: u8, payload: &[u8]) -> Vec<u8> {
        let mut seg = Vec::new();
        seg.extend_from_slice(b"ICC_PROFILE\0");
        seg.push(order);
        seg.push(count);
        seg.extend_from_slice(payload);
        seg
    }

    #[test]
    fn test_reconcile_checks_declared_size() {
        assert!(reconcile(profile(200)).is_some());

        let mut wrong = profile(200);
        wrong[3] = 0x10;
        assert!(reconcile(wrong).is_none());

        assert!(reconcile(profile(64)).is_none());
    }

    #[test]
    fn test_out_of_order_segments() {
        let data = profile(300);
        let mut assembler = SegmentedProfile::new();
        assembler.add(segment(3, 3, &data[200..]));
        assembler.add(segment(1, 3, &data[..100]));
        assembler.add(segment(2, 3, &data[100..200]));
        assert_eq!(assembler.assemble(), Some(data));
    }

    #[test]
    fn test_missing_segment_drops_profile() {
        let data = profile(300);
        let mut assembler = SegmentedProfile::new();
        assembler.add(segment(1, 3, &data[..100]));
        assembler.add(segment(3, 3, &data[200..]));
        assert!(assembler.assemble().is_none());
    }

    #[test]
    fn test_zero_order_and_count_mean_single_segment() {
        let data = profile(150);
        let mut assembler = SegmentedProfile::new();
        assembler.add(segment(0, 0, &data));
        assert_eq!(assembler.assemble(), Some(data));
    }

    #[test]
    fn test_conflicting_counts_drop_profile() {
        let data = profile(200);
        let mut assembler = SegmentedProfile::new();
        assembler.add(segment(1, 2, &data[..100]));
        assembler.add(segment(2, 3, &data[100..]));
        assert!(assembler.assemble().is_none());
    }

    #[test]
    fn test_order_beyond_count_drops_profile() {
        let data = profile(200);
        let mut assembler = SegmentedProfile::new();
        assembler.add(segment(1, 2, &data[..100]));
        assembler.add(segment(2, 2, &data[100..]));
        assembler.add(segment(5, 2, &data[100..]));
        assert!(assembler.assemble().is_none());
    }
}
