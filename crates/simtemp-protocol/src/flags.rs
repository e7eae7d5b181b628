//! Sample flag bits.

use bitflags::bitflags;

bitflags! {
    /// Status flags carried in the last word of every sample record.
    ///
    /// Only bit 0 has a defined meaning. Higher bits are preserved on decode
    /// and ignored by the predicates.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SampleFlags: u32 {
        /// The device flagged this sample as outside the threshold band.
        const THRESHOLD_CROSSED = 0x0000_0001;
    }
}

impl SampleFlags {
    /// Interpret a raw flags word, keeping unknown bits.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self::from_bits_retain(raw)
    }

    /// True when the threshold bit is set, regardless of any other bits.
    #[must_use]
    pub const fn threshold_crossed(self) -> bool {
        self.contains(Self::THRESHOLD_CROSSED)
    }
}
