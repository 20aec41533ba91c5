// The smallest non-zero table length.
pub const MIN_LEN: usize = 8;

// Returns the number of slots needed to hold `capacity` entries without
// exceeding the load factor `num / den`, or `None` on overflow.
pub fn slots_for(capacity: usize, (num, den): (usize, usize)) -> Option<usize> {
    if capacity == 0 {
        return Some(0);
    }

    let slots = capacity.checked_mul(den)? / num + 1;
    slots.checked_next_power_of_two().map(|len| len.max(MIN_LEN))
}

// A triangular probe sequence.
//
// Offsets from the home slot are the triangular numbers 0, 1, 3, 6, ...
// which visit every slot exactly once when the table length is a power
// of two.
pub struct Probe {
    // The current index in the probe sequence.
    pub i: usize,
    // The current length of the probe sequence.
    pub len: usize,
    // Mask for the length of the table.
    mask: usize,
}

impl Probe {
    // Initialize the probe sequence, returning the maximum probe limit.
    #[inline]
    pub fn start(hash: u64, len: usize) -> (Probe, usize) {
        debug_assert!(len.is_power_of_two());

        let probe = Probe {
            i: (hash as usize) & (len - 1),
            len: 0,
            mask: len - 1,
        };

        (probe, len)
    }

    // Increment the probe sequence.
    #[inline]
    pub fn next(&mut self) {
        self.len += 1;
        self.i = (self.i + self.len) & self.mask;
    }
}
