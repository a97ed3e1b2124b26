//! Round-robin display-slot allocation.

/// Assigns newly created boards to bounded display slots.
///
/// Holds a single monotonically increasing counter for the lifetime of a
/// client session and returns `counter % capacity` per allocation, so the
/// oldest-occupied slot is always the next to be overwritten and memory
/// stays bounded by `capacity`.
///
/// Constructed once per session and passed to the reducer; the counter is
/// owned state, not process-wide state.
#[derive(Debug, Default)]
pub struct SlotAllocator {
    counter: u64,
}

impl SlotAllocator {
    /// Creates an allocator with its counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next slot index and advances the counter.
    ///
    /// If `capacity` changes between calls the modulus changes immediately;
    /// slots already handed out are not renumbered, which may transiently
    /// leave occupants above a shrunken capacity. A zero capacity pins
    /// everything to slot 0 rather than dividing by zero.
    pub fn next_slot(&mut self, capacity: usize) -> usize {
        let slot = match capacity {
            0 => 0,
            _ => (self.counter % capacity as u64) as usize,
        };
        self.counter += 1;
        slot
    }

    /// Total allocations performed so far.
    pub fn allocations(&self) -> u64 {
        self.counter
    }
}
