//! Two-slot ping-pong buffer.

/// A pair of slots whose roles alternate every iteration.
///
/// At iteration `i` slot `i % 2` is the reference and the other slot is the
/// render target. [`PingPong::advance`] swaps the roles.
#[derive(Debug, Clone)]
pub struct PingPong<T> {
    slots: [T; 2],
    iteration: usize,
}

impl<T> PingPong<T> {
    /// Creates the pair; `first` starts as the reference.
    pub fn new(first: T, second: T) -> Self {
        Self {
            slots: [first, second],
            iteration: 0,
        }
    }

    /// Number of completed swaps.
    #[must_use]
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Slot read during the current iteration.
    #[must_use]
    pub fn reference(&self) -> &T {
        &self.slots[self.iteration % 2]
    }

    /// Slot written during the current iteration.
    #[must_use]
    pub fn render_target(&self) -> &T {
        &self.slots[(self.iteration + 1) % 2]
    }

    /// Mutable access to the reference slot.
    pub fn reference_mut(&mut self) -> &mut T {
        &mut self.slots[self.iteration % 2]
    }

    /// Mutable access to the render target slot.
    pub fn render_target_mut(&mut self) -> &mut T {
        &mut self.slots[(self.iteration + 1) % 2]
    }

    /// Swaps roles: the render target becomes the next reference.
    pub fn advance(&mut self) {
        self.iteration += 1;
    }

    /// Returns to iteration 0 without touching the slot contents.
    pub fn rewind(&mut self) {
        self.iteration = 0;
    }
}
