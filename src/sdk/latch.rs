/// One-shot flag: starts unset, can be set once, and is only cleared by an
/// explicit `reset` at a lifecycle boundary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Latch {
    set: bool,
}

impl Latch {
    #[must_use]
    pub const fn new() -> Self {
        Self { set: false }
    }

    /// Set the latch. Returns `true` only for the call that flipped it.
    pub const fn try_set(&mut self) -> bool {
        if self.set {
            return false;
        }
        self.set = true;
        true
    }

    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.set
    }

    pub const fn reset(&mut self) {
        self.set = false;
    }
}
