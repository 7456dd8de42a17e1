/// Where a frame currently is.
///
/// `Idle -> Collecting -> Compiling -> Submitting -> Presented -> Idle`.
/// An unchanged frame goes from `Collecting` straight to `Submitting`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum FrameState {
    #[default]
    Idle,
    Collecting,
    Compiling,
    Submitting,
    Presented,
}

impl FrameState {
    /// True when `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: FrameState) -> bool {
        use FrameState::*;
        matches!(
            (self, next),
            (Idle, Collecting)
                | (Collecting, Compiling)
                | (Collecting, Submitting)
                | (Compiling, Submitting)
                | (Submitting, Presented)
                | (Presented, Idle)
                // a failed frame abandons wherever it was
                | (Collecting | Compiling | Submitting, Idle)
        )
    }
}
