use crate::error::RenderSurfaceError;

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; everything must be drawn again.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM).
    Fatal,
}

impl SurfaceErrorAction {
    /// The error the render pipeline sees for this action.
    pub fn into_surface_error(self) -> RenderSurfaceError {
        match self {
            SurfaceErrorAction::Reconfigured => RenderSurfaceError::ContextLost,
            SurfaceErrorAction::SkipFrame => RenderSurfaceError::Timeout,
            SurfaceErrorAction::Fatal => RenderSurfaceError::OutOfMemory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconfigured_surfaces_count_as_context_loss() {
        assert!(SurfaceErrorAction::Reconfigured.into_surface_error().is_context_loss());
        assert!(!SurfaceErrorAction::SkipFrame.into_surface_error().is_context_loss());
    }
}
