//! Pointer-click simulation backed by the `enigo` crate.
//!
//! [`ClickAction`] is the narrow interface the dispatcher needs; the
//! production implementation [`MouseClicker`] presses the left mouse
//! button in whatever window currently has focus.

use enigo::{Button, Direction, Enigo, Mouse, Settings};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ActionError
// ---------------------------------------------------------------------------

/// Errors raised while performing the click action.
///
/// Contained entirely within the dispatcher — an `ActionError` is logged
/// and reported but never reaches the capture loop.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The enigo backend could not be initialised.
    #[error("cannot initialise input simulation: {0}")]
    Init(String),

    /// The click event could not be delivered.
    #[error("cannot simulate mouse click: {0}")]
    Simulation(String),
}

// ---------------------------------------------------------------------------
// ClickAction
// ---------------------------------------------------------------------------

/// The action fired for each qualifying onset.
pub trait ClickAction: Send + Sync {
    /// Perform one click.  May block; the dispatcher runs it off the
    /// audio callback thread.
    fn click(&self) -> Result<(), ActionError>;
}

// ---------------------------------------------------------------------------
// MouseClicker
// ---------------------------------------------------------------------------

/// Left mouse click in the currently focused window.
///
/// A new [`Enigo`] instance is created for each call because `Enigo` is
/// not `Send` and the handle is cheap to construct.
#[derive(Debug, Clone, Default)]
pub struct MouseClicker;

impl MouseClicker {
    pub fn new() -> Self {
        Self
    }
}

impl ClickAction for MouseClicker {
    fn click(&self) -> Result<(), ActionError> {
        let mut enigo =
            Enigo::new(&Settings::default()).map_err(|e| ActionError::Init(e.to_string()))?;

        enigo
            .button(Button::Left, Direction::Click)
            .map_err(|e| ActionError::Simulation(e.to_string()))?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// `ClickAction` implementors cross into spawned tasks.
    #[test]
    fn mouse_clicker_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MouseClicker>();
    }

    #[test]
    fn action_error_messages() {
        let err = ActionError::Simulation("no display".into());
        assert!(err.to_string().contains("no display"));
    }
}
