//! The seam between the runtime and whatever shows dialogue to the player.

use crate::model::DialogueElement;

/// Directional input, each axis in `-1.0..=1.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputAxis {
    /// Horizontal component.
    pub x: f32,
    /// Vertical component. Positive is up.
    pub y: f32,
}

impl InputAxis {
    /// Create an input vector.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Something that can present dialogue elements and collect option choices.
///
/// The runtime calls [`display`](Self::display) for each element it reaches and
/// [`clear`](Self::clear) when a conversation ends. Surfaces that reveal text
/// over time report that through [`is_displaying`](Self::is_displaying) so a
/// continue request can finish the reveal instead of advancing.
pub trait DisplaySurface {
    /// Show an element.
    fn display(&mut self, element: &DialogueElement);

    /// Remove whatever is shown.
    fn clear(&mut self);

    /// Finish an in-progress reveal immediately.
    fn skip(&mut self);

    /// Whether text is still being revealed.
    fn is_displaying(&self) -> bool;

    /// Forward navigation input, typically to move the option cursor.
    fn set_input(&mut self, input: InputAxis);

    /// Index of the highlighted option of the shown element.
    fn selected_option(&self) -> usize;
}
