//! Roll Call: weighted random name picker for a desktop clock widget.
//!
//! Names are drawn from a weight-expanded, shuffled pool until it runs
//! out, revealed through a decelerating animation on a display slot that
//! the widget otherwise uses as a clock, and kept in a short history.

pub mod core;
pub mod schema;
