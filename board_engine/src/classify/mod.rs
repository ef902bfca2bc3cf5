//! Pure classifiers turning quote fields into display classes.
//!
//! - `price_color`: where a price sits relative to reference/ceiling/floor.
//! - `animation`: whether a field moved enough since the last batch to flash.
pub mod animation;
pub mod price_color;

pub use animation::{AnimationTag, ChangeKind, classify_change};
pub use price_color::{PriceColor, classify_price_color};
