//! Change animation classification.
//!
//! A field flashes when it moved by more than a relative threshold since the
//! previous batch: 0.1% for prices, 1% for volumes. The relative delta divides
//! by `max(|previous|, 1)`, and a zero baseline is handled up front so a value
//! appearing from zero is still reported with the right direction.
use board_common::number;
use strum_macros::Display;

const PRICE_THRESHOLD: f64 = 0.001;
const VOLUME_THRESHOLD: f64 = 0.01;

/// Which threshold applies to a field.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ChangeKind {
    Price,
    Volume,
}

/// A flash to play on a field.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationTag {
    Up(ChangeKind),
    Down(ChangeKind),
}

impl AnimationTag {
    /// CSS class of the animation.
    pub fn css_class(self) -> &'static str {
        match self {
            AnimationTag::Up(ChangeKind::Price) => "price-up",
            AnimationTag::Down(ChangeKind::Price) => "price-down",
            AnimationTag::Up(ChangeKind::Volume) => "volume-up",
            AnimationTag::Down(ChangeKind::Volume) => "volume-down",
        }
    }
}

/// Decide whether `current` moved enough from `previous` to animate.
pub fn classify_change(current: &str, previous: &str, kind: ChangeKind) -> Option<AnimationTag> {
    if current.trim().is_empty() || previous.trim().is_empty() {
        return None;
    }
    let current = number::parse(current)?;
    let previous = number::parse(previous)?;

    let up = AnimationTag::Up(kind);
    let down = AnimationTag::Down(kind);

    if previous == 0.0 {
        match kind {
            ChangeKind::Price if current != 0.0 => {
                return Some(if current > 0.0 { up } else { down });
            }
            ChangeKind::Volume if current > 0.0 => return Some(up),
            _ => {}
        }
    }

    let threshold = match kind {
        ChangeKind::Price => PRICE_THRESHOLD,
        ChangeKind::Volume => VOLUME_THRESHOLD,
    };
    let delta = (current - previous).abs() / previous.abs().max(1.0);
    if delta > threshold {
        Some(if current > previous { up } else { down })
    } else {
        None
    }
}
