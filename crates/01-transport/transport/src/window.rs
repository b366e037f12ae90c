//! Engine-assigned window handles relayed verbatim to the UI.

use std::fmt;

/// Opaque window identifier assigned by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub i32);

/// Engine-defined window kind (message, map, menu, text, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WindowType(pub i32);

/// Text attribute bitmask attached to emitted strings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextAttr(pub i32);

impl TextAttr {
    pub const NONE: TextAttr = TextAttr(0);

    pub fn bits(self) -> i32 {
        self.0
    }

    pub fn contains(self, other: TextAttr) -> bool {
        self.0 & other.0 == other.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "win#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_contains_checks_every_bit() {
        let bold_inverse = TextAttr(0b101);
        assert!(bold_inverse.contains(TextAttr(0b001)));
        assert!(bold_inverse.contains(TextAttr(0b100)));
        assert!(!bold_inverse.contains(TextAttr(0b010)));
        assert!(bold_inverse.contains(TextAttr::NONE));
    }
}
