//! The three-valued state shared by selection and collapse tracking.
//!
//! A [`Tristate`] is the answer to a question asked of *many* things at once:
//! "are these rows selected?", "is this subtree collapsed?". `Yes` and `No`
//! are definite; `Mixed` means the underlying set disagrees with itself.
//! `Mixed` is always derived from an aggregate query, never stored as the
//! state of a single key.

use serde::{Deserialize, Serialize};

/// A yes / no / mixed state.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tristate {
    /// Every member of the queried set is on.
    Yes,
    /// No member of the queried set is on.
    No,
    /// Some members are on and some are off.
    Mixed,
}

impl Tristate {
    /// Build a definite state from a boolean.
    #[inline]
    #[must_use]
    pub const fn from_bool(on: bool) -> Self {
        if on { Self::Yes } else { Self::No }
    }

    /// True if this is [`Tristate::Yes`].
    #[inline]
    #[must_use]
    pub const fn is_yes(self) -> bool {
        matches!(self, Self::Yes)
    }

    /// True if this is [`Tristate::No`].
    #[inline]
    #[must_use]
    pub const fn is_no(self) -> bool {
        matches!(self, Self::No)
    }

    /// True if this is [`Tristate::Mixed`].
    #[inline]
    #[must_use]
    pub const fn is_mixed(self) -> bool {
        matches!(self, Self::Mixed)
    }

    /// Flip `Yes` to `No` and anything else to `Yes`.
    ///
    /// `Mixed` toggles to `Yes`: toggling a half-selected set selects the
    /// whole set, which is the checkbox behaviour every toolkit converged on.
    #[inline]
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Yes => Self::No,
            Self::No | Self::Mixed => Self::Yes,
        }
    }

    /// Merge two aggregate answers: equal states stay, differing states mix.
    #[inline]
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        if self == other { self } else { Self::Mixed }
    }

    /// Aggregate an iterator of booleans into a single state.
    ///
    /// An empty iterator yields [`Tristate::No`].
    ///
    /// # Example
    /// ```
    /// use slotline::Tristate;
    ///
    /// assert_eq!(Tristate::of_all([true, true]), Tristate::Yes);
    /// assert_eq!(Tristate::of_all([false, false]), Tristate::No);
    /// assert_eq!(Tristate::of_all([true, false]), Tristate::Mixed);
    /// assert_eq!(Tristate::of_all(Vec::<bool>::new()), Tristate::No);
    /// ```
    #[must_use]
    pub fn of_all<I: IntoIterator<Item = bool>>(flags: I) -> Self {
        let mut seen_on = false;
        let mut seen_off = false;
        for on in flags {
            if on {
                seen_on = true;
            } else {
                seen_off = true;
            }
            if seen_on && seen_off {
                return Self::Mixed;
            }
        }
        match (seen_on, seen_off) {
            (true, false) => Self::Yes,
            _ => Self::No,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_cycles_definite_states() {
        assert_eq!(Tristate::Yes.toggled(), Tristate::No);
        assert_eq!(Tristate::No.toggled(), Tristate::Yes);
        assert_eq!(Tristate::Mixed.toggled(), Tristate::Yes);
    }

    #[test]
    fn merge_mixes_disagreement() {
        assert_eq!(Tristate::Yes.merge(Tristate::Yes), Tristate::Yes);
        assert_eq!(Tristate::Yes.merge(Tristate::No), Tristate::Mixed);
        assert_eq!(Tristate::Mixed.merge(Tristate::Mixed), Tristate::Mixed);
    }

    #[test]
    fn serde_uses_lowercase() {
        assert_eq!(serde_json::to_string(&Tristate::Mixed).unwrap(), "\"mixed\"");
    }
}
