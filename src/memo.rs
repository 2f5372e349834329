/// Request-scoped cache that keeps "not resolved yet" apart from "resolved to
/// nothing".
///
/// A lookup that found no record is a result worth caching too: asking again
/// within the same request must not hit the store a second time.
#[derive(Debug)]
pub enum Memo<T> {
    Uncomputed,
    Computed(Option<T>),
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::Uncomputed
    }
}

impl<T> Memo<T> {
    #[must_use]
    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed(_))
    }

    /// Store the resolved value, replacing anything cached before
    pub fn set(&mut self, value: Option<T>) {
        *self = Self::Computed(value);
    }

    /// The cached value, `None` when uncomputed or resolved to nothing
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Computed(Some(value)) => Some(value),
            _ => None,
        }
    }

    pub fn value_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Computed(Some(value)) => Some(value),
            _ => None,
        }
    }
}
