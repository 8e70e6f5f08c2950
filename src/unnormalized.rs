//! Type level marker for values whose digits still carry deferred carries.
//!
//! Additions and subtractions on limb blocks and finite field values only combine digits and
//! leave the carry propagation to a separate normalization step, which allows accumulating a
//! couple of terms before paying for it. Values in that state are wrapped in [`Unnormalized`],
//! which offers further accumulation but no comparison, bit inspection or export: the only way
//! back to the plain type is [`Unnormalized::normalize()`].

/// Types with a carry propagation step.
pub trait Normalize {
    fn normalize_in_place(&mut self);
}

#[must_use = "unnormalized values must be normalized before use"]
#[derive(Clone, Debug)]
pub struct Unnormalized<T: Normalize> {
    value: T,
}

impl<T: Normalize> Unnormalized<T> {
    pub(crate) fn new(value: T) -> Self {
        Self { value }
    }

    pub(crate) fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Propagate all deferred carries and return the plain value.
    pub fn normalize(mut self) -> T {
        self.value.normalize_in_place();
        self.value
    }
}
