use std::cmp::Ordering;


/// An ordering relation on values of type `T`, supplied by the caller.
///
/// The containers only ever consult strict less-than (`cmp(..).is_lt()`); where equality is
/// needed it is derived from two less-than tests. Implementations must therefore provide a
/// total order, but need not agree with any `Ord` impl `T` happens to have.
pub trait Comparator<T: ?Sized> {
    #[must_use]
    fn cmp(&self, lhs: &T, rhs: &T) -> Ordering;

    /// Whether `lhs` sorts strictly before `rhs`.
    #[inline]
    #[must_use]
    fn less(&self, lhs: &T, rhs: &T) -> bool {
        self.cmp(lhs, rhs).is_lt()
    }
}

/// A [`Comparator`] which uses the [`Ord`] implementation of `T`.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrdComparator;

impl<T: Ord + ?Sized> Comparator<T> for OrdComparator {
    /// Equivalent to `Ord::cmp(lhs, rhs)`.
    #[inline]
    fn cmp(&self, lhs: &T, rhs: &T) -> Ordering {
        Ord::cmp(lhs, rhs)
    }
}
