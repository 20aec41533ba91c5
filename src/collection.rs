/// The read-side capability shared by every container in this crate.
///
/// Containers and the decorators that wrap them implement this trait, so a
/// decorator composes with any payload by delegation. For bags, `len` counts
/// every occurrence and `iter` yields each occurrence separately.
pub trait Collection {
    /// The element type.
    type Item;

    /// An iterator over the elements, in unspecified order.
    type Iter<'a>: Iterator<Item = &'a Self::Item>
    where
        Self: 'a;

    /// Returns the number of elements.
    fn len(&self) -> usize;

    /// Returns `true` if the collection holds no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the collection holds at least one `item`.
    fn contains(&self, item: &Self::Item) -> bool;

    /// Returns an iterator over the elements.
    ///
    /// The iterator borrows the collection, so it cannot outlive or observe a
    /// mutation of it. Calling `iter` again restarts from the beginning.
    fn iter(&self) -> Self::Iter<'_>;
}

/// The write-side capability shared by every mutable container in this crate.
pub trait CollectionMut: Collection {
    /// Adds `item`, returning `true` if it was not present before.
    fn add(&mut self, item: Self::Item) -> bool;

    /// Removes one occurrence of `item`, returning `true` if one was present.
    fn remove(&mut self, item: &Self::Item) -> bool;

    /// Removes every element.
    fn clear(&mut self);
}
