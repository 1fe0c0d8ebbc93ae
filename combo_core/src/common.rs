//! Shared helpers for working with nested, possibly irregular sequences.

/// A value that is either a single leaf or a sequence of further nested values.
///
/// The nesting may be irregular: sibling sequences can have different depths.
///
/// ```
/// use combo_core::common::{flatten, Nested};
///
/// let nested = Nested::Seq(vec![
///     Nested::Leaf(1),
///     Nested::Seq(vec![Nested::Leaf(2), Nested::Seq(vec![Nested::Leaf(3)])]),
///     Nested::Seq(vec![]),
///     Nested::Leaf(4),
/// ]);
/// assert_eq!(flatten(&nested), vec![1, 2, 3, 4]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Nested<T> {
    Leaf(T),
    Seq(Vec<Nested<T>>),
}

impl<T> Nested<T> {
    /// Visit every leaf in order, depth first.
    pub fn for_each_leaf<'a, F: FnMut(&'a T)>(&'a self, f: &mut F) {
        match self {
            Nested::Leaf(value) => f(value),
            Nested::Seq(items) => {
                for item in items {
                    item.for_each_leaf(f);
                }
            }
        }
    }

    /// Number of leaves at any depth
    pub fn leaf_count(&self) -> usize {
        match self {
            Nested::Leaf(_) => 1,
            Nested::Seq(items) => items.iter().map(Nested::leaf_count).sum(),
        }
    }
}

impl<T> From<T> for Nested<T> {
    fn from(value: T) -> Self {
        Nested::Leaf(value)
    }
}

impl<T> FromIterator<Nested<T>> for Nested<T> {
    fn from_iter<I: IntoIterator<Item = Nested<T>>>(iter: I) -> Self {
        Nested::Seq(iter.into_iter().collect())
    }
}

/// Flatten a nested value into its leaves, preserving left-to-right order.
///
/// A bare leaf flattens to a one-element vector; an empty sequence to an empty one.
pub fn flatten<T: Clone>(nested: &Nested<T>) -> Vec<T> {
    let mut leaves = Vec::with_capacity(nested.leaf_count());
    nested.for_each_leaf(&mut |leaf: &T| leaves.push(leaf.clone()));
    leaves
}

/// Keep the first occurrence of every item, preserving order.
pub fn unique_in_order<T: PartialEq>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut unique: Vec<T> = Vec::new();
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}
