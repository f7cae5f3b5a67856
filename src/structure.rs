//! Nested containers of values.
//!
//! Layers accept a single structured argument: a leaf, or an arbitrarily
//! deep combination of sequences and string-keyed mappings whose leaves are
//! tensor-like values. [`Structure`] is that tagged union, and
//! [`map_structure()`] applies a function to every leaf while keeping the
//! container shape intact.
//!
//! Mappings are ordered by key, so two structures built from the same
//! entries always traverse their leaves in the same order.

use alloc::collections::BTreeMap;

use crate::error::{Error, Result};

/// A leaf, or a sequence or mapping of nested structures.
#[derive(Debug, Clone, PartialEq)]
pub enum Structure<T> {
    Leaf(T),
    Sequence(Vec<Structure<T>>),
    Mapping(BTreeMap<String, Structure<T>>),
}

impl<T> Structure<T> {
    /// Builds a sequence from anything that converts into structures.
    #[inline]
    pub fn sequence<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Self>,
    {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }

    /// Builds a mapping from `(key, value)` pairs.
    #[inline]
    pub fn mapping<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Self>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Mapping(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Applies `f` to every leaf, preserving the container shape.
    #[inline]
    pub fn map<U, F>(self, mut f: F) -> Structure<U>
    where
        F: FnMut(T) -> U,
    {
        self.map_inner(&mut f)
    }

    fn map_inner<U, F>(self, f: &mut F) -> Structure<U>
    where
        F: FnMut(T) -> U,
    {
        match self {
            Self::Leaf(value) => Structure::Leaf(f(value)),
            Self::Sequence(items) => Structure::Sequence(
                items.into_iter().map(|item| item.map_inner(f)).collect(),
            ),
            Self::Mapping(entries) => Structure::Mapping(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, value.map_inner(f)))
                    .collect(),
            ),
        }
    }

    /// Applies a fallible `f` to every leaf in traversal order, stopping at
    /// the first error.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`.
    #[inline]
    pub fn try_map<U, E, F>(
        self,
        mut f: F,
    ) -> core::result::Result<Structure<U>, E>
    where
        F: FnMut(T) -> core::result::Result<U, E>,
    {
        self.try_map_inner(&mut f)
    }

    fn try_map_inner<U, E, F>(
        self,
        f: &mut F,
    ) -> core::result::Result<Structure<U>, E>
    where
        F: FnMut(T) -> core::result::Result<U, E>,
    {
        Ok(match self {
            Self::Leaf(value) => Structure::Leaf(f(value)?),
            Self::Sequence(items) => Structure::Sequence(
                items
                    .into_iter()
                    .map(|item| item.try_map_inner(f))
                    .collect::<core::result::Result<Vec<_>, E>>()?,
            ),
            Self::Mapping(entries) => Structure::Mapping(
                entries
                    .into_iter()
                    .map(|(key, value)| Ok((key, value.try_map_inner(f)?)))
                    .collect::<core::result::Result<BTreeMap<_, _>, E>>()?,
            ),
        })
    }

    /// Like [`Structure::try_map()`] but borrows the leaves.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`.
    #[inline]
    pub fn try_map_ref<U, E, F>(
        &self,
        mut f: F,
    ) -> core::result::Result<Structure<U>, E>
    where
        F: FnMut(&T) -> core::result::Result<U, E>,
    {
        self.as_leaf_refs().try_map(|value| f(value))
    }

    /// Returns a structure of references to the leaves.
    #[inline]
    #[must_use]
    pub fn as_leaf_refs(&self) -> Structure<&T> {
        match self {
            Self::Leaf(value) => Structure::Leaf(value),
            Self::Sequence(items) => Structure::Sequence(
                items.iter().map(Self::as_leaf_refs).collect(),
            ),
            Self::Mapping(entries) => Structure::Mapping(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.as_leaf_refs()))
                    .collect(),
            ),
        }
    }

    /// Returns references to every leaf in traversal order.
    #[inline]
    #[must_use]
    pub fn leaves(&self) -> Vec<&T> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a T>) {
        match self {
            Self::Leaf(value) => leaves.push(value),
            Self::Sequence(items) => {
                for item in items {
                    item.collect_leaves(leaves);
                }
            }
            Self::Mapping(entries) => {
                for value in entries.values() {
                    value.collect_leaves(leaves);
                }
            }
        }
    }

    /// Consumes the structure and returns its leaves in traversal order.
    #[inline]
    #[must_use]
    pub fn flatten(self) -> Vec<T> {
        let mut leaves = Vec::new();
        self.flatten_into(&mut leaves);
        leaves
    }

    fn flatten_into(self, leaves: &mut Vec<T>) {
        match self {
            Self::Leaf(value) => leaves.push(value),
            Self::Sequence(items) => {
                for item in items {
                    item.flatten_into(leaves);
                }
            }
            Self::Mapping(entries) => {
                for value in entries.into_values() {
                    value.flatten_into(leaves);
                }
            }
        }
    }

    #[inline]
    pub fn any_leaf<F>(&self, predicate: F) -> bool
    where
        F: FnMut(&&T) -> bool,
    {
        self.leaves().iter().any(predicate)
    }

    /// Returns `true` if both structures have the same containers, keys and
    /// lengths, regardless of their leaves.
    #[inline]
    #[must_use]
    pub fn has_same_structure<U>(&self, other: &Structure<U>) -> bool {
        match (self, other) {
            (Self::Leaf(_), Structure::Leaf(_)) => true,
            (Self::Sequence(lhs), Structure::Sequence(rhs)) => {
                lhs.len() == rhs.len()
                    && lhs
                        .iter()
                        .zip(rhs)
                        .all(|(lhs, rhs)| lhs.has_same_structure(rhs))
            }
            (Self::Mapping(lhs), Structure::Mapping(rhs)) => {
                lhs.len() == rhs.len()
                    && lhs.iter().zip(rhs).all(
                        |((lhs_key, lhs), (rhs_key, rhs))| {
                            lhs_key == rhs_key && lhs.has_same_structure(rhs)
                        },
                    )
            }
            _ => false,
        }
    }

    /// Rebuilds `flat` into the shape of `self`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StructureMismatch`] if `flat` does not hold exactly
    /// one value per leaf.
    #[inline]
    pub fn pack_sequence_as<U>(&self, flat: Vec<U>) -> Result<Structure<U>> {
        let expected = self.leaves().len();
        if flat.len() != expected {
            return Err(Error::StructureMismatch(format!(
                "expected {expected} leaves, got {}",
                flat.len()
            )));
        }

        let mut flat = flat.into_iter();
        self.try_map_ref(|_| {
            flat.next().ok_or_else(|| {
                Error::StructureMismatch("ran out of leaves".to_owned())
            })
        })
    }

    /// Returns the value if the structure is a single leaf.
    #[inline]
    pub fn into_leaf(self) -> Option<T> {
        match self {
            Self::Leaf(value) => Some(value),
            Self::Sequence(_) | Self::Mapping(_) => None,
        }
    }
}

impl<T> From<T> for Structure<T> {
    #[inline]
    fn from(value: T) -> Self {
        Self::Leaf(value)
    }
}

/// Applies `f` to every leaf of `structure`, preserving its shape.
#[inline]
pub fn map_structure<T, U, F>(f: F, structure: Structure<T>) -> Structure<U>
where
    F: FnMut(T) -> U,
{
    structure.map(f)
}
