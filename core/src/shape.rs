//! Array shapes and coordinate arithmetic.

use std::{fmt, ops::Deref};

use crate::error::Error;

/// Memory order of an array: the mapping from multi-dimensional coordinates
/// to a linear record index.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Order {
    /// The last dimension varies fastest (C order).
    #[default]
    RowMajor,
    /// The first dimension varies fastest (Fortran order).
    ColumnMajor,
}

impl Order {
    /// Whether this is Fortran order, as named in npy header text.
    pub fn is_fortran(self) -> bool {
        matches!(self, Order::ColumnMajor)
    }
}

/// Ordered list of dimension extents.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Shape(pub Vec<usize>);

impl Shape {
    /// The number of records addressed by this shape.
    ///
    /// An empty shape addresses no records.
    pub fn elements(&self) -> usize {
        if self.0.is_empty() {
            0
        } else {
            self.iter().product()
        }
    }

    /// The number of dimensions.
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// The linear record index of `coords` under `order`.
    ///
    /// Fails with a bounds error if fewer coordinates than dimensions are
    /// given. Coordinates beyond the rank contribute with a unit dimension
    /// product.
    pub fn linear_index(&self, coords: &[usize], order: Order) -> Result<usize, Error> {
        if coords.len() < self.rank() {
            return Err(Error::Bounds(format!(
                "got {} coordinates for {} dimensions",
                coords.len(),
                self.rank()
            )));
        }

        let mut index = 0;

        for (k, &ck) in coords.iter().enumerate() {
            index += match order {
                Order::RowMajor => index_row_major(self, k, ck)?,
                Order::ColumnMajor => index_col_major(self, k, ck)?,
            };
        }

        Ok(index)
    }
}

/// The row-major contribution of coordinate `ck` at depth `k`:
/// `ck × Π_{l>k} shape[l]`.
pub fn index_row_major(shape: &Shape, k: usize, ck: usize) -> Result<usize, Error> {
    if k > shape.rank() {
        return Err(Error::Bounds("size does not match".to_string()));
    }

    Ok(shape.iter().skip(k + 1).product::<usize>() * ck)
}

/// The column-major contribution of coordinate `ck` at depth `k`:
/// `ck × Π_{l<k} shape[l]`.
pub fn index_col_major(shape: &Shape, k: usize, ck: usize) -> Result<usize, Error> {
    if k > shape.rank() {
        return Err(Error::Bounds("size does not match".to_string()));
    }

    Ok(shape.iter().take(k).product::<usize>() * ck)
}

impl AsRef<[usize]> for Shape {
    fn as_ref(&self) -> &[usize] {
        self
    }
}

impl Deref for Shape {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<usize>> for Shape {
    fn from(shape: Vec<usize>) -> Self {
        Self(shape)
    }
}

impl From<&[usize]> for Shape {
    fn from(shape: &[usize]) -> Self {
        Self(shape.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(shape: [usize; N]) -> Self {
        Self(shape.to_vec())
    }
}

impl fmt::Display for Shape {
    /// Renders the header tuple form, e.g. `(3,4,)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;

        for extent in self.iter() {
            write!(f, "{extent},")?;
        }

        write!(f, ")")
    }
}
