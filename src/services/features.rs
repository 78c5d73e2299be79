//! Pair features for the classifier.
//!
//! The classifier was trained on the element-wise (Hadamard) product of the
//! user and artist embeddings, component `i` being `user[i] * artist[i]`.
//! Rows fed to it at serving time must use exactly this combination, length
//! and ordering; anything else silently invalidates the model.

use crate::error::{AppError, AppResult};

/// Feature vector for one (user, artist) pair
pub fn build(user: &[f32], artist: &[f32]) -> AppResult<Vec<f32>> {
    Ok(hadamard(user, artist)?.collect())
}

/// The single pairing function the model was trained on
fn hadamard<'a>(
    user: &'a [f32],
    artist: &'a [f32],
) -> AppResult<impl Iterator<Item = f32> + 'a> {
    check_dimensions(user.len(), artist.len())?;
    Ok(user.iter().zip(artist).map(|(u, a)| u * a))
}

fn check_dimensions(expected: usize, actual: usize) -> AppResult<()> {
    if expected != actual {
        return Err(AppError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

/// Row-major batch of feature rows sharing one width
///
/// Row `i` corresponds to the `i`-th pushed candidate; callers keep the
/// parallel list of candidate ids.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    width: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    pub fn with_capacity(width: usize, rows: usize) -> Self {
        Self {
            width,
            data: Vec::with_capacity(width * rows),
        }
    }

    /// Appends the Hadamard product of `user` and `artist` as a new row
    pub fn push_pair(&mut self, user: &[f32], artist: &[f32]) -> AppResult<()> {
        check_dimensions(self.width, user.len())?;
        self.data.extend(hadamard(user, artist)?);
        Ok(())
    }

    /// Appends an already built row
    #[cfg(test)]
    pub(crate) fn push_row(&mut self, row: &[f32]) -> AppResult<()> {
        check_dimensions(self.width, row.len())?;
        self.data.extend_from_slice(row);
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.data.len() / self.width
        }
    }

    #[cfg(test)]
    pub(crate) fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.width..(index + 1) * self.width]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.data.chunks_exact(self.width.max(1))
    }
}
