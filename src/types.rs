//! Core sequencer types: ComplexTensor, Param.

use num_complex::Complex64;
use std::fmt;

use crate::errors::{Result, SequencerError};

pub const ZERO: Complex64 = Complex64::new(0.0, 0.0);

// ---------------------------------------------------------------------------
// ComplexTensor: row-major complex matrix with an immutable shape
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct ComplexTensor {
    data: Vec<Complex64>,
    rows: usize,
    cols: usize,
}

impl ComplexTensor {
    pub fn new(data: Vec<Complex64>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(SequencerError::DimensionMismatch {
                expected: rows * cols,
                got: data.len(),
            });
        }
        Ok(Self { data, rows, cols })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { data: vec![ZERO; rows * cols], rows, cols }
    }

    /// Single column (`len × 1`), the shape of one encoding vector.
    pub fn column(data: Vec<Complex64>) -> Self {
        let rows = data.len();
        Self { data, rows, cols: 1 }
    }

    /// Concatenate equal-length columns into a `rows × columns.len()` matrix.
    pub fn from_columns(columns: &[Vec<Complex64>]) -> Result<Self> {
        let rows = columns.first().map(|c| c.len()).unwrap_or(0);
        let cols = columns.len();
        let mut data = vec![ZERO; rows * cols];
        for (c, column) in columns.iter().enumerate() {
            if column.len() != rows {
                return Err(SequencerError::DimensionMismatch {
                    expected: rows,
                    got: column.len(),
                });
            }
            for (r, &value) in column.iter().enumerate() {
                data[r * cols + c] = value;
            }
        }
        Ok(Self { data, rows, cols })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.data[row * self.cols + col]
    }

    pub fn as_slice(&self) -> &[Complex64] {
        &self.data
    }

    /// Mutable view of the values. The length cannot change through a slice,
    /// so the shape stays consistent.
    pub fn as_mut_slice(&mut self) -> &mut [Complex64] {
        &mut self.data
    }

    pub fn column_values(&self, col: usize) -> Vec<Complex64> {
        (0..self.rows).map(|r| self.get(r, col)).collect()
    }

    /// Single value of a `1×1` tensor.
    pub fn scalar(&self) -> Option<Complex64> {
        if self.shape() == (1, 1) {
            Some(self.data[0])
        } else {
            None
        }
    }

    pub fn norm(&self) -> f64 {
        self.data.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt()
    }
}

impl fmt::Display for ComplexTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComplexTensor({}x{}, norm={:.4})", self.rows, self.cols, self.norm())
    }
}

// ---------------------------------------------------------------------------
// Param: learnable tensor with its gradient accumulator
// ---------------------------------------------------------------------------

/// A learnable tensor. `grad` always has the same length as `value`.
#[derive(Clone, Debug)]
pub struct Param {
    pub name: &'static str,
    value: ComplexTensor,
    grad: Vec<Complex64>,
}

impl Param {
    pub fn new(name: &'static str, value: ComplexTensor) -> Self {
        let grad = vec![ZERO; value.len()];
        Self { name, value, grad }
    }

    pub fn value(&self) -> &ComplexTensor {
        &self.value
    }

    pub fn values_mut(&mut self) -> &mut [Complex64] {
        self.value.as_mut_slice()
    }

    pub fn grad(&self) -> &[Complex64] {
        &self.grad
    }

    pub fn zero_grad(&mut self) {
        self.grad.iter_mut().for_each(|g| *g = ZERO);
    }

    /// Add `incoming` into the accumulator (sum, never overwrite).
    pub fn accumulate_grad(&mut self, incoming: &[Complex64]) -> Result<()> {
        if incoming.len() != self.grad.len() {
            return Err(SequencerError::DimensionMismatch {
                expected: self.grad.len(),
                got: incoming.len(),
            });
        }
        for (g, &d) in self.grad.iter_mut().zip(incoming) {
            *g += d;
        }
        Ok(())
    }

    /// `value -= scale * grad`, elementwise.
    pub fn descend(&mut self, scale: f64) {
        let step = Complex64::new(scale, 0.0);
        for (x, &d) in self.value.as_mut_slice().iter_mut().zip(self.grad.iter()) {
            *x -= step * d;
        }
    }

    pub fn grad_norm_sqr(&self) -> f64 {
        self.grad.iter().map(|d| d.norm_sqr()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_bad_length() {
        assert!(ComplexTensor::new(vec![ZERO; 5], 2, 3).is_err());
        let t = ComplexTensor::new(vec![ZERO; 6], 2, 3).unwrap();
        assert_eq!(t.shape(), (2, 3));
    }

    #[test]
    fn test_from_columns_layout() {
        let a = vec![Complex64::new(1.0, 0.0), Complex64::new(2.0, 0.0)];
        let b = vec![Complex64::new(3.0, 0.0), Complex64::new(4.0, 0.0)];
        let t = ComplexTensor::from_columns(&[a, b]).unwrap();
        assert_eq!(t.shape(), (2, 2));
        assert_eq!(t.get(0, 1).re, 3.0);
        assert_eq!(t.get(1, 0).re, 2.0);
        assert_eq!(t.column_values(1)[1].re, 4.0);
    }

    #[test]
    fn test_param_grad_tracks_value_length() {
        let mut p = Param::new("w", ComplexTensor::zeros(3, 2));
        assert_eq!(p.grad().len(), 6);
        p.accumulate_grad(&[Complex64::new(1.0, 1.0); 6]).unwrap();
        p.accumulate_grad(&[Complex64::new(1.0, 0.0); 6]).unwrap();
        assert_eq!(p.grad()[0], Complex64::new(2.0, 1.0));
        assert!(p.accumulate_grad(&[ZERO; 2]).is_err());
        p.descend(0.5);
        assert_eq!(p.value().get(0, 0), Complex64::new(-1.0, -0.5));
        p.zero_grad();
        assert!(p.grad().iter().all(|g| *g == ZERO));
    }
}
