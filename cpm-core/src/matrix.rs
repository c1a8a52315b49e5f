//! Matriz densa de inteiros de precisão arbitrária
//!
//! Operações são puras: `multiply` e `power` sempre alocam um resultado
//! novo e nunca alteram as entradas.

use std::fmt;
use std::ops::{Index, IndexMut};

use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::error::{MatrixError, MatrixResult};

/// Matriz `rows × cols` armazenada em ordem de linhas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<BigInt>,
}

impl Matrix {
    /// Matriz de zeros
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![BigInt::zero(); rows * cols],
        }
    }

    /// Matriz identidade `side × side`
    pub fn identity(side: usize) -> Self {
        let mut mat = Self::zeros(side, side);
        for i in 0..side {
            mat[(i, i)] = BigInt::one();
        }
        mat
    }

    /// Constrói a partir de linhas; todas devem ter o mesmo comprimento
    pub fn from_rows(rows: Vec<Vec<BigInt>>) -> MatrixResult<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let height = rows.len();
        let mut data = Vec::with_capacity(height * cols);
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(MatrixError::Ragged {
                    row: index,
                    expected: cols,
                    found: row.len(),
                });
            }
            data.extend(row);
        }
        Ok(Self {
            rows: height,
            cols,
            data,
        })
    }

    /// Vetor linha `1 × n`
    pub fn row_vector(values: &[BigInt]) -> Self {
        Self {
            rows: 1,
            cols: values.len(),
            data: values.to_vec(),
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn is_identity(&self) -> bool {
        self.is_square() && *self == Self::identity(self.rows)
    }

    /// Linha `index`
    pub fn row(&self, index: usize) -> &[BigInt] {
        &self.data[index * self.cols..(index + 1) * self.cols]
    }

    /// Coluna `index` (copiada)
    pub fn column(&self, index: usize) -> Vec<BigInt> {
        (0..self.rows).map(|r| self[(r, index)].clone()).collect()
    }

    pub fn into_rows(self) -> Vec<Vec<BigInt>> {
        if self.cols == 0 {
            return vec![Vec::new(); self.rows];
        }
        self.data.chunks(self.cols).map(<[BigInt]>::to_vec).collect()
    }

    pub fn size_repr(&self) -> String {
        format!("{}x{}", self.rows, self.cols)
    }

    /// Produto `self × other`
    pub fn multiply(&self, other: &Matrix) -> MatrixResult<Matrix> {
        if self.cols != other.rows {
            return Err(MatrixError::DimensionMismatch {
                left: self.size_repr(),
                right: other.size_repr(),
            });
        }
        Ok(self.mul_unchecked(other))
    }

    // Transition matrices are mostly zeros, so zero entries are skipped.
    fn mul_unchecked(&self, other: &Matrix) -> Matrix {
        let mut out = Matrix::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = &self[(i, k)];
                if a.is_zero() {
                    continue;
                }
                for j in 0..other.cols {
                    let b = &other[(k, j)];
                    if b.is_zero() {
                        continue;
                    }
                    out[(i, j)] += a * b;
                }
            }
        }
        out
    }

    /// Potência `self^n` por quadrados sucessivos: O(log n) multiplicações
    pub fn power(&self, n: &BigUint) -> MatrixResult<Matrix> {
        if !self.is_square() {
            return Err(MatrixError::NotSquare(self.size_repr()));
        }

        let mut result = Matrix::identity(self.rows);
        let bits = n.bits();
        let mut base = self.clone();
        for bit in 0..bits {
            if n.bit(bit) {
                result = result.mul_unchecked(&base);
            }
            if bit + 1 < bits {
                base = base.mul_unchecked(&base);
            }
        }
        Ok(result)
    }

    /// Atalho para expoentes pequenos
    pub fn pow_u64(&self, n: u64) -> MatrixResult<Matrix> {
        self.power(&BigUint::from(n))
    }

    pub fn transpose(&self) -> Matrix {
        let mut out = Matrix::zeros(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out[(c, r)] = self[(r, c)].clone();
            }
        }
        out
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = BigInt;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &BigInt {
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut BigInt {
        &mut self.data[row * self.cols + col]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reprs: Vec<String> = self.data.iter().map(ToString::to_string).collect();
        let width = reprs.iter().map(String::len).max().unwrap_or(0);
        for r in 0..self.rows {
            if r > 0 {
                writeln!(f)?;
            }
            let line: Vec<String> = reprs[r * self.cols..(r + 1) * self.cols]
                .iter()
                .map(|elem| format!("{:>width$}", elem, width = width))
                .collect();
            f.write_str(&line.join(" "))?;
        }
        Ok(())
    }
}
