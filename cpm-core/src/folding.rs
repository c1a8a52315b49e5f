//! Dobra de linhas (row folding)
//!
//! Antes da exponenciação, variáveis que não leem nem são lidas por outras
//! variáveis saem da matriz: ou são sobrescritas por uma constante a cada
//! iteração (coeficiente diagonal 0) ou ficam inalteradas (diagonal 1,
//! termo constante 0). A matriz reduzida é elevada à potência e depois
//! reexpandida; uma matriz `fix` reaplica as atribuições constantes.
//!
//! O resultado é idêntico ao da potência da matriz completa.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use tracing::trace;

use crate::error::{MatrixError, MatrixResult};
use crate::matrix::Matrix;

/// Matriz de transição reduzida e o necessário para reconstruí-la
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFolding {
    lite: Matrix,
    kept: Vec<usize>,
    fix: Matrix,
}

impl RowFolding {
    /// Analisa uma matriz de transição quadrada (última linha/coluna = constante)
    pub fn analyze(mat: &Matrix) -> MatrixResult<Self> {
        if !mat.is_square() {
            return Err(MatrixError::NotSquare(mat.size_repr()));
        }
        let size = mat.rows();
        let mut fix = Matrix::identity(size);
        let mut kept = Vec::with_capacity(size);
        if size == 0 {
            return Ok(Self {
                lite: mat.clone(),
                kept,
                fix,
            });
        }

        let unit = size - 1;
        let mut need_unit_row = false;
        for index in 0..unit {
            let isolated = (0..size).all(|j| j == index || mat[(index, j)].is_zero())
                && (0..unit).all(|i| i == index || mat[(i, index)].is_zero());

            let prev_coeff = &mat[(index, index)];
            let const_coeff = &mat[(unit, index)];
            let skip = if !isolated {
                false
            } else if prev_coeff.is_zero() {
                // Sobrescrita por constante a cada iteração
                fix[(index, index)] = Zero::zero();
                fix[(unit, index)] = const_coeff.clone();
                true
            } else {
                prev_coeff.is_one() && const_coeff.is_zero()
            };

            if !skip {
                kept.push(index);
                if !const_coeff.is_zero() {
                    need_unit_row = true;
                }
            }
        }
        if need_unit_row {
            kept.push(unit);
        }

        let mut lite = Matrix::zeros(kept.len(), kept.len());
        for (y, &row) in kept.iter().enumerate() {
            for (x, &col) in kept.iter().enumerate() {
                lite[(y, x)] = mat[(row, col)].clone();
            }
        }
        trace!(
            full = size,
            lite = kept.len(),
            "row folding reduced transition matrix"
        );
        Ok(Self { lite, kept, fix })
    }

    /// Matriz reduzida
    pub fn lite(&self) -> &Matrix {
        &self.lite
    }

    /// Índices originais mantidos na matriz reduzida
    pub fn kept(&self) -> &[usize] {
        &self.kept
    }

    /// Reexpande uma potência da matriz reduzida para o tamanho completo
    pub fn restore(&self, lite_power: &Matrix) -> MatrixResult<Matrix> {
        let mut mat = Matrix::identity(self.fix.rows());
        for (y, &row) in self.kept.iter().enumerate() {
            for (x, &col) in self.kept.iter().enumerate() {
                mat[(row, col)] = lite_power[(y, x)].clone();
            }
        }
        mat.multiply(&self.fix)
    }

    /// `mat^n` usando a matriz reduzida
    pub fn power(mat: &Matrix, n: &BigUint) -> MatrixResult<Matrix> {
        // fix only holds after at least one iteration
        if n.is_zero() {
            if !mat.is_square() {
                return Err(MatrixError::NotSquare(mat.size_repr()));
            }
            return Ok(Matrix::identity(mat.rows()));
        }
        let folding = Self::analyze(mat)?;
        let lite_power = folding.lite.power(n)?;
        folding.restore(&lite_power)
    }
}
