//! Engine de matrix code
//!
//! Interpreta um programa [`Resolved`] em uma matriz de transição: começa
//! pela identidade e multiplica, em ordem, a matriz de passo de cada
//! instrução. Um bloco `LOOP n … END` vira a matriz de uma iteração
//! elevada a `n` (com dobra de linhas opcional).
//!
//! Convenção: o estado é um vetor linha `[vars…, 1]` e uma atualização é
//! `estado × M`; portanto `M[src][dest]` é o peso de `src` no novo `dest`.

use num_bigint::{BigInt, Sign};
use num_traits::{One, Zero};
use tracing::{debug, trace};

use crate::error::{EngineError, EngineResult};
use crate::folding::RowFolding;
use crate::matcode::{Instr, Resolved};
use crate::matrix::Matrix;

/// Interpretador de matrix code
#[derive(Debug, Clone, Copy)]
pub struct Engine {
    fold_constant_rows: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Engine {
    pub fn new(fold_constant_rows: bool) -> Self {
        Self { fold_constant_rows }
    }

    pub fn fold_constant_rows(&self) -> bool {
        self.fold_constant_rows
    }

    /// Matriz de transição do programa inteiro para `vars` variáveis
    pub fn transition(&self, code: &[Instr<Resolved>], vars: usize) -> EngineResult<Matrix> {
        let mut pos = 0;
        let mat = self.run_block(code, &mut pos, vars + 1, None)?;
        debug_assert_eq!(pos, code.len());
        Ok(mat)
    }

    /// Aplica o programa ao vetor de estado e devolve o novo estado
    pub fn run(&self, code: &[Instr<Resolved>], state: &[BigInt]) -> EngineResult<Vec<BigInt>> {
        let mat = self.transition(code, state.len())?;

        let mut vector = state.to_vec();
        vector.push(BigInt::one());
        let result = Matrix::row_vector(&vector).multiply(&mat)?;

        let mut values = result.into_rows().into_iter().next().unwrap_or_default();
        values.pop();
        debug!(slots = state.len(), instructions = code.len(), "matrix code executed");
        Ok(values)
    }

    /// Executa instruções a partir de `pos` até o END do bloco (`opened_at`
    /// é a posição do LOOP que abriu o bloco) ou até o fim do programa
    fn run_block(
        &self,
        code: &[Instr<Resolved>],
        pos: &mut usize,
        size: usize,
        opened_at: Option<usize>,
    ) -> EngineResult<Matrix> {
        let mut mat = Matrix::identity(size);
        while *pos < code.len() {
            let index = *pos;
            let instr = &code[index];
            let cur = match instr {
                Instr::End => {
                    return match opened_at {
                        Some(_) => Ok(mat),
                        None => Err(EngineError::UnexpectedEnd(index)),
                    };
                }
                Instr::Loop(count) => {
                    let count = loop_count(instr, count)?;
                    *pos += 1;
                    let body = self.run_block(code, pos, size, Some(index))?;
                    self.loop_power(&body, &count)?
                }
                _ => step_matrix(instr, size)?,
            };
            mat = mat.multiply(&cur)?;
            *pos += 1;
        }
        match opened_at {
            Some(start) => Err(EngineError::UnterminatedLoop(start)),
            None => Ok(mat),
        }
    }

    fn loop_power(&self, body: &Matrix, count: &num_bigint::BigUint) -> EngineResult<Matrix> {
        trace!(size = body.rows(), count = %count, "exponentiating loop block");
        if self.fold_constant_rows {
            Ok(RowFolding::power(body, count)?)
        } else {
            Ok(body.power(count)?)
        }
    }
}

fn invalid(instr: &Instr<Resolved>) -> EngineError {
    EngineError::InvalidInstruction(instr.to_string())
}

fn loop_count(instr: &Instr<Resolved>, count: &Resolved) -> EngineResult<num_bigint::BigUint> {
    match count {
        Resolved::Value(n) if n.sign() != Sign::Minus => n.to_biguint().ok_or_else(|| invalid(instr)),
        _ => Err(invalid(instr)),
    }
}

fn var_slot(instr: &Instr<Resolved>, operand: &Resolved, size: usize) -> EngineResult<usize> {
    match operand {
        // O último slot é a linha constante e nunca é destino
        Resolved::Var(slot) if *slot + 1 < size => Ok(*slot),
        Resolved::Var(slot) => Err(EngineError::SlotOutOfRange {
            slot: *slot,
            size: size.saturating_sub(1),
        }),
        Resolved::Value(_) => Err(invalid(instr)),
    }
}

/// Matriz de um único passo MOV/ADD/SUB/MUL
fn step_matrix(instr: &Instr<Resolved>, size: usize) -> EngineResult<Matrix> {
    let unit = size - 1;
    let mut table = Matrix::identity(size);
    match instr {
        Instr::Mov(dest, src) => {
            let dest = var_slot(instr, dest, size)?;
            table[(dest, dest)] = BigInt::zero();
            match src {
                Resolved::Value(v) => table[(unit, dest)] = v.clone(),
                Resolved::Var(_) => {
                    let src = var_slot(instr, src, size)?;
                    table[(src, dest)] = BigInt::one();
                }
            }
        }
        Instr::Add(dest, src) | Instr::Sub(dest, src) => {
            let dest = var_slot(instr, dest, size)?;
            let negate = matches!(instr, Instr::Sub(..));
            let (row, weight) = match src {
                Resolved::Value(v) => (unit, v.clone()),
                Resolved::Var(_) => (var_slot(instr, src, size)?, BigInt::one()),
            };
            // `+=` so that `ADD x, x` doubles and `SUB x, x` clears
            if negate {
                table[(row, dest)] -= weight;
            } else {
                table[(row, dest)] += weight;
            }
        }
        Instr::Mul(dest, src) => {
            let dest = var_slot(instr, dest, size)?;
            match src {
                Resolved::Value(v) => table[(dest, dest)] = v.clone(),
                Resolved::Var(_) => return Err(invalid(instr)),
            }
        }
        Instr::Loop(_) | Instr::End => return Err(invalid(instr)),
    }
    Ok(table)
}
