//! Matrix code: o conjunto de instruções entre o recompilador e o engine
//!
//! Ciclo de vida dos operandos:
//!
//! ```text
//! recompilador ─▶ Instr<Operand>   { Value, Const, Param, Var }
//!                       │  constantes dobradas e parâmetros avaliados
//!                       ▼  na invocação do loop
//! engine       ◀─ Instr<Resolved>  { Value, Var }
//! ```

use std::fmt;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// Operações do matrix code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatOp {
    Mov,
    Add,
    Sub,
    Mul,
    Loop,
    End,
}

impl MatOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            MatOp::Mov => "MOV",
            MatOp::Add => "ADD",
            MatOp::Sub => "SUB",
            MatOp::Mul => "MUL",
            MatOp::Loop => "LOOP",
            MatOp::End => "END",
        }
    }
}

impl fmt::Display for MatOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Parâmetros nomeados da invocação
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Param {
    Start,
    Step,
    ItersCount,
}

impl Param {
    pub fn name(self) -> &'static str {
        match self {
            Param::Start => "start",
            Param::Step => "step",
            Param::ItersCount => "iters_count",
        }
    }
}

/// Operando de um programa compilado
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    /// Escalar bruto
    Value(BigInt),
    /// Índice de constante dobrada
    Const(usize),
    /// Parâmetro da invocação
    Param(Param),
    /// Slot da tabela unificada de variáveis
    Var(usize),
}

/// Operando pronto para execução
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolved {
    Value(BigInt),
    Var(usize),
}

/// Instrução de matrix code, genérica sobre o estágio do operando
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instr<A> {
    /// `dest = src`
    Mov(A, A),
    /// `dest += src`
    Add(A, A),
    /// `dest -= src`
    Sub(A, A),
    /// `dest *= src` (src escalar)
    Mul(A, A),
    /// Início de bloco repetido `count` vezes
    Loop(A),
    /// Fim de bloco
    End,
}

impl<A> Instr<A> {
    pub fn op(&self) -> MatOp {
        match self {
            Instr::Mov(..) => MatOp::Mov,
            Instr::Add(..) => MatOp::Add,
            Instr::Sub(..) => MatOp::Sub,
            Instr::Mul(..) => MatOp::Mul,
            Instr::Loop(_) => MatOp::Loop,
            Instr::End => MatOp::End,
        }
    }

    /// Operandos na ordem em que aparecem
    pub fn operands(&self) -> Vec<&A> {
        match self {
            Instr::Mov(d, s) | Instr::Add(d, s) | Instr::Sub(d, s) | Instr::Mul(d, s) => vec![d, s],
            Instr::Loop(count) => vec![count],
            Instr::End => Vec::new(),
        }
    }

    /// Converte os operandos para outro estágio, parando no primeiro erro
    pub fn resolve<B, E>(&self, mut f: impl FnMut(&A) -> Result<B, E>) -> Result<Instr<B>, E> {
        Ok(match self {
            Instr::Mov(d, s) => {
                let d = f(d)?;
                Instr::Mov(d, f(s)?)
            }
            Instr::Add(d, s) => {
                let d = f(d)?;
                Instr::Add(d, f(s)?)
            }
            Instr::Sub(d, s) => {
                let d = f(d)?;
                Instr::Sub(d, f(s)?)
            }
            Instr::Mul(d, s) => {
                let d = f(d)?;
                Instr::Mul(d, f(s)?)
            }
            Instr::Loop(count) => Instr::Loop(f(count)?),
            Instr::End => Instr::End,
        })
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(v) => write!(f, "{}", v),
            Operand::Const(i) => write!(f, "const{}", i),
            Operand::Param(p) => write!(f, "{}", p),
            Operand::Var(i) => write!(f, "var{}", i),
        }
    }
}

impl fmt::Display for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Value(v) => write!(f, "{}", v),
            Resolved::Var(i) => write!(f, "var{}", i),
        }
    }
}

impl<A: fmt::Display> fmt::Display for Instr<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.op().mnemonic())?;
        for (index, operand) in self.operands().into_iter().enumerate() {
            let sep = if index == 0 { " " } else { ", " };
            write!(f, "{}{}", sep, operand)?;
        }
        Ok(())
    }
}

/// Desmonta um programa, indentando blocos LOOP
pub fn disassemble<A: fmt::Display>(code: &[Instr<A>]) -> String {
    let mut out = String::new();
    let mut depth = 0usize;
    for instr in code {
        if matches!(instr, Instr::End) {
            depth = depth.saturating_sub(1);
        }
        out.push_str(&"    ".repeat(depth));
        out.push_str(&instr.to_string());
        out.push('\n');
        if matches!(instr, Instr::Loop(_)) {
            depth += 1;
        }
    }
    out
}
