//! Loop counter usage

use serde::{Deserialize, Serialize};

use crate::bytecode::{Instruction, VarRef};

/// How the body uses the loop target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CounterStatus {
    /// Never referenced: only its final value is stored after the loop
    Unused,
    /// Read but never stored: tracked in its own slot without a service copy
    ReadOnly,
    /// Stored at least once: a service slot carries the progression
    Mutated,
}

/// Scans the body after the target store. The first store of the target
/// decides `Mutated`, whatever was read before it.
pub fn classify(counter: &VarRef, body: &[Instruction]) -> CounterStatus {
    let mut status = CounterStatus::Unused;
    for instr in body {
        match instr.var_ref() {
            Some((var, true)) if var == *counter => return CounterStatus::Mutated,
            Some((var, false)) if var == *counter => status = CounterStatus::ReadOnly,
            _ => {}
        }
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Opcode;

    #[test]
    fn test_classify() {
        let i = VarRef::fast("i");
        let read = [Instruction::load_fast("i"), Instruction::store_fast("x")];
        let write = [Instruction::load_const(1), Instruction::store_fast("i")];
        let other = [Instruction::load_fast("j"), Instruction::op(Opcode::PopTop)];

        assert_eq!(classify(&i, &[]), CounterStatus::Unused);
        assert_eq!(classify(&i, &other), CounterStatus::Unused);
        assert_eq!(classify(&i, &read), CounterStatus::ReadOnly);
        assert_eq!(classify(&i, &write), CounterStatus::Mutated);
        assert_eq!(classify(&i, &[read.as_slice(), write.as_slice()].concat()), CounterStatus::Mutated);
    }

    #[test]
    fn test_classify_matches_scope() {
        let i = VarRef::global("i");
        let body = [Instruction::load_fast("i"), Instruction::store_fast("x")];
        assert_eq!(classify(&i, &body), CounterStatus::Unused);
    }
}
