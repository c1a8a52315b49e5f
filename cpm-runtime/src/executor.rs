//! Accelerated execution of a compiled loop

use cpm_compiler::{CompiledLoop, SlotKey, VarRef};
use cpm_core::{Engine, Instr, Operand, Param, Resolved, TypeSet, Value};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use tracing::debug;

use crate::error::{RuntimeError, RuntimeResult};
use crate::folded;
use crate::frame::Frame;
use crate::progression::Iterable;
use crate::settings::Settings;

/// Concrete parameters of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopShape {
    pub start: BigInt,
    pub step: BigInt,
    pub iters_count: BigInt,
    /// Last produced value, `None` when nothing is produced
    pub last: Option<BigInt>,
}

impl LoopShape {
    fn param(&self, param: Param) -> &BigInt {
        match param {
            Param::Start => &self.start,
            Param::Step => &self.step,
            Param::ItersCount => &self.iters_count,
        }
    }
}

/// Values to store back to the host after a successful run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBack {
    pub values: Vec<(VarRef, Value)>,
    /// Final loop target value, when it never reached the matrix
    pub counter: Option<(VarRef, Value)>,
}

impl WriteBack {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.counter.is_none()
    }

    pub fn apply(self, frame: &mut Frame) {
        for (var, value) in self.values.into_iter().chain(self.counter) {
            frame.store(&var, value);
        }
    }
}

/// Shape of the iterable, or `None` when it is too short to be worth it
pub fn check_iterable(iterable: &Iterable, iters_limit: u64) -> RuntimeResult<Option<LoopShape>> {
    let Iterable::Range(progression) = iterable else {
        return Err(RuntimeError::NotAProgression(iterable.type_name().to_string()));
    };

    let iters_count = progression.len();
    if iters_count <= BigInt::from(iters_limit) {
        return Ok(None);
    }
    Ok(Some(LoopShape {
        start: progression.start().clone(),
        step: progression.step().clone(),
        iters_count,
        last: progression.last(),
    }))
}

/// Initial state vector. Missing host variables become 0; present ones
/// must have an allowed type.
pub fn load_vars(compiled: &CompiledLoop, frame: &Frame, types: &TypeSet) -> RuntimeResult<Vec<BigInt>> {
    compiled
        .slots
        .iter()
        .map(|slot| match &slot.key {
            SlotKey::Host(var) => match frame.load(var) {
                Some(value) if types.allows(value) => Ok(value.to_int()?),
                Some(value) => Err(RuntimeError::DisallowedType {
                    name: var.name.clone(),
                    kind: value.kind(),
                    allowed: types.to_string(),
                }),
                None => Ok(BigInt::zero()),
            },
            SlotKey::Counter | SlotKey::Stack(_) => Ok(BigInt::zero()),
        })
        .collect()
}

/// Replaces constants and parameters with their values
pub fn resolve(matcode: &[Instr<Operand>], folded: &[BigInt], shape: &LoopShape) -> RuntimeResult<Vec<Instr<Resolved>>> {
    matcode
        .iter()
        .map(|instr| {
            instr.resolve(|operand| match operand {
                Operand::Value(v) => Ok(Resolved::Value(v.clone())),
                Operand::Const(i) => folded
                    .get(*i)
                    .map(|v| Resolved::Value(v.clone()))
                    .ok_or(RuntimeError::InvalidFoldProgram(*i)),
                Operand::Param(p) => Ok(Resolved::Value(shape.param(*p).clone())),
                Operand::Var(i) => Ok(Resolved::Var(*i)),
            })
        })
        .collect()
}

/// Runs the compiled loop for a known shape against the frame. Nothing is
/// stored: the caller applies the returned [`WriteBack`].
pub fn execute(compiled: &CompiledLoop, shape: &LoopShape, frame: &Frame, settings: &Settings) -> RuntimeResult<WriteBack> {
    if shape.iters_count.is_zero() || shape.iters_count.is_negative() {
        return Ok(WriteBack::default());
    }

    let state = load_vars(compiled, frame, &settings.types)?;
    let folded = folded::evaluate_all(&compiled.consts, frame, &settings.types)?
        .iter()
        .map(Value::to_int)
        .collect::<Result<Vec<_>, _>>()?;
    let code = resolve(&compiled.matcode, &folded, shape)?;

    let engine = Engine::new(settings.fold_constant_rows);
    let result = engine.run(&code, &state)?;

    let values = compiled
        .write_back_slots()
        .map(|(slot, var)| (var.clone(), Value::Int(result[slot].clone())))
        .collect();
    let counter = match (&compiled.counter, &shape.last) {
        (Some(var), Some(last)) if compiled.store_counter => Some((var.clone(), Value::Int(last.clone()))),
        _ => None,
    };

    debug!(
        slots = state.len(),
        consts = folded.len(),
        iterations = %shape.iters_count,
        "accelerated loop executed"
    );
    Ok(WriteBack { values, counter })
}

/// Full accelerated attempt: `Ok(None)` means the loop is too short and
/// should run literally.
pub fn exec_loop(
    compiled: &CompiledLoop,
    iterable: &Iterable,
    frame: &Frame,
    settings: &Settings,
) -> RuntimeResult<Option<WriteBack>> {
    match check_iterable(iterable, settings.iters_limit)? {
        Some(shape) => execute(compiled, &shape, frame, settings).map(Some),
        None => Ok(None),
    }
}
