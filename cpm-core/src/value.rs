//! Valores escalares do host
//!
//! O domínio do acelerador são inteiros exatos de precisão arbitrária.
//! `Float` existe apenas para que o portão de tipos tenha algo a rejeitar
//! e para o resultado de `TrueDivide` durante a dobra de constantes.

use std::collections::BTreeSet;
use std::fmt;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Valor escalar do host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(BigInt),
    Bool(bool),
    Float(f64),
}

/// Tag de tipo de um [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Int,
    Bool,
    Float,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::Bool => "bool",
            ValueKind::Float => "float",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Conjunto de tipos escalares permitidos
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeSet(BTreeSet<ValueKind>);

impl TypeSet {
    pub fn new(kinds: impl IntoIterator<Item = ValueKind>) -> Self {
        Self(kinds.into_iter().collect())
    }

    /// Apenas inteiros
    pub fn integers() -> Self {
        Self::new([ValueKind::Int])
    }

    pub fn contains(&self, kind: ValueKind) -> bool {
        self.0.contains(&kind)
    }

    /// `int` também admite `bool` (subtipo de inteiro no host)
    pub fn allows(&self, value: &Value) -> bool {
        match value.kind() {
            ValueKind::Bool => self.contains(ValueKind::Bool) || self.contains(ValueKind::Int),
            kind => self.contains(kind),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = ValueKind> + '_ {
        self.0.iter().copied()
    }
}

impl Default for TypeSet {
    fn default() -> Self {
        Self::integers()
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(ValueKind::name).collect();
        f.write_str(&names.join(", "))
    }
}

/// Operações unárias primitivas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Positive,
    Negative,
    Not,
    Invert,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Positive => "+",
            UnaryOp::Negative => "-",
            UnaryOp::Not => "not",
            UnaryOp::Invert => "~",
        }
    }
}

/// Operações binárias primitivas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Power,
    Multiply,
    Divide,
    FloorDivide,
    TrueDivide,
    Modulo,
    Add,
    Subtract,
    LShift,
    RShift,
    And,
    Xor,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Power => "**",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::FloorDivide => "//",
            BinaryOp::TrueDivide => "/.",
            BinaryOp::Modulo => "%",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::LShift => "<<",
            BinaryOp::RShift => ">>",
            BinaryOp::And => "&",
            BinaryOp::Xor => "^",
            BinaryOp::Or => "|",
        }
    }

    /// Operações que podem envolver valores imprevisíveis no matrix code
    pub fn is_affine(self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply)
    }
}

impl Value {
    pub fn int(value: impl Into<BigInt>) -> Self {
        Value::Int(value.into())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Bool(_) => ValueKind::Bool,
            Value::Float(_) => ValueKind::Float,
        }
    }

    /// Converte para inteiro (bool vira 0/1; float é rejeitado)
    pub fn to_int(&self) -> Result<BigInt, ValueError> {
        match self {
            Value::Int(v) => Ok(v.clone()),
            Value::Bool(b) => Ok(if *b { BigInt::one() } else { BigInt::zero() }),
            Value::Float(x) => Err(ValueError::NotAnInteger(x.to_string())),
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Int(v) => !v.is_zero(),
            Value::Bool(b) => *b,
            Value::Float(x) => *x != 0.0,
        }
    }

    fn to_float(&self) -> f64 {
        match self {
            Value::Int(v) => v.to_f64().unwrap_or(f64::NAN),
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Float(x) => *x,
        }
    }

    /// Aplica uma operação unária
    pub fn unary(&self, op: UnaryOp) -> Result<Value, ValueError> {
        if op == UnaryOp::Not {
            return Ok(Value::Bool(!self.truthy()));
        }
        if let Value::Float(x) = self {
            return match op {
                UnaryOp::Positive => Ok(Value::Float(*x)),
                UnaryOp::Negative => Ok(Value::Float(-x)),
                _ => Err(ValueError::Unsupported {
                    op: op.symbol(),
                    kind: "float",
                }),
            };
        }
        let v = self.to_int()?;
        Ok(Value::Int(match op {
            UnaryOp::Positive | UnaryOp::Not => v,
            UnaryOp::Negative => -v,
            UnaryOp::Invert => !v,
        }))
    }

    /// Aplica uma operação binária `self op rhs`
    pub fn binary(&self, op: BinaryOp, rhs: &Value) -> Result<Value, ValueError> {
        if matches!(self, Value::Float(_)) || matches!(rhs, Value::Float(_)) {
            return float_binary(op, self.to_float(), rhs.to_float());
        }

        let a = self.to_int()?;
        let b = rhs.to_int()?;
        let result = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Subtract => a - b,
            BinaryOp::Multiply => a * b,
            BinaryOp::Divide | BinaryOp::FloorDivide => {
                if b.is_zero() {
                    return Err(ValueError::DivisionByZero);
                }
                a.div_floor(&b)
            }
            BinaryOp::Modulo => {
                if b.is_zero() {
                    return Err(ValueError::DivisionByZero);
                }
                a.mod_floor(&b)
            }
            BinaryOp::Power => {
                if b.is_negative() {
                    return Err(ValueError::NegativeExponent(b.to_string()));
                }
                let exp = b
                    .to_u32()
                    .ok_or_else(|| ValueError::ExponentTooLarge(b.to_string()))?;
                a.pow(exp)
            }
            BinaryOp::LShift => a << shift_count(&b)?,
            BinaryOp::RShift => a >> shift_count(&b)?,
            BinaryOp::And => a & b,
            BinaryOp::Xor => a ^ b,
            BinaryOp::Or => a | b,
            BinaryOp::TrueDivide => return true_divide(self.to_float(), rhs.to_float()),
        };
        Ok(Value::Int(result))
    }
}

fn shift_count(count: &BigInt) -> Result<usize, ValueError> {
    if count.is_negative() {
        return Err(ValueError::NegativeShift(count.to_string()));
    }
    count
        .to_usize()
        .ok_or_else(|| ValueError::ShiftTooLarge(count.to_string()))
}

fn true_divide(a: f64, b: f64) -> Result<Value, ValueError> {
    if b == 0.0 {
        return Err(ValueError::DivisionByZero);
    }
    Ok(Value::Float(a / b))
}

fn float_binary(op: BinaryOp, a: f64, b: f64) -> Result<Value, ValueError> {
    let result = match op {
        BinaryOp::TrueDivide => return true_divide(a, b),
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Power => a.powf(b),
        _ => {
            return Err(ValueError::Unsupported {
                op: op.symbol(),
                kind: "float",
            });
        }
    };
    Ok(Value::Float(result))
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(BigInt::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(BigInt::from(v))
    }
}

impl From<BigInt> for Value {
    fn from(v: BigInt) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Float(x) => write!(f, "{:?}", x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> Value {
        Value::from(v)
    }

    #[test]
    fn test_floor_semantics() {
        assert_eq!(int(-7).binary(BinaryOp::FloorDivide, &int(2)).unwrap(), int(-4));
        assert_eq!(int(-7).binary(BinaryOp::Modulo, &int(2)).unwrap(), int(1));
        assert_eq!(int(7).binary(BinaryOp::Modulo, &int(-2)).unwrap(), int(-1));
        assert_eq!(int(328).binary(BinaryOp::Divide, &int(43)).unwrap(), int(7));
    }

    #[test]
    fn test_bitwise_twos_complement() {
        assert_eq!(int(-6).binary(BinaryOp::And, &int(3)).unwrap(), int(2));
        assert_eq!(int(-1).binary(BinaryOp::RShift, &int(5)).unwrap(), int(-1));
        assert_eq!(int(43).unary(UnaryOp::Invert).unwrap(), int(-44));
        assert_eq!(int(3).binary(BinaryOp::LShift, &int(70)).unwrap().to_string(), "3541774862152233910272");
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            int(1).binary(BinaryOp::Modulo, &int(0)),
            Err(ValueError::DivisionByZero)
        );
        assert!(matches!(
            int(2).binary(BinaryOp::Power, &int(-1)),
            Err(ValueError::NegativeExponent(_))
        ));
        assert!(matches!(
            int(2).binary(BinaryOp::LShift, &int(-1)),
            Err(ValueError::NegativeShift(_))
        ));
    }

    #[test]
    fn test_bool_coercion() {
        assert_eq!(int(9).unary(UnaryOp::Not).unwrap(), Value::Bool(false));
        assert_eq!(Value::Bool(true).binary(BinaryOp::Add, &int(1)).unwrap(), int(2));
        assert_eq!(Value::Bool(false).to_int().unwrap(), BigInt::zero());
    }

    #[test]
    fn test_true_divide_yields_float() {
        let v = int(7).binary(BinaryOp::TrueDivide, &int(2)).unwrap();
        assert_eq!(v, Value::Float(3.5));
        assert!(v.to_int().is_err());
        assert!(v.binary(BinaryOp::And, &int(1)).is_err());
        assert_eq!(v.binary(BinaryOp::TrueDivide, &int(2)).unwrap(), Value::Float(1.75));
        assert_eq!(Value::Bool(true).binary(BinaryOp::TrueDivide, &int(4)).unwrap(), Value::Float(0.25));
        assert_eq!(
            int(1).binary(BinaryOp::TrueDivide, &Value::Float(0.0)),
            Err(ValueError::DivisionByZero)
        );
        assert_eq!(
            Value::Float(1.0).binary(BinaryOp::TrueDivide, &int(0)),
            Err(ValueError::DivisionByZero)
        );
    }

    #[test]
    fn test_type_set() {
        let types = TypeSet::default();
        assert!(types.allows(&int(1)));
        assert!(!types.allows(&Value::Float(1.0)));
        // bool é subtipo de int
        assert!(types.allows(&Value::Bool(true)));
        let bools = TypeSet::new([ValueKind::Bool]);
        assert!(bools.allows(&Value::Bool(false)));
        assert!(!bools.allows(&int(1)));
        assert_eq!(TypeSet::new([ValueKind::Bool, ValueKind::Int]).to_string(), "int, bool");
    }
}
