use super::arith::{self, Bits, Num, RoundingMode};
use super::{ForeignValue, Value};
use crate::vm::Fault;

fn num(v: Value) -> Num {
    arith::to_num(&v).unwrap()
}

#[test]
fn left_operand_decides_the_result_tag() {
    assert_eq!(num(Value::Uint(3)).add(num(Value::Uint(4))), Num::Uint(7));
    assert_eq!(num(Value::Uint(3)).add(num(Value::Int(-1))), Num::Uint(2));
    assert_eq!(num(Value::Int(3)).add(num(Value::Uint(4))), Num::Int(7));
    assert_eq!(num(Value::Int(3)).add(num(Value::Float(0.5))), Num::Float(3.5));
    assert_eq!(num(Value::Float(0.5)).add(num(Value::Int(3))), Num::Float(3.5));
}

#[test]
fn integer_arithmetic_wraps() {
    assert_eq!(num(Value::Uint(1)).sub(num(Value::Uint(2))), Num::Uint(u64::MAX));
    assert_eq!(
        num(Value::Int(i64::MAX)).add(num(Value::Int(1))),
        Num::Int(i64::MIN)
    );
    assert_eq!(
        num(Value::Uint(u64::MAX)).add(num(Value::Uint(2))),
        Num::Uint(1)
    );
}

#[test]
fn uint_mul_div_mod_land_in_int() {
    assert_eq!(num(Value::Uint(6)).mul(num(Value::Uint(7))), Num::Int(42));
    assert_eq!(
        num(Value::Uint(42)).div(num(Value::Uint(6))).unwrap(),
        Num::Int(7)
    );
    assert_eq!(
        num(Value::Uint(43)).rem(num(Value::Uint(6))).unwrap(),
        Num::Int(1)
    );
    // A signed right operand keeps the Uint tag.
    assert_eq!(num(Value::Uint(6)).mul(num(Value::Int(7))), Num::Uint(42));
    assert_eq!(
        num(Value::Uint(42)).div(num(Value::Int(6))).unwrap(),
        Num::Uint(7)
    );
}

#[test]
fn integer_division_by_zero_faults() {
    assert_eq!(
        num(Value::Int(1)).div(num(Value::Int(0))),
        Err(Fault::DivisionByZero)
    );
    assert_eq!(
        num(Value::Uint(1)).rem(num(Value::Uint(0))),
        Err(Fault::DivisionByZero)
    );
    // Floats follow IEEE instead.
    assert_eq!(
        num(Value::Float(1.0)).div(num(Value::Int(0))).unwrap(),
        Num::Float(f64::INFINITY)
    );
}

#[test]
fn double_negation_is_identity() {
    for v in [Value::Int(5), Value::Int(-5), Value::Int(0), Value::Uint(17)] {
        let n = num(v);
        assert_eq!(n.neg().neg(), n);
    }
    // Bitwise-equal for floats, including the signed zero.
    for f in [1.5f64, -1.5, 0.0, -0.0] {
        let n = num(Value::Float(f));
        match n.neg().neg() {
            Num::Float(back) => assert_eq!(back.to_bits(), f.to_bits()),
            other => panic!("float negation changed kind: {other:?}"),
        }
    }
    assert_eq!(num(Value::Uint(5)).neg(), Num::Uint(5u64.wrapping_neg()));
}

#[test]
fn pow_follows_the_exponent_rules() {
    assert_eq!(num(Value::Int(7)).pow(num(Value::Int(0))), Num::Uint(1));
    assert_eq!(num(Value::Uint(7)).pow(num(Value::Uint(0))), Num::Uint(1));
    assert_eq!(num(Value::Int(2)).pow(num(Value::Int(10))), Num::Int(1024));
    assert_eq!(num(Value::Int(2)).pow(num(Value::Int(1))), Num::Int(2));
    assert_eq!(num(Value::Uint(3)).pow(num(Value::Int(4))), Num::Uint(81));
    assert_eq!(num(Value::Int(2)).pow(num(Value::Int(-2))), Num::Float(0.25));
    assert_eq!(num(Value::Float(2.0)).pow(num(Value::Int(3))), Num::Float(8.0));
    assert_eq!(num(Value::Int(4)).pow(num(Value::Float(0.5))), Num::Float(2.0));
}

#[test]
fn sqrt_truncates_to_the_receiver_tag() {
    assert_eq!(num(Value::Int(10)).sqrt(), Num::Int(3));
    assert_eq!(num(Value::Uint(16)).sqrt(), Num::Uint(4));
    assert_eq!(num(Value::Float(2.25)).sqrt(), Num::Float(1.5));
}

#[test]
fn bitwise_ops_keep_the_left_tag() {
    let bits = |v: Value| arith::to_bits(&v).unwrap();
    assert_eq!(bits(Value::Int(0b1100)).and(bits(Value::Uint(0b1010))), Bits::Int(0b1000));
    assert_eq!(bits(Value::Uint(0b1100)).or(bits(Value::Int(0b1010))), Bits::Uint(0b1110));
    assert_eq!(bits(Value::Uint(0b1100)).xor(bits(Value::Uint(0b1010))), Bits::Uint(0b0110));
    assert_eq!(bits(Value::Int(0)).not(), Bits::Int(-1));
    assert_eq!(bits(Value::Uint(u64::MAX)).not(), Bits::Uint(0));
    // Floats truncate into Int on the way into the bitwise kind.
    assert_eq!(bits(Value::Float(-2.9)), Bits::Int(-2));
}

#[test]
fn shift_counts_are_signed_and_direction_flipping() {
    let shl = arith::bit_shift(&Value::Uint(1003), &Value::Float(-4.0)).unwrap();
    assert_eq!(shl, Value::Uint(16048));
    let shr = arith::bit_shift(&Value::Uint(1003), &Value::Float(4.0)).unwrap();
    assert_eq!(shr, Value::Uint(62));
    let zero = arith::bit_shift(&Value::Uint(1003), &Value::Int(0)).unwrap();
    assert_eq!(zero, Value::Uint(1003));
}

#[test]
fn arithmetic_shift_sign_extends() {
    assert_eq!(
        arith::arith_shift(&Value::Int(-1003), &Value::Int(4)).unwrap(),
        Value::Int(-63)
    );
    // Uint reinterprets as signed for the duration of the shift.
    assert_eq!(
        arith::arith_shift(&Value::Uint(u64::MAX), &Value::Int(8)).unwrap(),
        Value::Uint(u64::MAX)
    );
}

#[test]
fn logical_shift_zero_extends_signed_values() {
    assert_eq!(
        arith::bit_shift(&Value::Int(-1003), &Value::Int(4)).unwrap(),
        Value::Int(1152921504606846913)
    );
    assert_eq!(
        arith::bit_shift(&Value::Int(-1003), &Value::Int(-4)).unwrap(),
        Value::Int(-16048)
    );
}

#[test]
fn shift_coerces_floats_exactly_once() {
    assert_eq!(
        arith::bit_shift(&Value::Float(-1003.0), &Value::Float(4.0)).unwrap(),
        Value::Int(1152921504606846913)
    );
    assert_eq!(
        arith::bit_shift(&Value::Empty, &Value::Int(1)),
        Err(Fault::TypeFault("Empty"))
    );
}

#[test]
fn rounding_modes() {
    let round = |x: f64, mode| arith::round(&Value::Float(x), mode).unwrap();
    assert_eq!(round(2.5, RoundingMode::Truncate), Value::Float(2.0));
    assert_eq!(round(-2.5, RoundingMode::Truncate), Value::Float(-2.0));
    assert_eq!(round(2.5, RoundingMode::Nearest), Value::Float(3.0));
    assert_eq!(round(-2.5, RoundingMode::Nearest), Value::Float(-3.0));
    assert_eq!(round(2.5, RoundingMode::Floor), Value::Float(2.0));
    assert_eq!(round(-2.5, RoundingMode::Floor), Value::Float(-3.0));
    assert_eq!(round(2.5, RoundingMode::Ceil), Value::Float(3.0));
    assert_eq!(round(-2.5, RoundingMode::Ceil), Value::Float(-2.0));
    // Integer tags pass through untouched.
    assert_eq!(
        arith::round(&Value::Int(-7), RoundingMode::Ceil).unwrap(),
        Value::Int(-7)
    );
    assert_eq!(
        RoundingMode::from_raw(7),
        Err(Fault::InvalidRoundingMode(7))
    );
}

#[test]
fn comparisons_promote_through_floats() {
    assert!(arith::less_than(&Value::Int(1), &Value::Float(1.5)).unwrap());
    assert!(arith::less_equal(&Value::Float(1.5), &Value::Float(1.5)).unwrap());
    assert!(arith::equal(&Value::Int(2), &Value::Float(2.0)).unwrap());
    assert!(!arith::less_than(&Value::Float(f64::NAN), &Value::Float(0.0)).unwrap());
    assert!(!arith::equal(&Value::Float(f64::NAN), &Value::Float(f64::NAN)).unwrap());
}

#[derive(Debug)]
struct Meters(i64);

impl ForeignValue for Meters {
    fn int64(&self) -> Option<i64> {
        Some(self.0)
    }
}

#[derive(Debug)]
struct Opaque;

impl ForeignValue for Opaque {}

#[test]
fn foreign_values_coerce_through_probes() {
    let v = Value::Foreign(std::sync::Arc::new(Meters(40)));
    assert_eq!(arith::to_num(&v).unwrap().add(num(Value::Int(2))), Num::Int(42));

    let opaque = Value::Foreign(std::sync::Arc::new(Opaque));
    assert_eq!(arith::to_num(&opaque), Err(Fault::TypeFault("Foreign")));
}
