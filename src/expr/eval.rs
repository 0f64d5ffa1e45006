/*
Evaluates expression trees against machine state.

All arithmetic is u32 and wraps. Comparisons and logic ops give 0 or 1,
both sides are always evaluated (no short circuit), so an error on
either side fails the whole expression.

The machine is only seen through the Target trait: a register lookup
and a memory read. Evaluation never writes anything.
*/

use crate::{
    expr::{
        error::ExprError,
        parser::{parse, BinOp, Expr, UnaryOp},
    },
    monitor::machine::MemError,
};

pub trait Target {
    fn lookup_register(&self, name: &str) -> Option<u32>;
    fn read_memory(&self, addr: u32, width: usize) -> Result<u32, MemError>;
}

impl Expr {
    pub fn eval(&self, target: &dyn Target) -> Result<u32, ExprError> {
        match self {
            Expr::Value(v) => Ok(*v),
            Expr::Register(name) => target
                .lookup_register(name)
                .ok_or_else(|| ExprError::UnknownRegister(name.clone())),
            Expr::Unary(op, operand) => {
                let v = operand.eval(target)?;
                match op {
                    UnaryOp::Neg => Ok(v.wrapping_neg()),
                    UnaryOp::Not => Ok((v == 0) as u32),
                    UnaryOp::Deref => Ok(target.read_memory(v, 4)?),
                }
            }
            Expr::Binary(op, lhs, rhs) => {
                let l = lhs.eval(target)?;
                let r = rhs.eval(target)?;
                match op {
                    BinOp::Add => Ok(l.wrapping_add(r)),
                    BinOp::Sub => Ok(l.wrapping_sub(r)),
                    BinOp::Mul => Ok(l.wrapping_mul(r)),
                    BinOp::Div => l.checked_div(r).ok_or(ExprError::DivisionByZero),
                    BinOp::Eq => Ok((l == r) as u32),
                    BinOp::NotEq => Ok((l != r) as u32),
                    BinOp::And => Ok((l != 0 && r != 0) as u32),
                    BinOp::Or => Ok((l != 0 || r != 0) as u32),
                }
            }
        }
    }
}

pub fn evaluate(text: &str, target: &dyn Target) -> Result<u32, ExprError> {
    parse(text)?.eval(target)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::{cell::Cell, collections::HashMap};

    // a little machine: a handful of registers and a small ram
    pub(crate) struct MockTarget {
        pub regs: HashMap<String, u32>,
        pub ram: Vec<u8>,
        pub reads: Cell<usize>,
    }
    impl MockTarget {
        pub fn new() -> Self {
            let mut regs = HashMap::new();
            regs.insert("eax".to_string(), 0x10);
            regs.insert("ebx".to_string(), 3);
            let mut ram = vec![0u8; 64];
            ram[0..4].copy_from_slice(&0xdeadbeefu32.to_le_bytes());
            ram[0x10..0x14].copy_from_slice(&0x1234u32.to_le_bytes());
            Self {
                regs,
                ram,
                reads: Cell::new(0),
            }
        }
        pub fn poke(&mut self, addr: usize, val: u32) {
            self.ram[addr..addr + 4].copy_from_slice(&val.to_le_bytes());
        }
    }
    impl Target for MockTarget {
        fn lookup_register(&self, name: &str) -> Option<u32> {
            self.regs.get(name).copied()
        }
        fn read_memory(&self, addr: u32, width: usize) -> Result<u32, MemError> {
            self.reads.set(self.reads.get() + 1);
            let start = addr as usize;
            if start + width > self.ram.len() {
                return Err(MemError::OutOfBound {
                    addr,
                    len: width,
                    limit: self.ram.len() as u32,
                });
            }
            let mut bytes = [0u8; 4];
            bytes[..width].copy_from_slice(&self.ram[start..start + width]);
            Ok(u32::from_le_bytes(bytes))
        }
    }

    fn eval(text: &str) -> Result<u32, ExprError> {
        evaluate(text, &MockTarget::new())
    }

    #[test]
    fn arithmetic() {
        assert_eq!(eval("1+2*3"), Ok(7));
        assert_eq!(eval("-3+4"), Ok(1));
        assert_eq!(eval("(1+2)*3"), Ok(9));
        assert_eq!(eval("((1+2))"), Ok(3));
        assert_eq!(eval("10-3-2"), Ok(5));
        assert_eq!(eval("100/10/5"), Ok(2));
        assert_eq!(eval("7/2"), Ok(3));
        assert_eq!(eval("2 * (3 + 4) - 0x10"), Ok(14u32.wrapping_sub(16)));
    }

    #[test]
    fn wraparound() {
        assert_eq!(eval("0-1"), Ok(u32::MAX));
        assert_eq!(eval("-1"), Ok(0xffff_ffff));
        assert_eq!(eval("0xffffffff+2"), Ok(1));
        assert_eq!(eval("0x10000*0x10000"), Ok(0));
        assert_eq!(eval("--5"), Ok(5));
    }

    #[test]
    fn logic() {
        assert_eq!(eval("1==1"), Ok(1));
        assert_eq!(eval("1==2"), Ok(0));
        assert_eq!(eval("1!=2"), Ok(1));
        assert_eq!(eval("2&&3"), Ok(1));
        assert_eq!(eval("2&&0"), Ok(0));
        assert_eq!(eval("0||0"), Ok(0));
        assert_eq!(eval("0||7"), Ok(1));
        assert_eq!(eval("!0"), Ok(1));
        assert_eq!(eval("!5"), Ok(0));
        assert_eq!(eval("!!5"), Ok(1));
        assert_eq!(eval("!-1"), Ok(0));
        // || looser than &&, && looser than ==
        assert_eq!(eval("1 || 0 && 0"), Ok(1));
        assert_eq!(eval("1+1 == 2 && 3"), Ok(1));
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(eval("5/0"), Err(ExprError::DivisionByZero));
        assert_eq!(eval("5/(2-2)"), Err(ExprError::DivisionByZero));
        // no short circuit, the right side still fails
        assert_eq!(eval("0 && 1/0"), Err(ExprError::DivisionByZero));
    }

    #[test]
    fn registers() {
        assert_eq!(eval("$eax"), Ok(0x10));
        assert_eq!(eval("$eax + $ebx * 2"), Ok(0x16));
        assert_eq!(
            eval("$UNKNOWNREG"),
            Err(ExprError::UnknownRegister("UNKNOWNREG".to_string()))
        );
    }

    #[test]
    fn dereference() {
        assert_eq!(eval("*0"), Ok(0xdeadbeef));
        assert_eq!(eval("*$eax"), Ok(0x1234));
        assert_eq!(eval("*(0x8+8) + 1"), Ok(0x1235));
        assert_eq!(eval("2**0x10"), Ok(0x2468));
        assert_eq!(eval("-*0x10"), Ok(0x1234u32.wrapping_neg()));
        assert_eq!(
            eval("*62"),
            Err(ExprError::Memory(MemError::OutOfBound {
                addr: 62,
                len: 4,
                limit: 64
            }))
        );
    }

    #[test]
    fn whole_input_in_parens_is_stripped() {
        // some monitors refuse an expression that is entirely wrapped in
        // one pair of parens; here it is simply unwrapped
        assert_eq!(eval("(5)"), Ok(5));
        assert_eq!(eval("(1+2)"), Ok(3));
        assert_eq!(eval("(1)+(2)"), Ok(3));
    }

    #[test]
    fn evaluation_is_repeatable() {
        let target = MockTarget::new();
        let expr = parse("*0 + $eax").unwrap();
        let first = expr.eval(&target).unwrap();
        let second = expr.eval(&target).unwrap();
        assert_eq!(first, second);
        assert_eq!(target.reads.get(), 2);
        assert_eq!(target.ram[0..4], 0xdeadbeefu32.to_le_bytes());
        assert_eq!(evaluate("*0 + $eax", &target), Ok(first));
    }
}
