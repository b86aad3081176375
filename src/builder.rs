//! One helper method per opcode, so a caller assembles a program without hand-building
//! [`Instruction`] values and risking an ill-formed `operand`/`raddr` pairing.
use crate::instruction::{Instruction, Opcode, Operand};
use crate::vm::Vm;

impl Vm {
    fn emit(&mut self, code: Opcode, addr: i64, operand: Operand, raddr: i64) -> usize {
        self.push_cmd(Instruction::new(code, addr, operand, raddr))
    }

    pub fn set_byte(&mut self, addr: i64, value: u8) -> usize {
        self.emit(Opcode::SetByte, addr, Operand::Byte(value), 0)
    }

    pub fn set_int(&mut self, addr: i64, value: i64) -> usize {
        self.emit(Opcode::SetInt, addr, Operand::Int(value), 0)
    }

    pub fn set_uint(&mut self, addr: i64, value: u64) -> usize {
        self.emit(Opcode::SetUInt, addr, Operand::UInt(value), 0)
    }

    pub fn set_float(&mut self, addr: i64, value: f64) -> usize {
        self.emit(Opcode::SetFloat, addr, Operand::Float(value), 0)
    }

    pub fn malloc(&mut self) -> usize {
        self.emit(Opcode::Malloc, 0, Operand::None, 0)
    }

    pub fn free(&mut self) -> usize {
        self.emit(Opcode::Free, 0, Operand::None, 0)
    }

    pub fn add(&mut self, lhs_addr: i64, rhs_addr: i64, result_addr: i64) -> usize {
        self.emit(Opcode::Add, lhs_addr, Operand::Addr(rhs_addr), result_addr)
    }

    pub fn sub(&mut self, lhs_addr: i64, rhs_addr: i64, result_addr: i64) -> usize {
        self.emit(Opcode::Sub, lhs_addr, Operand::Addr(rhs_addr), result_addr)
    }

    pub fn mult(&mut self, lhs_addr: i64, rhs_addr: i64, result_addr: i64) -> usize {
        self.emit(Opcode::Mult, lhs_addr, Operand::Addr(rhs_addr), result_addr)
    }

    pub fn div(&mut self, lhs_addr: i64, rhs_addr: i64, result_addr: i64) -> usize {
        self.emit(Opcode::Div, lhs_addr, Operand::Addr(rhs_addr), result_addr)
    }

    /// `target` is the index of the instruction execution should resume at. The builder
    /// hides the `addr - 1` encoding detail, callers always name the instruction they
    /// mean to land on.
    pub fn jump(&mut self, target: i64) -> usize {
        self.emit(Opcode::Jump, target, Operand::None, 0)
    }

    pub fn jcond(&mut self, target: i64, cond_addr: i64) -> usize {
        self.emit(Opcode::Jcond, target, Operand::Addr(cond_addr), 0)
    }

    pub fn and(&mut self, lhs_addr: i64, rhs_addr: i64, result_addr: i64) -> usize {
        self.emit(Opcode::And, lhs_addr, Operand::Addr(rhs_addr), result_addr)
    }

    pub fn or(&mut self, lhs_addr: i64, rhs_addr: i64, result_addr: i64) -> usize {
        self.emit(Opcode::Or, lhs_addr, Operand::Addr(rhs_addr), result_addr)
    }

    pub fn xor(&mut self, lhs_addr: i64, rhs_addr: i64, result_addr: i64) -> usize {
        self.emit(Opcode::Xor, lhs_addr, Operand::Addr(rhs_addr), result_addr)
    }

    pub fn rshift(&mut self, lhs_addr: i64, rhs_addr: i64, result_addr: i64) -> usize {
        self.emit(Opcode::Rshift, lhs_addr, Operand::Addr(rhs_addr), result_addr)
    }

    pub fn lshift(&mut self, lhs_addr: i64, rhs_addr: i64, result_addr: i64) -> usize {
        self.emit(Opcode::Lshift, lhs_addr, Operand::Addr(rhs_addr), result_addr)
    }

    pub fn not(&mut self, operand_addr: i64, result_addr: i64) -> usize {
        self.emit(Opcode::Not, operand_addr, Operand::None, result_addr)
    }

    pub fn push_opcode(&mut self) -> usize {
        self.emit(Opcode::Push, 0, Operand::None, 0)
    }

    pub fn pop_opcode(&mut self) -> usize {
        self.emit(Opcode::Pop, 0, Operand::None, 0)
    }

    pub fn dump_stack_opcode(&mut self) -> usize {
        self.emit(Opcode::Stack, 0, Operand::None, 0)
    }

    pub fn dump_commands_opcode(&mut self) -> usize {
        self.emit(Opcode::Commands, 0, Operand::None, 0)
    }

    pub fn print(&mut self, addr: i64) -> usize {
        self.emit(Opcode::Print, addr, Operand::None, 0)
    }

    pub fn copy(&mut self, dst_addr: i64, src_addr: i64) -> usize {
        self.emit(Opcode::Copy, dst_addr, Operand::Addr(src_addr), 0)
    }

    pub fn assign(&mut self, dst_addr: i64, src_addr: i64) -> usize {
        self.emit(Opcode::Assign, dst_addr, Operand::Addr(src_addr), 0)
    }

    pub fn greater(&mut self, lhs_addr: i64, rhs_addr: i64, result_addr: i64) -> usize {
        self.emit(
            Opcode::Greater,
            lhs_addr,
            Operand::Addr(rhs_addr),
            result_addr,
        )
    }

    pub fn less(&mut self, lhs_addr: i64, rhs_addr: i64, result_addr: i64) -> usize {
        self.emit(Opcode::Less, lhs_addr, Operand::Addr(rhs_addr), result_addr)
    }

    pub fn equal(&mut self, lhs_addr: i64, rhs_addr: i64, result_addr: i64) -> usize {
        self.emit(
            Opcode::Equal,
            lhs_addr,
            Operand::Addr(rhs_addr),
            result_addr,
        )
    }

    pub fn geq(&mut self, lhs_addr: i64, rhs_addr: i64, result_addr: i64) -> usize {
        self.emit(Opcode::Geq, lhs_addr, Operand::Addr(rhs_addr), result_addr)
    }

    pub fn leq(&mut self, lhs_addr: i64, rhs_addr: i64, result_addr: i64) -> usize {
        self.emit(Opcode::Leq, lhs_addr, Operand::Addr(rhs_addr), result_addr)
    }
}
