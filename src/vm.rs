//! The execution kernel and run loop.
use std::convert::TryFrom;

use crate::definitions::storage::{PROGRAM_INITIAL_CAPACITY, STACK_INITIAL_CAPACITY};
use crate::error::VmError;
use crate::instruction::{Instruction, Opcode, Operand};
use crate::register::{self, Register, TypeTag};
use crate::vector::DynVec;

#[derive(Debug, Clone, Copy, PartialEq)]
enum ArithKind {
    Add,
    Sub,
    Mult,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BitKind {
    And,
    Or,
    Xor,
    Rshift,
    Lshift,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CompareKind {
    Greater,
    Less,
    Equal,
    Geq,
    Leq,
}

/// The virtual machine: a program, a value stack, and a program counter.
///
/// A `Vm` exclusively owns its program and stack, there is no sharing between
/// instances. It is not [`Sync`] (introspection writes and `cmd_ptr` mutation are not
/// meant to be observed from another thread concurrently) but is [`Send`], so a whole VM
/// can be handed off to a single worker thread.
pub struct Vm {
    cmd_ptr: usize,
    program: DynVec<Instruction>,
    stack: DynVec<Register>,
    /// When set, `UnknownOpcode` and `DivisionByZero` halt [`Self::run`] instead of being
    /// logged and skipped.
    strict: bool,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    /// Creates an empty VM: no instructions, no stack cells, `cmd_ptr == 0`.
    pub fn new() -> Self {
        Self {
            cmd_ptr: 0,
            program: DynVec::new(PROGRAM_INITIAL_CAPACITY),
            stack: DynVec::new(STACK_INITIAL_CAPACITY),
            strict: false,
        }
    }

    /// Releases the program and stack. Ownership already guarantees this happens on
    /// drop, so calling it explicitly is optional; provided for parity with hosts that
    /// expect an explicit `new`/`delete` lifecycle.
    pub fn delete(self) {
        log::debug!("vm dropped at cmd_ptr {}", self.cmd_ptr);
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn cmd_ptr(&self) -> usize {
        self.cmd_ptr
    }

    pub fn program(&self) -> &DynVec<Instruction> {
        &self.program
    }

    pub fn stack(&self) -> &DynVec<Register> {
        &self.stack
    }

    /// Appends `cmd` to the program unconditionally, bypassing the builder surface.
    /// Defined behavior only when the caller respects the per-opcode field conventions;
    /// an ill-formed instruction simply misbehaves or no-ops at dispatch time rather
    /// than being rejected here.
    pub fn push_cmd(&mut self, cmd: Instruction) -> usize {
        self.program.push(cmd)
    }

    /// Truncates the program to zero length without freeing its capacity.
    pub fn clear_program(&mut self) {
        self.program.clear();
        self.cmd_ptr = 0;
    }

    /// Appends a default-tagged register to the stack, returning its new index.
    pub fn push(&mut self) -> usize {
        self.stack.push(Register::default())
    }

    pub fn pop(&mut self) -> Result<Register, VmError> {
        Ok(self.stack.pop()?)
    }

    pub fn get(&self, addr: i64) -> Result<Register, VmError> {
        Ok(self.stack.get(addr)?)
    }

    pub fn set(&mut self, addr: i64, reg: Register) -> Result<(), VmError> {
        Ok(self.stack.set(addr, reg)?)
    }

    /// Runs the program from the current `cmd_ptr` to completion.
    ///
    /// ```text
    /// cmd_ptr := 0
    /// while cmd_ptr < program.length:
    ///     cmd := program[cmd_ptr]
    ///     execute(cmd)       # may mutate cmd_ptr via JUMP/JCOND
    ///     cmd_ptr := cmd_ptr + 1
    /// ```
    ///
    /// In non-strict mode (the default) a faulting instruction is logged at `warn!` and
    /// execution continues, errors are advisory. In strict mode `run` returns the first
    /// `Err` and leaves `cmd_ptr` at the faulting instruction.
    pub fn run(&mut self) -> Result<(), VmError> {
        while self.cmd_ptr < self.program.len() {
            let cmd = self.program.get(self.cmd_ptr as i64)?;
            match self.execute(cmd) {
                Ok(_) => {}
                Err(err) if self.strict => return Err(err),
                Err(err) => log::warn!("instruction at {} faulted: {}", self.cmd_ptr, err),
            }
            self.cmd_ptr = self.cmd_ptr.wrapping_add(1);
        }
        Ok(())
    }

    /// Dispatches a single instruction. Returns the address the opcode principally acted
    /// on (result address for operator opcodes, the new stack index for `PUSH`, `0`
    /// otherwise), mostly useful for tests and tracing.
    ///
    /// An unrecognized `code` is a no-op in non-strict mode (`Ok(0)`, logged); in strict
    /// mode it is `Err(VmError::UnknownOpcode)`.
    pub fn execute(&mut self, cmd: Instruction) -> Result<i64, VmError> {
        let opcode = match Opcode::try_from(cmd.code) {
            Ok(op) => op,
            Err(code) => {
                return if self.strict {
                    Err(VmError::UnknownOpcode(code))
                } else {
                    log::warn!("unknown opcode {:#04x}, treated as a no-op", code);
                    Ok(0)
                }
            }
        };
        log::trace!("dispatching {:?} at cmd_ptr {}", opcode, self.cmd_ptr);

        match opcode {
            Opcode::SetByte => self.exec_set(cmd, |op| match op {
                Operand::Byte(v) => Register::Byte(v),
                _ => Register::default(),
            }),
            Opcode::SetInt => self.exec_set(cmd, |op| match op {
                Operand::Int(v) => Register::Int(v),
                _ => Register::default(),
            }),
            Opcode::SetUInt => self.exec_set(cmd, |op| match op {
                Operand::UInt(v) => Register::UInt(v),
                _ => Register::default(),
            }),
            Opcode::SetFloat => self.exec_set(cmd, |op| match op {
                Operand::Float(v) => Register::Float(v),
                _ => Register::default(),
            }),

            // Reserved, unspecified.
            Opcode::Malloc | Opcode::Free => {
                log::debug!("{:?} is reserved and not implemented", opcode);
                Ok(0)
            }

            Opcode::Add => self.exec_arith(cmd, ArithKind::Add),
            Opcode::Sub => self.exec_arith(cmd, ArithKind::Sub),
            Opcode::Mult => self.exec_arith(cmd, ArithKind::Mult),
            Opcode::Div => self.exec_arith(cmd, ArithKind::Div),

            Opcode::Jump => self.exec_jump(cmd.addr),
            Opcode::Jcond => self.exec_jcond(cmd),

            Opcode::And => self.exec_bitwise(cmd, BitKind::And),
            Opcode::Or => self.exec_bitwise(cmd, BitKind::Or),
            Opcode::Xor => self.exec_bitwise(cmd, BitKind::Xor),
            Opcode::Rshift => self.exec_bitwise(cmd, BitKind::Rshift),
            Opcode::Lshift => self.exec_bitwise(cmd, BitKind::Lshift),
            Opcode::Not => self.exec_not(cmd),

            Opcode::Push => Ok(self.push() as i64),
            Opcode::Pop => {
                self.stack.pop()?;
                Ok(0)
            }

            Opcode::Stack => {
                let dump = crate::dump::dump_stack(self);
                log::info!("{}", dump);
                Ok(0)
            }
            Opcode::Commands => {
                let dump = crate::dump::dump_program(self);
                log::info!("{}", dump);
                Ok(0)
            }
            Opcode::Print => {
                let dump = crate::dump::dump_register(self, cmd.addr)?;
                log::info!("{}", dump);
                Ok(0)
            }

            Opcode::Copy => self.exec_copy(cmd),
            Opcode::Assign => self.exec_assign(cmd),

            Opcode::Greater => self.exec_compare(cmd, CompareKind::Greater),
            Opcode::Less => self.exec_compare(cmd, CompareKind::Less),
            Opcode::Equal => self.exec_compare(cmd, CompareKind::Equal),
            Opcode::Geq => self.exec_compare(cmd, CompareKind::Geq),
            Opcode::Leq => self.exec_compare(cmd, CompareKind::Leq),
        }
    }

    fn exec_set(
        &mut self,
        cmd: Instruction,
        build: impl FnOnce(Operand) -> Register,
    ) -> Result<i64, VmError> {
        let reg = build(cmd.operand);
        self.stack.set(cmd.addr, reg)?;
        Ok(cmd.addr)
    }

    fn operand_addr(operand: Operand) -> i64 {
        match operand {
            Operand::Addr(a) => a,
            _ => 0,
        }
    }

    fn exec_arith(&mut self, cmd: Instruction, kind: ArithKind) -> Result<i64, VmError> {
        let lhs = self.stack.get(cmd.addr)?;
        let rhs = self.stack.get(Self::operand_addr(cmd.operand))?;
        let result = arithmetic(kind, lhs, rhs)?;
        self.stack.set(cmd.raddr, result)?;
        Ok(cmd.raddr)
    }

    fn exec_bitwise(&mut self, cmd: Instruction, kind: BitKind) -> Result<i64, VmError> {
        let lhs = self.stack.get(cmd.addr)?;
        let rhs = self.stack.get(Self::operand_addr(cmd.operand))?;
        let result = bitwise(kind, lhs, rhs);
        self.stack.set(cmd.raddr, result)?;
        Ok(cmd.raddr)
    }

    fn exec_not(&mut self, cmd: Instruction) -> Result<i64, VmError> {
        let operand = self.stack.get(cmd.addr)?;
        let tag = register::promote_not(operand.tag());
        let value = if operand.is_truthy() { 0 } else { 1 };
        self.stack.set(cmd.raddr, Register::with_tag_from_i64(tag, value))?;
        Ok(cmd.raddr)
    }

    fn exec_compare(&mut self, cmd: Instruction, kind: CompareKind) -> Result<i64, VmError> {
        let lhs = self.stack.get(cmd.addr)?;
        let rhs = self.stack.get(Self::operand_addr(cmd.operand))?;
        let tag = register::promote(lhs.tag(), rhs.tag());
        let ordering = lhs.partial_cmp(&rhs);
        let truth = match (kind, ordering) {
            (CompareKind::Greater, Some(std::cmp::Ordering::Greater)) => true,
            (CompareKind::Less, Some(std::cmp::Ordering::Less)) => true,
            (CompareKind::Equal, Some(std::cmp::Ordering::Equal)) => true,
            (CompareKind::Geq, Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)) => {
                true
            }
            (CompareKind::Leq, Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)) => true,
            _ => false,
        };
        let value = Register::with_tag_from_i64(tag, truth as i64);
        self.stack.set(cmd.raddr, value)?;
        Ok(cmd.raddr)
    }

    /// `addr - 1`: the run loop increments `cmd_ptr` by one after every dispatched
    /// instruction, so the next instruction fetched is `addr` itself. Wrapping arithmetic
    /// keeps `JUMP 0` well-defined (wraps to `usize::MAX`, then the post-increment wraps
    /// back to `0`) instead of panicking on the underflow.
    fn exec_jump(&mut self, addr: i64) -> Result<i64, VmError> {
        self.cmd_ptr = (addr as usize).wrapping_sub(1);
        Ok(addr)
    }

    fn exec_jcond(&mut self, cmd: Instruction) -> Result<i64, VmError> {
        let cond = self.stack.get(Self::operand_addr(cmd.operand))?;
        if cond.is_truthy() {
            self.exec_jump(cmd.addr)
        } else {
            Ok(0)
        }
    }

    fn exec_copy(&mut self, cmd: Instruction) -> Result<i64, VmError> {
        let src = self.stack.get(Self::operand_addr(cmd.operand))?;
        self.stack.set(cmd.addr, src)?;
        Ok(cmd.addr)
    }

    fn exec_assign(&mut self, cmd: Instruction) -> Result<i64, VmError> {
        let dst_tag = self.stack.get(cmd.addr)?.tag();
        let src = self.stack.get(Self::operand_addr(cmd.operand))?;
        self.stack.set(cmd.addr, src.cast_to(dst_tag))?;
        Ok(cmd.addr)
    }
}

/// Performs a binary arithmetic opcode, coercing both operands up to the promoted result
/// tag before applying the operator in that type's native width. Integer arithmetic
/// wraps; `Float` follows IEEE-754.
fn arithmetic(kind: ArithKind, lhs: Register, rhs: Register) -> Result<Register, VmError> {
    let tag = register::promote(lhs.tag(), rhs.tag());
    Ok(match tag {
        TypeTag::Byte => {
            let (a, b) = (lhs.as_u8(), rhs.as_u8());
            Register::Byte(match kind {
                ArithKind::Add => a.wrapping_add(b),
                ArithKind::Sub => a.wrapping_sub(b),
                ArithKind::Mult => a.wrapping_mul(b),
                ArithKind::Div => {
                    if b == 0 {
                        return Err(VmError::DivisionByZero(TypeTag::Byte));
                    }
                    a / b
                }
            })
        }
        TypeTag::UInt => {
            let (a, b) = (lhs.as_u64(), rhs.as_u64());
            Register::UInt(match kind {
                ArithKind::Add => a.wrapping_add(b),
                ArithKind::Sub => a.wrapping_sub(b),
                ArithKind::Mult => a.wrapping_mul(b),
                ArithKind::Div => {
                    if b == 0 {
                        return Err(VmError::DivisionByZero(TypeTag::UInt));
                    }
                    a / b
                }
            })
        }
        TypeTag::Int => {
            let (a, b) = (lhs.as_i64(), rhs.as_i64());
            Register::Int(match kind {
                ArithKind::Add => a.wrapping_add(b),
                ArithKind::Sub => a.wrapping_sub(b),
                ArithKind::Mult => a.wrapping_mul(b),
                ArithKind::Div => {
                    if b == 0 {
                        return Err(VmError::DivisionByZero(TypeTag::Int));
                    }
                    // Rust's `/` already truncates toward zero for signed integers.
                    a / b
                }
            })
        }
        TypeTag::Float | TypeTag::Ptr | TypeTag::Addr => {
            let (a, b) = (lhs.as_f64(), rhs.as_f64());
            Register::Float(match kind {
                ArithKind::Add => a + b,
                ArithKind::Sub => a - b,
                ArithKind::Mult => a * b,
                ArithKind::Div => a / b,
            })
        }
    })
}

/// Performs a binary bitwise opcode. Any `Float` operand is truncated toward zero to
/// `i64` first; the bit op itself is always computed in `i64` and cast back to the
/// promoted result tag.
fn bitwise(kind: BitKind, lhs: Register, rhs: Register) -> Register {
    let tag = register::promote_bitwise(lhs.tag(), rhs.tag());
    let a = lhs.as_i64();
    let b = rhs.as_i64();
    let result = match kind {
        BitKind::And => a & b,
        BitKind::Or => a | b,
        BitKind::Xor => a ^ b,
        BitKind::Rshift => a.wrapping_shr((b as u32) & 63),
        BitKind::Lshift => a.wrapping_shl((b as u32) & 63),
    };
    Register::with_tag_from_i64(tag, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{Instruction, Opcode, Operand};

    fn set_int(vm: &mut Vm, addr: i64, value: i64) {
        vm.push_cmd(Instruction::new(Opcode::SetInt, addr, Operand::Int(value), 0));
    }

    fn set_float(vm: &mut Vm, addr: i64, value: f64) {
        vm.push_cmd(Instruction::new(
            Opcode::SetFloat,
            addr,
            Operand::Float(value),
            0,
        ));
    }

    fn push3(vm: &mut Vm) {
        for _ in 0..3 {
            vm.push();
        }
    }

    #[test]
    fn sum_of_two_ints_via_builders() {
        let mut vm = Vm::new();
        push3(&mut vm);
        set_int(&mut vm, 0, 42);
        set_int(&mut vm, 1, 58);
        vm.push_cmd(Instruction::new(Opcode::Add, 0, Operand::Addr(1), 2));
        vm.run().unwrap();

        assert_eq!(vm.stack().len(), 3);
        assert_eq!(vm.get(2).unwrap(), Register::Int(100));
    }

    #[test]
    fn int_plus_float_promotes_to_float() {
        let mut vm = Vm::new();
        vm.push();
        vm.push();
        set_int(&mut vm, 0, 3);
        set_float(&mut vm, 1, 0.5);
        vm.push_cmd(Instruction::new(Opcode::Add, 0, Operand::Addr(1), 1));
        vm.run().unwrap();

        assert_eq!(vm.get(1).unwrap(), Register::Float(3.5));
    }

    #[test]
    fn loop_with_jcond_counts_up_to_the_limit() {
        // cell0 = counter, cell1 = limit, cell2 = step, cell3 = loop condition.
        //
        // 0: counter = 0
        // 1: limit = 5
        // 2: step = 1
        // 3: cond = counter < limit
        // 4: if cond, jump to 6 (body)
        // 5: otherwise fall through here and jump past the loop, to 8
        // 6: counter += step
        // 7: jump back to 3
        let mut vm = Vm::new();
        for _ in 0..4 {
            vm.push();
        }
        set_int(&mut vm, 0, 0);
        set_int(&mut vm, 1, 5);
        set_int(&mut vm, 2, 1);
        vm.push_cmd(Instruction::new(Opcode::Less, 0, Operand::Addr(1), 3));
        vm.push_cmd(Instruction::new(Opcode::Jcond, 6, Operand::Addr(3), 0));
        vm.push_cmd(Instruction::new(Opcode::Jump, 8, Operand::None, 0));
        vm.push_cmd(Instruction::new(Opcode::Add, 0, Operand::Addr(2), 0));
        vm.push_cmd(Instruction::new(Opcode::Jump, 3, Operand::None, 0));

        vm.run().unwrap();

        assert_eq!(vm.get(0).unwrap(), Register::Int(5));
        assert_eq!(vm.cmd_ptr(), vm.program().len());
    }

    #[test]
    fn stack_growth_preserves_previously_returned_indices() {
        let mut vm = Vm::new();
        let mut indices = Vec::new();
        for i in 0..1000i64 {
            let idx = vm.push();
            vm.set(idx as i64, Register::Int(i)).unwrap();
            indices.push(idx);
        }
        for (i, idx) in indices.into_iter().enumerate() {
            assert_eq!(vm.get(idx as i64).unwrap(), Register::Int(i as i64));
        }
    }

    #[test]
    fn copy_takes_the_source_tag_assign_keeps_the_destination_tag() {
        let mut vm = Vm::new();
        vm.push();
        vm.push();

        vm.set(0, Register::Float(2.5)).unwrap();
        vm.set(1, Register::Int(7)).unwrap();
        vm.execute(Instruction::new(Opcode::Copy, 0, Operand::Addr(1), 0))
            .unwrap();
        assert_eq!(vm.get(0).unwrap(), Register::Int(7));

        vm.set(0, Register::Float(2.5)).unwrap();
        vm.set(1, Register::Int(7)).unwrap();
        vm.execute(Instruction::new(Opcode::Assign, 0, Operand::Addr(1), 0))
            .unwrap();
        assert_eq!(vm.get(0).unwrap(), Register::Float(7.0));
    }

    #[test]
    fn integer_division_by_zero_is_a_fault_not_a_panic() {
        let mut vm = Vm::new();
        vm.push();
        vm.push();
        vm.push();
        vm.set(0, Register::Int(10)).unwrap();
        vm.set(1, Register::Int(0)).unwrap();
        let err = vm
            .execute(Instruction::new(Opcode::Div, 0, Operand::Addr(1), 2))
            .unwrap_err();
        assert_eq!(err, VmError::DivisionByZero(TypeTag::Int));
    }

    #[test]
    fn float_division_by_zero_follows_ieee754() {
        let mut vm = Vm::new();
        vm.push();
        vm.push();
        vm.push();
        vm.set(0, Register::Float(1.0)).unwrap();
        vm.set(1, Register::Float(0.0)).unwrap();
        vm.execute(Instruction::new(Opcode::Div, 0, Operand::Addr(1), 2))
            .unwrap();
        match vm.get(2).unwrap() {
            Register::Float(v) => assert!(v.is_infinite()),
            other => panic!("expected a float, got {:?}", other),
        }
    }

    #[test]
    fn unknown_opcode_is_advisory_by_default_and_fatal_in_strict_mode() {
        let mut vm = Vm::new();
        let garbage = Instruction {
            code: 200,
            ..Instruction::default()
        };
        assert_eq!(vm.execute(garbage).unwrap(), 0);

        vm.set_strict(true);
        assert_eq!(
            vm.execute(garbage).unwrap_err(),
            VmError::UnknownOpcode(200)
        );
    }

    #[test]
    fn not_is_logical_and_maps_float_tag_to_uint() {
        let mut vm = Vm::new();
        vm.push();
        vm.push();
        vm.set(0, Register::Float(0.0)).unwrap();
        vm.execute(Instruction::new(Opcode::Not, 0, Operand::None, 1))
            .unwrap();
        assert_eq!(vm.get(1).unwrap(), Register::UInt(1));

        vm.set(0, Register::Float(3.2)).unwrap();
        vm.execute(Instruction::new(Opcode::Not, 0, Operand::None, 1))
            .unwrap();
        assert_eq!(vm.get(1).unwrap(), Register::UInt(0));
    }

    #[test]
    fn rshift_and_lshift_are_distinct() {
        let mut vm = Vm::new();
        vm.push();
        vm.push();
        vm.push();
        vm.set(0, Register::UInt(8)).unwrap();
        vm.set(1, Register::UInt(2)).unwrap();
        vm.execute(Instruction::new(Opcode::Rshift, 0, Operand::Addr(1), 2))
            .unwrap();
        assert_eq!(vm.get(2).unwrap(), Register::UInt(2));

        vm.execute(Instruction::new(Opcode::Lshift, 0, Operand::Addr(1), 2))
            .unwrap();
        assert_eq!(vm.get(2).unwrap(), Register::UInt(32));
    }

    #[test]
    fn dump_opcodes_do_not_mutate_state() {
        let mut vm = Vm::new();
        vm.push();
        vm.set(0, Register::Int(5)).unwrap();
        vm.push_cmd(Instruction::new(Opcode::SetInt, 0, Operand::Int(5), 0));

        let before_stack = format!("{:?}", vm.stack().iter().collect::<Vec<_>>());
        let before_ptr = vm.cmd_ptr();
        vm.execute(Instruction::new(Opcode::Stack, 0, Operand::None, 0))
            .unwrap();
        vm.execute(Instruction::new(Opcode::Commands, 0, Operand::None, 0))
            .unwrap();
        let after_stack = format!("{:?}", vm.stack().iter().collect::<Vec<_>>());

        assert_eq!(before_stack, after_stack);
        assert_eq!(before_ptr, vm.cmd_ptr());
    }
}
