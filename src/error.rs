use thiserror::Error;

/// The error taxonomy surfaced by the VM kernel.
///
/// Most opcodes never fail, failures are advisory by default (see
/// [`Vm::set_strict`](crate::vm::Vm::set_strict)): `run` logs them and keeps going unless the
/// VM has been put into strict mode, in which case `run` halts at the faulting instruction.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum VmError {
    #[error("Invalid stack state '{0}'.")]
    Stack(#[from] StackError),
    #[error("An unsupported opcode was used {0:#04X}.")]
    UnknownOpcode(u8),
    #[error("Division by zero in a {0:?}-tagged operand.")]
    DivisionByZero(crate::register::TypeTag),
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum StackError {
    #[error("Stack is empty!")]
    Underflow,
    #[error("Index {index} is out of bounds for a vector of length {len}.")]
    OutOfBounds { index: i64, len: usize },
}
