//! The definitions

/// Definitions for the program and stack storage vectors.
pub mod storage {
    /// The initial capacity handed to a freshly created [`Vm`](crate::vm::Vm)'s program vector.
    /// Zero is used as the [`DynVec`](crate::vector::DynVec) contract permits a capacity-0
    /// vector used purely as a growable stack.
    pub const PROGRAM_INITIAL_CAPACITY: usize = 0;

    /// The initial capacity handed to a freshly created [`Vm`](crate::vm::Vm)'s value stack.
    pub const STACK_INITIAL_CAPACITY: usize = 0;

    /// The factor by which a [`DynVec`](crate::vector::DynVec) grows its capacity once it is
    /// full. Growth always doubles, starting from a floor of two entries.
    pub const GROWTH_FACTOR: usize = 2;

    /// The capacity a [`DynVec`](crate::vector::DynVec) grows to the first time it extends
    /// past a capacity of zero.
    pub const GROWTH_FLOOR: usize = 2;
}

/// Definitions for the introspection dumps ([`STACK`](crate::instruction::Opcode::Stack),
/// [`COMMANDS`](crate::instruction::Opcode::Commands), [`PRINT`](crate::instruction::Opcode::Print)).
pub mod print {
    /// How many stack/program entries are rendered per dumped line.
    pub const ROW_STEP: usize = 4;

    /// The marker prefixed to the line of the [`COMMANDS`](crate::instruction::Opcode::Commands)
    /// dump that holds the instruction about to be executed (`cmd_ptr`).
    pub const CURRENT_MARKER: &str = ">";

    /// Indent used for the entries of a dump, in units of [`INDENT_FILLAMENT`].
    pub const INDENT_SIZE: usize = 1;

    /// The character repeated [`INDENT_SIZE`] times at the start of a dumped line.
    pub const INDENT_FILLAMENT: char = '\t';
}
