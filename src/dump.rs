//! Pretty-printing for the `STACK`, `COMMANDS`, and `PRINT` introspection opcodes.
use std::fmt::Write;

use crate::definitions::print::{CURRENT_MARKER, INDENT_FILLAMENT, INDENT_SIZE, ROW_STEP};
use crate::error::VmError;
use crate::instruction::Instruction;
use crate::register::Register;
use crate::vm::Vm;

fn indent_helper(line: &mut String) {
    for _ in 0..INDENT_SIZE {
        line.push(INDENT_FILLAMENT);
    }
}

/// Handles the formatting of a single [`Register`] value, independent of its tag.
mod register_print {
    use super::Register;

    pub(super) fn formatter(reg: Register) -> String {
        match reg {
            Register::Byte(v) => format!("Byte({:#04X})", v),
            Register::UInt(v) => format!("UInt({:#06X})", v),
            Register::Int(v) => format!("Int({:#06X})", v),
            Register::Float(v) => format!("Float({})", v),
            Register::Ptr(v) => format!("Ptr({:#06X})", v),
            Register::Addr(v) => format!("Addr({:#06X})", v),
        }
    }
}

/// Handles the formatting of a single [`Instruction`].
mod instruction_print {
    use super::Instruction;

    pub(super) fn formatter(instr: Instruction) -> String {
        match instr.opcode() {
            Ok(op) => format!(
                "{:?}(addr={}, operand={:?}, raddr={})",
                op, instr.addr, instr.operand, instr.raddr
            ),
            Err(code) => format!("<unknown opcode {:#04X}>", code),
        }
    }
}

/// Renders `entries` in fixed-size rows of [`ROW_STEP`], each prefixed with its absolute
/// index range. `row_prefix` picks the leading marker for a given row index, plain
/// indentation for most dumps, with the `COMMANDS` dump substituting [`CURRENT_MARKER`]
/// on the row holding `cmd_ptr`.
fn render_rows<T: Copy>(
    entries: &[T],
    format_one: impl Fn(T) -> String,
    row_prefix: impl Fn(usize) -> String,
) -> String {
    if entries.is_empty() {
        let mut out = String::new();
        indent_helper(&mut out);
        out.push_str("(empty)");
        return out;
    }

    let mut out = String::new();
    for (row_index, chunk) in entries.chunks(ROW_STEP).enumerate() {
        let from = row_index * ROW_STEP;
        let to = from + chunk.len() - 1;
        out.push_str(&row_prefix(row_index));
        let _ = write!(out, "{:04} - {:04} : ", from, to);
        let rendered: Vec<String> = chunk.iter().copied().map(&format_one).collect();
        out.push_str(&rendered.join(", "));
        out.push('\n');
    }
    out.pop();
    out
}

fn plain_prefix(_row: usize) -> String {
    let mut prefix = String::new();
    indent_helper(&mut prefix);
    prefix
}

/// `STACK`: every value register, oldest first.
pub(crate) fn dump_stack(vm: &Vm) -> String {
    let entries: Vec<Register> = vm.stack().iter().copied().collect();
    format!(
        "Stack (len={}, cap={}) {{\n{}\n}}",
        vm.stack().len(),
        vm.stack().capacity(),
        render_rows(&entries, register_print::formatter, plain_prefix)
    )
}

/// `COMMANDS`: the full program, with [`CURRENT_MARKER`] prefixed to the row containing
/// the instruction `cmd_ptr` currently points at.
pub(crate) fn dump_program(vm: &Vm) -> String {
    let entries: Vec<Instruction> = vm.program().iter().copied().collect();
    let marked_row = vm.cmd_ptr() / ROW_STEP.max(1);
    let body = render_rows(&entries, instruction_print::formatter, |row| {
        if row == marked_row {
            format!("{} ", CURRENT_MARKER)
        } else {
            plain_prefix(row)
        }
    });

    format!(
        "Commands (len={}, cmd_ptr={}) {{\n{}\n}}",
        vm.program().len(),
        vm.cmd_ptr(),
        body
    )
}

/// `PRINT addr`: a single stack register.
pub(crate) fn dump_register(vm: &Vm, addr: i64) -> Result<String, VmError> {
    let reg = vm.get(addr)?;
    Ok(format!("[{}] = {}", addr, register_print::formatter(reg)))
}
