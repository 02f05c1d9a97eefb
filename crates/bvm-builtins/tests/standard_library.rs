use bvm_builtins::{install, objects, system};
use bvm_core::{HostIo, Instruction, OpCode, Value, VirtualMachine, VmConfig};

fn run_with_input(program: Vec<Instruction>, input: &str) -> (VirtualMachine, String) {
    let mut vm = VirtualMachine::new(VmConfig::new(), program);
    let (io, out) = HostIo::capture(input);
    vm.set_io(io);
    install(&mut vm);
    vm.execute().expect("execution failed");
    (vm, out.contents())
}

// Grow an empty list, then report its size and its largest element.
#[test]
fn list_grows_through_append() {
    let mut program = vec![
        Instruction::new(OpCode::BuildList, 0),
        Instruction::sentinel(OpCode::StoreMem),
    ];
    for v in [4u32, 9, 2] {
        program.push(Instruction::new(OpCode::Store, v));
        program.push(Instruction::new(OpCode::Load, 0));
        program.push(Instruction::new(OpCode::ObjCall, objects::APPEND));
    }
    program.extend([
        Instruction::new(OpCode::Load, 0),
        Instruction::new(OpCode::ObjCall, objects::SIZE),
        Instruction::new(OpCode::Load, 0),
        Instruction::new(OpCode::ObjCall, objects::MAX),
        Instruction::new(OpCode::Load, 0),
        Instruction::new(OpCode::Syscall, system::PRINT),
    ]);

    let (vm, out) = run_with_input(program, "");
    assert_eq!(out, "[4, 9, 2]");
    assert_eq!(vm.stack().as_slice(), &[Value::Int(3), Value::Int(9)]);
}

#[test]
fn scanned_word_is_echoed_lowercase() {
    let program = vec![
        Instruction::new(OpCode::Syscall, system::SCAN),
        Instruction::new(OpCode::ObjCall, objects::LOWER),
        Instruction::new(OpCode::Syscall, system::PRINT),
    ];
    let (_, out) = run_with_input(program, "LOUD quiet");
    assert_eq!(out, "loud");
}

#[test]
fn type_names_print() {
    let program = vec![
        Instruction::float(0.5),
        Instruction::new(OpCode::Syscall, system::TYPE),
        Instruction::new(OpCode::Syscall, system::PRINT),
    ];
    let (_, out) = run_with_input(program, "");
    assert_eq!(out, "FLOAT");
}

#[test]
fn to_string_then_size() {
    let program = vec![
        Instruction::new(OpCode::Store, (-120i32) as u32),
        Instruction::new(OpCode::ObjCall, objects::TO_STRING),
        Instruction::new(OpCode::ObjCall, objects::SIZE),
    ];
    let (vm, _) = run_with_input(program, "");
    assert_eq!(vm.stack().as_slice(), &[Value::Int(4)]);
}

#[test]
fn float_input_prints_in_g_form() {
    let program = vec![
        Instruction::new(OpCode::Syscall, system::GETF),
        Instruction::float(1000.0),
        Instruction::bare(OpCode::Mul),
        Instruction::new(OpCode::Syscall, system::PRINT),
    ];
    let (_, out) = run_with_input(program, "1234.5");
    assert_eq!(out, "1.2345e+06");
}
