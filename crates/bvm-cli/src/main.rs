//! BVM - CLI
//!
//! Loads a compiled bytecode image and runs it with the standard library
//! installed.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use log::info;

use bvm_core::vm::{Snapshot, Tracer};
use bvm_core::{BytecodeLoader, Instruction, VirtualMachine, VmConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Bytecode image to execute
    #[arg(default_value = "output.bin", help = "The compiled bytecode file")]
    file: String,

    /// Print machine state to stderr after every instruction
    #[arg(long, help = "Trace stack, memory and heap per instruction")]
    trace: bool,

    /// Print the decoded program instead of executing it
    #[arg(long, help = "Dump the instruction listing")]
    disassemble: bool,

    #[arg(long, default_value_t = VmConfig::DEFAULT_MAX_STACK_SIZE)]
    max_stack: usize,

    #[arg(long, default_value_t = VmConfig::DEFAULT_MAX_CALL_DEPTH)]
    max_call_depth: usize,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let program = match BytecodeLoader::load_file(&cli.file) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if cli.disassemble {
        if let Err(e) = disassemble(&program) {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
        return;
    }

    let config = VmConfig::new()
        .with_max_stack_size(cli.max_stack)
        .with_max_call_depth(cli.max_call_depth);
    let mut vm = VirtualMachine::new(config, program);
    bvm_builtins::install(&mut vm);
    if cli.trace {
        vm.set_tracer(Box::new(StateTracer));
    }

    if let Err(e) = vm.execute() {
        eprintln!("Runtime error: {}", e);
        process::exit(1);
    }
    info!("{} finished at pc {}", cli.file, vm.pc());
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn disassemble(program: &[Instruction]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (pc, instr) in program.iter().enumerate() {
        writeln!(out, "{:>6}  {}", pc, instr)?;
    }
    Ok(())
}

/// Renders each snapshot to stderr
struct StateTracer;

impl Tracer for StateTracer {
    fn after_step(&mut self, snapshot: &Snapshot<'_>) {
        let mut err = io::stderr().lock();
        let _ = writeln!(err, "[{:>4}] {}", snapshot.pc, snapshot.instruction);

        let stack: Vec<String> = snapshot.stack.as_slice().iter().map(|v| format!("{:?}", v)).collect();
        let _ = writeln!(err, "  stack:  [{}]", stack.join(", "));

        let memory = snapshot.memory.bytes();
        if !memory.is_empty() {
            let _ = writeln!(err, "  memory: {}", hex(memory));
        }
        for (i, block) in snapshot.heap.blocks().iter().enumerate() {
            let _ = writeln!(
                err,
                "  heap[{}] {}: {}",
                i,
                block.element_type(),
                hex(block.memory().bytes())
            );
        }
        if snapshot.frame_depth > 0 {
            let _ = writeln!(err, "  frames: {}", snapshot.frame_depth);
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ")
}
