//! F4F Emulator - CLI Entry Point
//!
//! Commands:
//! - `f4f-emu run <program>` - Run an image or ASM file
//! - `f4f-emu debug <program>` - Interactive debugger
//! - `f4f-emu asm <source>` - Assemble to a binary image
//! - `f4f-emu disasm <image>` - Disassemble a binary image
//! - `f4f-emu test` - Built-in self-test

use clap::{ArgAction, Parser, Subcommand};
use f4f::MachineConfig;

#[derive(Parser)]
#[command(name = "f4f-emu")]
#[command(version = "0.1.0")]
#[command(about = "An emulator of the F4F 16-bit teaching instruction set")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Machine configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Number of general-purpose registers (overrides the config file)
    #[arg(long, global = true)]
    registers: Option<usize>,

    /// Load address, decimal or 0x-prefixed hex (overrides the config file)
    #[arg(long, global = true, value_parser = parse_address)]
    start: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts or faults
    Run {
        /// Path to the image or ASM file to execute
        program: String,
        /// Maximum number of instructions to run
        #[arg(short, long, default_value = "100000")]
        max_cycles: u64,
        /// Print the machine state after every instruction
        #[arg(short, long)]
        trace: bool,
        /// Print the final state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive debugger
    Debug {
        /// Path to the image or ASM file to debug
        program: String,
    },
    /// Assemble source to a binary image
    Asm {
        /// Path to the source file
        source: String,
        /// Output image file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble a binary image
    Disasm {
        /// Path to the image file
        image: String,
    },
    /// Run the built-in self-test
    Test,
}

fn parse_address(text: &str) -> Result<u16, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => text.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", text, e))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    if let Err(e) = simple_logger::SimpleLogger::new().with_level(level).init() {
        eprintln!("warning: logger unavailable: {}", e);
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match machine_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Run { program, max_cycles, trace, json }) => {
            run_program(&program, &config, max_cycles, trace, json);
        }
        Some(Commands::Debug { program }) => {
            debug_program(&program, &config);
        }
        Some(Commands::Asm { source, output }) => {
            assemble_file(&source, output, &config);
        }
        Some(Commands::Disasm { image }) => {
            disassemble_file(&image, &config);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("F4F Emulator v0.1.0");
            println!("A 16-bit teaching instruction set emulator");
            println!();
            println!("Use --help for available commands");
        }
    }
}

/// Combine the config file with command-line overrides.
fn machine_config(cli: &Cli) -> Result<MachineConfig, f4f::ConfigError> {
    let mut config = match &cli.config {
        Some(path) => MachineConfig::from_json_file(path)?,
        None => MachineConfig::default(),
    };
    if let Some(registers) = cli.registers {
        config.registers = registers;
    }
    if let Some(start) = cli.start {
        config.load_address = start;
    }
    config.validate()?;
    Ok(config)
}

/// Read a program: `.asm` files are assembled, anything else is a raw image.
fn read_program(path: &str, config: &MachineConfig) -> Vec<u8> {
    use f4f::asm::{assemble_at, load_image_file, words_to_bytes};

    if path.ends_with(".asm") {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("❌ Failed to read file: {}", e);
                std::process::exit(1);
            }
        };

        match assemble_at(&source, config.load_address) {
            Ok(words) => {
                println!("📝 Assembled {} words", words.len());
                words_to_bytes(&words)
            }
            Err(e) => {
                eprintln!("❌ Assembly error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        match load_image_file(path) {
            Ok(bytes) => {
                println!("📂 Loaded {} bytes", bytes.len());
                bytes
            }
            Err(e) => {
                eprintln!("❌ Failed to load image: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run_program(path: &str, config: &MachineConfig, max_cycles: u64, trace: bool, json: bool) {
    use f4f::asm::disasm::format_instruction;
    use f4f::Cpu;

    println!("🔧 Running: {}", path);
    let image = read_program(path, config);

    let mut cpu = Cpu::from_config(config);
    if let Err(e) = cpu.load_image(&image, config.load_address) {
        eprintln!("❌ Failed to load program: {}", e);
        std::process::exit(1);
    }

    println!();
    println!("━━━ Execution ━━━");

    let mut cycles = 0u64;
    let mut failed = false;
    while cpu.is_running() && cycles < max_cycles {
        let pc = cpu.regs.pc();

        match cpu.step() {
            Ok(instr) => {
                if trace {
                    println!("{:04X}: {:<20} {}", pc, format_instruction(&instr), state_line(&cpu));
                }
                cycles += 1;
            }
            Err(e) => {
                eprintln!("❌ {}", e);
                failed = true;
                break;
            }
        }
    }

    println!();
    println!("━━━ Result ━━━");
    if json {
        match serde_json::to_string_pretty(&cpu.snapshot()) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("❌ Failed to serialize state: {}", e),
        }
    } else {
        println!("Cycles: {}", cycles);
        println!("State: {:?}", cpu.state);
        println!("{}", state_line(&cpu));
        if let Some(record) = cpu.fault() {
            println!("Fault: {} ({}) at PC={:#06x}", record.fault.kind(), record.fault, record.pc);
        }
    }

    if cycles >= max_cycles && cpu.is_running() {
        println!();
        println!("⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.", max_cycles);
    }

    if failed {
        std::process::exit(1);
    }
}

/// One-line register dump: PC, general-purpose registers and flags.
fn state_line(cpu: &f4f::Cpu) -> String {
    let snap = cpu.snapshot();
    let regs: Vec<String> = snap
        .registers
        .iter()
        .enumerate()
        .map(|(i, v)| format!("R{}={:04X}", i, v))
        .collect();
    format!("PC={:04X} {} SR={}", snap.pc, regs.join(" "), snap.flags)
}

#[cfg(feature = "tui")]
fn debug_program(path: &str, config: &MachineConfig) {
    use f4f::tui::run_debugger;

    println!("🔍 Loading: {}", path);
    let image = read_program(path, config);

    println!("🚀 Launching debugger...");
    println!();

    if let Err(e) = run_debugger(image, config.clone()) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &str, _config: &MachineConfig) {
    eprintln!("❌ The debugger needs the `tui` feature");
    std::process::exit(1);
}

fn assemble_file(source_path: &str, output: Option<String>, config: &MachineConfig) {
    use f4f::asm::{assemble_at, save_image_file, words_to_bytes};

    let out_path = output.unwrap_or_else(|| source_path.replace(".asm", ".bin"));

    println!("📝 Assembling: {} → {}", source_path, out_path);

    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    let words = match assemble_at(&source, config.load_address) {
        Ok(words) => words,
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            std::process::exit(1);
        }
    };

    println!("✓ Assembled {} words", words.len());

    if let Err(e) = save_image_file(&out_path, &words_to_bytes(&words)) {
        eprintln!("❌ Failed to save image: {}", e);
        std::process::exit(1);
    }

    println!("✓ Saved to {}", out_path);
}

fn disassemble_file(image_path: &str, config: &MachineConfig) {
    use f4f::asm::{bytes_to_words, disassemble, load_image_file};

    println!("📖 Disassembling: {}", image_path);
    println!();

    let bytes = match load_image_file(image_path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("❌ Failed to load image: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", disassemble(&bytes_to_words(&bytes), config.load_address));
}

fn run_self_test() {
    use f4f::asm::{assemble, words_to_bytes};
    use f4f::cpu::{alu, Fault, IllegalReason};
    use f4f::{Cpu, CpuError};

    println!("━━━ F4F Emulator Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    let mut check = |name: &str, ok: bool| {
        print!("{}... ", name);
        if ok {
            println!("✓");
            passed += 1;
        } else {
            println!("✗");
            failed += 1;
        }
    };

    let (sum, flags) = alu::add(0xFFFF, 20);
    check("Add wraps with carry", sum == 19 && flags.carry && !flags.overflow);

    let (diff, flags) = alu::sub(0x8000, 1);
    check("Sub signed overflow", diff == 0x7FFF && flags.overflow);

    let mut cpu = Cpu::new();
    check("Misaligned word read", cpu.mem.read_word(13) == Err(Fault::Misaligned { addr: 13 }));
    check(
        "Image past top of memory",
        matches!(cpu.load_image(&[0; 4], 0xFFFD), Err(Fault::OutOfBound { .. })),
    );

    let program = assemble("lui r1, 0x35\naddi r1, 0x7f\nhalt").unwrap_or_default();
    let mut cpu = Cpu::new();
    let ran = cpu.load_image(&words_to_bytes(&program), 0xC000).is_ok() && cpu.run().is_ok();
    check("Build 16-bit constant", ran && cpu.regs.get(1) == Ok(0x357F));

    let mut cpu = Cpu::new();
    let loaded = cpu.load_image(&[0x00, 0x00], 0xC000).is_ok();
    let result = cpu.run();
    check(
        "Unmapped opcode faults",
        loaded
            && result
                == Err(CpuError::Fault {
                    pc: 0xC000,
                    fault: Fault::IllegalInstruction(IllegalReason::Opcode(0)),
                })
            && cpu.is_faulted(),
    );

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
