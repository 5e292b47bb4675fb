//! Debugger application state and logic.

use crate::asm::disasm::{disassemble_instruction, format_instruction};
use crate::cpu::memory::MEMORY_SIZE;
use crate::{Cpu, MachineConfig};
use std::collections::HashSet;

/// Debugger application state.
pub struct DebuggerApp {
    /// The CPU being debugged.
    pub cpu: Cpu,
    /// Image reloaded on reset.
    pub image: Vec<u8>,
    /// Machine configuration the CPU was built from.
    pub config: MachineConfig,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<u16>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// First word address shown in the memory view.
    pub mem_scroll: usize,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded image.
    pub fn new(image: Vec<u8>, config: MachineConfig) -> Self {
        let mut app = Self {
            cpu: Cpu::from_config(&config),
            image,
            mem_scroll: config.load_address as usize,
            config,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: String::new(),
        };
        app.load();
        app
    }

    fn load(&mut self) {
        self.status = match self.cpu.load_image(&self.image, self.config.load_address) {
            Ok(()) => "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            Err(e) => format!("Load failed: {}", e),
        };
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if !self.cpu.is_running() {
            self.status = format!("CPU stopped: {:?}", self.cpu.state);
            self.running = false;
            return;
        }

        let pc = self.cpu.regs.pc();
        match self.cpu.step() {
            Ok(instr) => {
                self.status = format!("PC={:04X}: {}", pc, format_instruction(&instr));
            }
            Err(e) => {
                self.status = format!("Fault: {}", e);
                self.running = false;
            }
        }
    }

    /// Run until halt, breakpoint, or fault.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.cpu.is_running() {
            self.running = false;
            self.status = format!("{:?} after {} instructions", self.cpu.state, self.cpu.cycles);
            return;
        }

        self.step();
        self.pause_at_breakpoint();
    }

    /// Stop continuous execution when the next fetch hits a breakpoint.
    /// Resuming always executes at least one instruction first.
    fn pause_at_breakpoint(&mut self) {
        let pc = self.cpu.regs.pc();
        if self.running && self.breakpoints.contains(&pc) {
            self.running = false;
            self.status = format!("Breakpoint at PC={:04X}", pc);
        }
    }

    /// Toggle breakpoint at the current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.regs.pc();
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={:04X}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={:04X}", pc);
        }
    }

    /// Reset CPU to initial state and reload the image.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.running = false;
        self.load();
        if self.status.starts_with("Ready") {
            self.status = "Reset. Ready.".into();
        }
    }

    pub fn scroll_memory(&mut self, words: isize) {
        let max = MEMORY_SIZE - 2;
        let next = self.mem_scroll as isize + words * 2;
        self.mem_scroll = next.clamp(0, max as isize) as usize;
    }

    /// Get disassembly around the current PC: (address, text, is_current).
    pub fn get_disassembly(&self, lines: usize) -> Vec<(u16, String, bool)> {
        let pc = self.cpu.regs.pc() as usize & !1;
        let start = pc.saturating_sub(lines / 2 * 2);

        (0..lines)
            .map(|i| start + i * 2)
            .take_while(|addr| *addr < MEMORY_SIZE)
            .filter_map(|addr| {
                let word = self.cpu.mem.read_word(addr).ok()?;
                Some((addr as u16, disassemble_instruction(word), addr == pc))
            })
            .collect()
    }
}

/// Run the debugger with a program image.
pub fn run_debugger(image: Vec<u8>, config: MachineConfig) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(image, config);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => app.scroll_memory(-1),
                        KeyCode::Down => app.scroll_memory(1),
                        KeyCode::PageUp => app.scroll_memory(-16),
                        KeyCode::PageDown => app.scroll_memory(16),
                        _ => {}
                    }
                }
            }
        }

        // Tick for continuous running
        if app.running {
            for _ in 0..64 {
                app.tick();
                if !app.running {
                    break;
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}
