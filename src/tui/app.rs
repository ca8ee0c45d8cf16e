//! Debugger application state and logic.

use crate::{Cpu, MachineConfig};
use crate::asm::disasm::listing;
use crate::cpu::memory::MEMORY_SIZE;
use crate::cpu::registers::SP;
use std::collections::HashSet;

/// Bytes shown per memory row.
pub const MEM_ROW_WIDTH: usize = 8;

/// Debugger application state.
pub struct DebuggerApp {
    /// The CPU being debugged.
    pub cpu: Cpu,
    /// Original program for reference.
    pub program: Vec<u8>,
    /// Config the CPU is rebuilt from on reset.
    pub config: MachineConfig,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<usize>,
    /// Everything the program has printed so far.
    pub output: Vec<u8>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset, in rows.
    pub mem_scroll: usize,
    /// PC that `run` started from; its breakpoint is skipped once.
    resume_pc: Option<usize>,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(program: Vec<u8>, config: MachineConfig) -> Self {
        let mut app = Self {
            cpu: Cpu::with_config(&config),
            program,
            config,
            breakpoints: HashSet::new(),
            output: Vec::new(),
            running: false,
            should_quit: false,
            status: String::new(),
            mem_scroll: 0,
            resume_pc: None,
        };
        app.load();
        app.status = "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into();
        app
    }

    fn load(&mut self) {
        if let Err(e) = self.cpu.load_program(&self.program) {
            self.status = format!("Load failed: {}", e);
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if !self.cpu.is_running() {
            self.status = format!("CPU stopped: {:?}", self.cpu.state);
            self.running = false;
            return;
        }

        let pc = self.cpu.pc;
        match self.cpu.step(&mut self.output) {
            Ok(instr) => {
                let disasm = crate::asm::disasm::format_instruction(&instr);
                self.status = format!("PC={:02X}: {}", pc, disasm);
            }
            Err(e) => {
                self.status = format!("Error at PC={:02X}: {}", pc, e);
                self.running = false;
            }
        }
    }

    /// Run until halt, breakpoint, or error.
    pub fn run(&mut self) {
        self.running = true;
        self.resume_pc = Some(self.cpu.pc);
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.cpu.is_running() {
            self.running = false;
            self.status = format!("{:?} after {} cycles", self.cpu.state, self.cpu.cycles);
            return;
        }

        // Check for breakpoint
        let pc = self.cpu.pc;
        let resuming = self.resume_pc.take() == Some(pc);
        if self.breakpoints.contains(&pc) && !resuming {
            self.running = false;
            self.status = format!("Breakpoint at PC={:02X}", pc);
            return;
        }

        self.step();
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={:02X}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={:02X}", pc);
        }
    }

    /// Reset CPU to initial state.
    pub fn reset(&mut self) {
        self.cpu = Cpu::with_config(&self.config);
        self.output.clear();
        self.load();
        self.running = false;
        self.resume_pc = None;
        self.status = "Reset. Ready.".into();
    }

    /// Scroll the memory view, clamped to the last row.
    pub fn scroll_memory(&mut self, delta: isize) {
        let max = MEMORY_SIZE / MEM_ROW_WIDTH - 1;
        self.mem_scroll = self.mem_scroll.saturating_add_signed(delta).min(max);
    }

    /// Printed output, one entry per PRN.
    pub fn output_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.output)
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Get disassembly around current PC as `(address, text, is_current)`.
    ///
    /// Instructions before the PC are decoded from address 0 and those from
    /// the PC onward are decoded from the PC, so the current instruction is
    /// always shown correctly even after a jump into the middle of data.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(usize, String, bool)> {
        let mem = self.cpu.mem.as_slice();
        let pc = self.cpu.pc.min(MEMORY_SIZE);

        let before = listing(&mem[..pc]);
        let after = listing(&mem[pc..]);

        let all: Vec<(usize, String, bool)> = before
            .into_iter()
            .map(|(addr, text, _)| (addr, text, false))
            .chain(
                after
                    .into_iter()
                    .map(|(offset, text, _)| (pc + offset, text, offset == 0)),
            )
            .collect();

        let current = all.iter().position(|(_, _, is_current)| *is_current).unwrap_or(0);
        let start = current.saturating_sub(lines / 2);
        all.into_iter().skip(start).take(lines).collect()
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Vec<u8>, config: MachineConfig) -> std::io::Result<()> {
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

    let mut app = DebuggerApp::new(program, config);

    // Main loop
    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
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
                        _ => {}
                    }
                }
            }
        }

        // Tick for continuous running
        if app.running {
            app.tick();
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

/// Register name as shown in the register pane.
pub fn register_label(index: u8) -> String {
    if index == SP {
        format!("R{} (SP)", index)
    } else {
        format!("R{}", index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble;

    fn app_for(source: &str) -> DebuggerApp {
        DebuggerApp::new(assemble(source).unwrap(), MachineConfig::default())
    }

    #[test]
    fn test_step_updates_status_and_output() {
        let mut app = app_for("LDI R0,8\nPRN R0\nHLT");

        app.step();
        assert_eq!(app.status, "PC=00: LDI R0,8");
        app.step();
        assert_eq!(app.output_lines(), vec!["8"]);
    }

    #[test]
    fn test_breakpoint_stops_run() {
        let mut app = app_for("LDI R0,1\nLDI R1,2\nHLT");
        app.cpu.pc = 3;
        app.toggle_breakpoint();
        app.cpu.pc = 0;

        app.run();
        for _ in 0..10 {
            app.tick();
        }

        assert!(!app.running);
        assert_eq!(app.cpu.pc, 3);
        assert!(app.status.contains("Breakpoint"));
    }

    #[test]
    fn test_run_resumes_past_breakpoint() {
        let mut app = app_for("LDI R0,1\nLDI R1,2\nPRN R1\nHLT");
        app.cpu.pc = 3;
        app.toggle_breakpoint();
        app.cpu.pc = 0;

        app.run();
        for _ in 0..10 {
            app.tick();
        }
        assert_eq!(app.cpu.pc, 3);

        app.run();
        for _ in 0..10 {
            app.tick();
        }

        assert!(app.cpu.is_halted());
        assert!(app.breakpoints.contains(&3));
        assert_eq!(app.output_lines(), vec!["2"]);
    }

    #[test]
    fn test_reset_reloads_program() {
        let mut app = app_for("LDI R0,5\nPRN R0\nHLT");
        app.run();
        for _ in 0..10 {
            app.tick();
        }
        assert!(app.cpu.is_halted());

        app.reset();
        assert!(app.cpu.is_running());
        assert!(app.output.is_empty());
        assert_eq!(app.cpu.mem.read(0).unwrap(), 0b1000_0010);
    }

    #[test]
    fn test_disassembly_marks_pc() {
        let mut app = app_for("LDI R0,8\nPRN R0\nHLT");
        app.step();

        let lines = app.get_disassembly(3);
        let current: Vec<_> = lines.iter().filter(|(_, _, cur)| *cur).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].0, 3);
        assert_eq!(current[0].1, "PRN R0");
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut app = app_for("HLT");
        app.scroll_memory(-5);
        assert_eq!(app.mem_scroll, 0);
        app.scroll_memory(1000);
        assert_eq!(app.mem_scroll, MEMORY_SIZE / MEM_ROW_WIDTH - 1);
    }
}
