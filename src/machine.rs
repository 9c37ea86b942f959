use std::{io::Read, ops::Range};

use log::{debug, info, trace};
use nanorand::{BufferedRng, Rng, WyRand};
use thiserror::Error;

use crate::instruction::Instruction;

// memory size
const MEM_SIZE: usize = 4096;

// start of the font data
const FONT_START: usize = 0x50;

// built-in font sprites, 5 bytes per hex digit
const FONT_DATA: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

// glyph height in bytes
const FONT_GLYPH_SIZE: usize = 5;

// maximum subroutine nesting
const STACK_SIZE: usize = 16;

// start of the area for user programs
const ADDR_START: usize = 0x200;

/// Largest ROM that fits in program memory.
pub const MAX_ROM_SIZE: usize = MEM_SIZE - ADDR_START;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// Display pixels, indexed as `[y][x]`.
pub type FrameBuffer = [[bool; DISPLAY_WIDTH]; DISPLAY_HEIGHT];

#[derive(Error, Debug)]
pub enum Error {
    #[error("ROM has {size} bytes, but only {max} bytes of program memory are available")]
    RomTooLarge { size: usize, max: usize },
    #[error("Call stack overflow on instruction at address {addr:#05X}")]
    StackOverflow { addr: u16 },
    #[error("Return with an empty call stack at address {addr:#05X}")]
    StackUnderflow { addr: u16 },
    #[error("Invalid instruction at address {addr:#05X}: {opcode:04X}")]
    InvalidInstruction { opcode: u16, addr: u16 },
    #[error("Invalid jump on instruction at address {addr:#05X}: {opcode:04X}")]
    InvalidJump { opcode: u16, addr: u16 },
    #[error("Memory access out of range ({target:#05X}) on instruction at address {addr:#05X}")]
    AddressOutOfRange { target: usize, addr: u16 },
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

/// Who decrements the delay and sound timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// Every call to [`Machine::step`] ticks both timers once.
    PerStep,
    /// The caller ticks the timers with [`Machine::tick_timers`], usually at 60Hz.
    External,
}

/// The chip-8 virtual machine.
///
/// The machine never blocks: `FX0A` leaves the program counter where it is
/// until a key is down, so the same instruction runs again on the next step.
/// Sprites wrap their origin around the display, but rows and columns that
/// fall past the right or bottom edge are clipped.
#[allow(non_snake_case)]
pub struct Machine {
    // program counter
    PC: u16,

    // full memory
    memory: [u8; MEM_SIZE],

    // data registers: V0 - VF
    V: [u8; 16],

    // address register
    I: u16,

    // subroutine stack
    stack: [u16; STACK_SIZE],
    sp: usize,

    // delay timer
    DT: u8,

    // sound timer
    ST: u8,

    display: FrameBuffer,

    // set when the display changes, cleared by the reader
    redraw: bool,

    // which keys are pressed
    keys: [bool; 16],

    timer_mode: TimerMode,

    // random number generator
    rng: BufferedRng<WyRand, 8>,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    /// Build a machine in its reset state, with a randomly seeded RNG.
    pub fn new() -> Self {
        Self::from_rng(WyRand::new())
    }

    /// Build a machine whose `CXNN` results are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(WyRand::new_seed(seed))
    }

    fn from_rng(rng: WyRand) -> Self {
        let mut machine = Machine {
            PC: ADDR_START as u16,
            memory: [0u8; MEM_SIZE],
            V: [0u8; 16],
            I: 0,
            stack: [0u16; STACK_SIZE],
            sp: 0,
            DT: 0,
            ST: 0,
            display: [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
            redraw: false,
            keys: [false; 16],
            timer_mode: TimerMode::PerStep,
            rng: BufferedRng::new(rng),
        };
        machine.reset();
        machine
    }

    /// Zero all state, reload the font and point PC at the program start.
    ///
    /// The timer mode and the RNG are not part of the machine state and survive.
    pub fn reset(&mut self) {
        self.PC = ADDR_START as u16;
        self.memory = [0u8; MEM_SIZE];
        self.V = [0u8; 16];
        self.I = 0;
        self.stack = [0u16; STACK_SIZE];
        self.sp = 0;
        self.DT = 0;
        self.ST = 0;
        self.display = [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
        self.redraw = false;
        self.keys = [false; 16];

        // load the font data
        let font_area = &mut self.memory[FONT_START..FONT_START + FONT_DATA.len()];
        font_area.copy_from_slice(&FONT_DATA[..]);

        debug!("Machine reset");
    }

    /// Copy a program into memory at 0x200. Nothing else is touched.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), Error> {
        if program.len() > MAX_ROM_SIZE {
            return Err(Error::RomTooLarge {
                size: program.len(),
                max: MAX_ROM_SIZE,
            });
        }

        self.memory[ADDR_START..ADDR_START + program.len()].copy_from_slice(program);
        info!("Loaded ROM [size: {}]", program.len());
        Ok(())
    }

    /// Read a whole ROM from `rom` and load it with [`Machine::load_program`].
    pub fn load_rom<T>(&mut self, mut rom: T) -> Result<(), Error>
    where
        T: Read,
    {
        let mut program = Vec::with_capacity(MAX_ROM_SIZE);
        rom.read_to_end(&mut program)?;
        self.load_program(&program)
    }

    pub fn set_timer_mode(&mut self, mode: TimerMode) {
        self.timer_mode = mode;
    }

    pub fn timer_mode(&self) -> TimerMode {
        self.timer_mode
    }

    pub fn set_key(&mut self, key: u8, state: bool) {
        self.keys[(key & 0xF) as usize] = state;
    }

    pub fn is_key_pressed(&self, key: u8) -> bool {
        self.keys[(key & 0xF) as usize]
    }

    fn get_pressed_key(&self) -> Option<u8> {
        self.keys
            .iter()
            .position(|state| *state)
            .map(|index| index as u8)
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> bool {
        self.display[y % DISPLAY_HEIGHT][x % DISPLAY_WIDTH]
    }

    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.display
    }

    /// Whether the display changed since the last call.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::replace(&mut self.redraw, false)
    }

    /// The tone should play while this is true.
    pub fn sound_active(&self) -> bool {
        self.ST > 0
    }

    pub fn pc(&self) -> u16 {
        self.PC
    }

    pub fn i(&self) -> u16 {
        self.I
    }

    pub fn v(&self, register: usize) -> u8 {
        self.V[register & 0xF]
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn delay_timer(&self) -> u8 {
        self.DT
    }

    pub fn sound_timer(&self) -> u8 {
        self.ST
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory[..]
    }

    /// Decrement both timers toward zero.
    pub fn tick_timers(&mut self) {
        self.DT = self.DT.saturating_sub(1);
        self.ST = self.ST.saturating_sub(1);
    }

    // checked memory range for the instruction at `addr`
    fn mem_range(&self, start: usize, len: usize, addr: u16) -> Result<Range<usize>, Error> {
        if start + len > MEM_SIZE {
            return Err(Error::AddressOutOfRange {
                target: start + len - 1,
                addr,
            });
        }
        Ok(start..start + len)
    }

    /// Execute a single chip-8 CPU cycle: fetch, decode, execute and (in
    /// [`TimerMode::PerStep`]) tick the timers.
    ///
    /// On error, the machine is left exactly as it was before the call.
    pub fn step(&mut self) -> Result<(), Error> {
        let addr = self.PC;

        // read a command
        let fetch = self.mem_range(addr as usize, 2, addr)?;
        let opcode = u16::from_be_bytes([self.memory[fetch.start], self.memory[fetch.start + 1]]);

        let instruction = Instruction::decode(opcode, addr)?;
        trace!("{:#05X}: {:04X} {:?}", addr, opcode, instruction);
        self.execute(instruction, opcode)?;

        if self.timer_mode == TimerMode::PerStep {
            self.tick_timers();
        }

        Ok(())
    }

    fn skip_if(&mut self, condition: bool) {
        self.PC += if condition { 4 } else { 2 };
    }

    fn execute(&mut self, instruction: Instruction, opcode: u16) -> Result<(), Error> {
        let addr = self.PC;

        match instruction {
            Instruction::ClearScreen => {
                self.display = [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
                self.redraw = true;
                self.PC += 2;
            }
            // return address is the call itself, so step over it
            Instruction::Return => {
                if self.sp == 0 {
                    return Err(Error::StackUnderflow { addr });
                }
                self.sp -= 1;
                self.PC = self.stack[self.sp] + 2;
                debug!("Return to {:#05X} [depth: {}]", self.PC, self.sp);
            }
            Instruction::Jump { nnn } => {
                self.PC = nnn;
            }
            Instruction::Call { nnn } => {
                if self.sp == STACK_SIZE {
                    return Err(Error::StackOverflow { addr });
                }
                self.stack[self.sp] = addr;
                self.sp += 1;
                self.PC = nnn;
                debug!("Call {:#05X} [depth: {}]", nnn, self.sp);
            }
            Instruction::SkipEqImm { x, nn } => {
                self.skip_if(self.V[x] == nn);
            }
            Instruction::SkipNeqImm { x, nn } => {
                self.skip_if(self.V[x] != nn);
            }
            Instruction::SkipEqReg { x, y } => {
                self.skip_if(self.V[x] == self.V[y]);
            }
            Instruction::SetImm { x, nn } => {
                self.V[x] = nn;
                self.PC += 2;
            }
            // no carry flag
            Instruction::AddImm { x, nn } => {
                self.V[x] = self.V[x].wrapping_add(nn);
                self.PC += 2;
            }
            Instruction::Set { x, y } => {
                self.V[x] = self.V[y];
                self.PC += 2;
            }
            Instruction::Or { x, y } => {
                self.V[x] |= self.V[y];
                self.PC += 2;
            }
            Instruction::And { x, y } => {
                self.V[x] &= self.V[y];
                self.PC += 2;
            }
            Instruction::Xor { x, y } => {
                self.V[x] ^= self.V[y];
                self.PC += 2;
            }
            // VX first, then the carry, so 8FY4 leaves the carry in VF
            Instruction::Add { x, y } => {
                let (result, carry) = self.V[x].overflowing_add(self.V[y]);
                self.V[x] = result;
                self.V[0xF] = carry as u8;
                self.PC += 2;
            }
            // flag is "no borrow" and is written before the result
            Instruction::Sub { x, y } => {
                let (vx, vy) = (self.V[x], self.V[y]);
                self.V[0xF] = (vx >= vy) as u8;
                self.V[x] = vx.wrapping_sub(vy);
                self.PC += 2;
            }
            Instruction::ShiftRight { x } => {
                let vx = self.V[x];
                self.V[0xF] = vx & 1;
                self.V[x] = vx >> 1;
                self.PC += 2;
            }
            Instruction::SubReverse { x, y } => {
                let (vx, vy) = (self.V[x], self.V[y]);
                self.V[0xF] = (vy >= vx) as u8;
                self.V[x] = vy.wrapping_sub(vx);
                self.PC += 2;
            }
            Instruction::ShiftLeft { x } => {
                let vx = self.V[x];
                self.V[0xF] = vx >> 7;
                self.V[x] = vx << 1;
                self.PC += 2;
            }
            Instruction::SkipNeqReg { x, y } => {
                self.skip_if(self.V[x] != self.V[y]);
            }
            Instruction::SetIndex { nnn } => {
                self.I = nnn;
                self.PC += 2;
            }
            Instruction::JumpOffset { nnn } => {
                let target = nnn + self.V[0x0] as u16;
                if target as usize >= MEM_SIZE {
                    return Err(Error::InvalidJump { opcode, addr });
                }
                self.PC = target;
            }
            Instruction::Random { x, nn } => {
                let mut n = [0u8; 1];
                self.rng.fill(&mut n);
                self.V[x] = n[0] & nn;
                self.PC += 2;
            }
            Instruction::Draw { x, y, n } => {
                let rows = self.mem_range(self.I as usize, n as usize, addr)?;
                let origin_x = self.V[x] as usize % DISPLAY_WIDTH;
                let origin_y = self.V[y] as usize % DISPLAY_HEIGHT;
                let mut collision = false;

                for (row, sprite) in self.memory[rows].iter().enumerate() {
                    let py = origin_y + row;
                    if py >= DISPLAY_HEIGHT {
                        break;
                    }
                    for col in 0..8 {
                        let px = origin_x + col;
                        if px >= DISPLAY_WIDTH {
                            break;
                        }
                        if sprite & (0x80 >> col) != 0 {
                            let pixel = &mut self.display[py][px];
                            collision |= *pixel;
                            *pixel = !*pixel;
                        }
                    }
                }

                self.V[0xF] = collision as u8;
                self.redraw = true;
                self.PC += 2;
            }
            Instruction::SkipKeyPressed { x } => {
                self.skip_if(self.is_key_pressed(self.V[x]));
            }
            Instruction::SkipKeyNotPressed { x } => {
                self.skip_if(!self.is_key_pressed(self.V[x]));
            }
            Instruction::GetDelay { x } => {
                self.V[x] = self.DT;
                self.PC += 2;
            }
            // PC stays put until a key is down
            Instruction::WaitKey { x } => {
                if let Some(key) = self.get_pressed_key() {
                    self.V[x] = key;
                    self.PC += 2;
                }
            }
            Instruction::SetDelay { x } => {
                self.DT = self.V[x];
                self.PC += 2;
            }
            Instruction::SetSound { x } => {
                self.ST = self.V[x];
                self.PC += 2;
            }
            Instruction::AddIndex { x } => {
                self.I = self.I.wrapping_add(self.V[x] as u16);
                self.PC += 2;
            }
            Instruction::FontChar { x } => {
                let digit = (self.V[x] & 0xF) as usize;
                self.I = (FONT_START + digit * FONT_GLYPH_SIZE) as u16;
                self.PC += 2;
            }
            Instruction::StoreBcd { x } => {
                let range = self.mem_range(self.I as usize, 3, addr)?;
                let value = self.V[x];
                self.memory[range].copy_from_slice(&[value / 100, value / 10 % 10, value % 10]);
                self.PC += 2;
            }
            // I is left untouched
            Instruction::StoreRegisters { x } => {
                let range = self.mem_range(self.I as usize, x + 1, addr)?;
                self.memory[range].copy_from_slice(&self.V[0..=x]);
                self.PC += 2;
            }
            Instruction::LoadRegisters { x } => {
                let range = self.mem_range(self.I as usize, x + 1, addr)?;
                self.V[0..=x].copy_from_slice(&self.memory[range]);
                self.PC += 2;
            }
        }

        Ok(())
    }
}
