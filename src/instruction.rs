use crate::machine::Error;

#[inline(always)]
fn nibble_h(b: u8) -> u8 {
    (b >> 4) & 0xF
}

#[inline(always)]
fn nibble_l(b: u8) -> u8 {
    b & 0xF
}

#[inline(always)]
fn nnn(a: u8, b: u8) -> u16 {
    (((a as u16) << 8) | (b as u16)) & 0xFFF
}

/// A decoded chip-8 instruction, with its operands already extracted.
///
/// Register operands (`x`, `y`) are always in `0..=0xF`, so they can index
/// the register file directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    ClearScreen,
    /// 00EE
    Return,
    /// 1NNN
    Jump { nnn: u16 },
    /// 2NNN
    Call { nnn: u16 },
    /// 3XNN
    SkipEqImm { x: usize, nn: u8 },
    /// 4XNN
    SkipNeqImm { x: usize, nn: u8 },
    /// 5XY0
    SkipEqReg { x: usize, y: usize },
    /// 6XNN
    SetImm { x: usize, nn: u8 },
    /// 7XNN
    AddImm { x: usize, nn: u8 },
    /// 8XY0
    Set { x: usize, y: usize },
    /// 8XY1
    Or { x: usize, y: usize },
    /// 8XY2
    And { x: usize, y: usize },
    /// 8XY3
    Xor { x: usize, y: usize },
    /// 8XY4
    Add { x: usize, y: usize },
    /// 8XY5
    Sub { x: usize, y: usize },
    /// 8XY6
    ShiftRight { x: usize },
    /// 8XY7
    SubReverse { x: usize, y: usize },
    /// 8XYE
    ShiftLeft { x: usize },
    /// 9XY0
    SkipNeqReg { x: usize, y: usize },
    /// ANNN
    SetIndex { nnn: u16 },
    /// BNNN
    JumpOffset { nnn: u16 },
    /// CXNN
    Random { x: usize, nn: u8 },
    /// DXYN
    Draw { x: usize, y: usize, n: u8 },
    /// EX9E
    SkipKeyPressed { x: usize },
    /// EXA1
    SkipKeyNotPressed { x: usize },
    /// FX07
    GetDelay { x: usize },
    /// FX0A
    WaitKey { x: usize },
    /// FX15
    SetDelay { x: usize },
    /// FX18
    SetSound { x: usize },
    /// FX1E
    AddIndex { x: usize },
    /// FX29
    FontChar { x: usize },
    /// FX33
    StoreBcd { x: usize },
    /// FX55
    StoreRegisters { x: usize },
    /// FX65
    LoadRegisters { x: usize },
}

impl Instruction {
    /// Decode a big-endian instruction word.
    ///
    /// `addr` is only used to report where an invalid word was found.
    pub fn decode(opcode: u16, addr: u16) -> Result<Self, Error> {
        let [a, b] = opcode.to_be_bytes();
        let x = nibble_l(a) as usize;
        let y = nibble_h(b) as usize;
        let n = nibble_l(b);

        let instruction = match nibble_h(a) {
            0x0 if opcode == 0x00E0 => Instruction::ClearScreen,
            0x0 if opcode == 0x00EE => Instruction::Return,
            0x1 => Instruction::Jump { nnn: nnn(a, b) },
            0x2 => Instruction::Call { nnn: nnn(a, b) },
            0x3 => Instruction::SkipEqImm { x, nn: b },
            0x4 => Instruction::SkipNeqImm { x, nn: b },
            0x5 if n == 0x0 => Instruction::SkipEqReg { x, y },
            0x6 => Instruction::SetImm { x, nn: b },
            0x7 => Instruction::AddImm { x, nn: b },
            0x8 => match n {
                0x0 => Instruction::Set { x, y },
                0x1 => Instruction::Or { x, y },
                0x2 => Instruction::And { x, y },
                0x3 => Instruction::Xor { x, y },
                0x4 => Instruction::Add { x, y },
                0x5 => Instruction::Sub { x, y },
                0x6 => Instruction::ShiftRight { x },
                0x7 => Instruction::SubReverse { x, y },
                0xE => Instruction::ShiftLeft { x },
                _ => return Err(Error::InvalidInstruction { opcode, addr }),
            },
            0x9 if n == 0x0 => Instruction::SkipNeqReg { x, y },
            0xA => Instruction::SetIndex { nnn: nnn(a, b) },
            0xB => Instruction::JumpOffset { nnn: nnn(a, b) },
            0xC => Instruction::Random { x, nn: b },
            0xD => Instruction::Draw { x, y, n },
            0xE if b == 0x9E => Instruction::SkipKeyPressed { x },
            0xE if b == 0xA1 => Instruction::SkipKeyNotPressed { x },
            0xF => match b {
                0x07 => Instruction::GetDelay { x },
                0x0A => Instruction::WaitKey { x },
                0x15 => Instruction::SetDelay { x },
                0x18 => Instruction::SetSound { x },
                0x1E => Instruction::AddIndex { x },
                0x29 => Instruction::FontChar { x },
                0x33 => Instruction::StoreBcd { x },
                0x55 => Instruction::StoreRegisters { x },
                0x65 => Instruction::LoadRegisters { x },
                _ => return Err(Error::InvalidInstruction { opcode, addr }),
            },
            _ => return Err(Error::InvalidInstruction { opcode, addr }),
        };

        Ok(instruction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(opcode: u16) -> Instruction {
        Instruction::decode(opcode, 0x200).unwrap()
    }

    #[test]
    fn test_nibble() {
        let a = 0x12;
        let b = 0x34;

        assert_eq!(nibble_h(a), 0x1);
        assert_eq!(nibble_l(a), 0x2);
        assert_eq!(nibble_h(b), 0x3);
        assert_eq!(nibble_l(b), 0x4);
        assert_eq!(nnn(a, b), 0x234);
    }

    #[test]
    fn test_decode_flow_control() {
        assert_eq!(decode(0x00E0), Instruction::ClearScreen);
        assert_eq!(decode(0x00EE), Instruction::Return);
        assert_eq!(decode(0x1ABC), Instruction::Jump { nnn: 0xABC });
        assert_eq!(decode(0x2F00), Instruction::Call { nnn: 0xF00 });
        assert_eq!(decode(0xB123), Instruction::JumpOffset { nnn: 0x123 });
    }

    #[test]
    fn test_decode_operands() {
        assert_eq!(decode(0x3A42), Instruction::SkipEqImm { x: 0xA, nn: 0x42 });
        assert_eq!(decode(0x5AB0), Instruction::SkipEqReg { x: 0xA, y: 0xB });
        assert_eq!(decode(0x8124), Instruction::Add { x: 0x1, y: 0x2 });
        assert_eq!(decode(0x8F06), Instruction::ShiftRight { x: 0xF });
        assert_eq!(decode(0x83AE), Instruction::ShiftLeft { x: 0x3 });
        assert_eq!(decode(0xD125), Instruction::Draw { x: 0x1, y: 0x2, n: 0x5 });
        assert_eq!(decode(0xE79E), Instruction::SkipKeyPressed { x: 0x7 });
        assert_eq!(decode(0xE7A1), Instruction::SkipKeyNotPressed { x: 0x7 });
        assert_eq!(decode(0xFE65), Instruction::LoadRegisters { x: 0xE });
    }

    #[test]
    fn test_decode_invalid() {
        for opcode in [
            0x0000, 0x0123, 0x00E1, 0x5121, 0x8128, 0x812F, 0x9121, 0xE19F, 0xE100, 0xF100,
            0xF199,
        ] {
            assert!(matches!(
                Instruction::decode(opcode, 0x2AA),
                Err(Error::InvalidInstruction { opcode: o, addr: 0x2AA }) if o == opcode
            ));
        }
    }
}
