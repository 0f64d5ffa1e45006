/*
    The emulated machine state the monitor looks at.

    - an i386 style register file: 8 gprs with their 16 and 8 bit
      aliases, eip and eflags
    - flat, byte addressable, little endian physical memory

    The expression evaluator only sees this through the Target trait.
*/
use crate::expr::eval::Target;
use bitflags::bitflags;
use std::fmt;
use thiserror::Error;

pub const PMEM_SIZE: usize = 128 * 1024 * 1024;
// images are loaded here and execution starts here
pub const IMAGE_START: u32 = 0x0010_0000;

pub const REGSL: [&str; 8] = ["eax", "ecx", "edx", "ebx", "esp", "ebp", "esi", "edi"];
pub const REGSW: [&str; 8] = ["ax", "cx", "dx", "bx", "sp", "bp", "si", "di"];
pub const REGSB: [&str; 8] = ["al", "cl", "dl", "bl", "ah", "ch", "dh", "bh"];

pub const R_EAX: usize = 0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemError {
    #[error("address {addr:#010x} (len {len}) is out of bound of pmem [0x00000000, {limit:#010x})")]
    OutOfBound { addr: u32, len: usize, limit: u32 },
}

bitflags! {
    #[derive(Copy, Clone, Default, PartialEq, Eq)]
    pub struct EFlags: u32 {
        const CF = 1 << 0;
        const ZF = 1 << 6;
        const SF = 1 << 7;
        const IF = 1 << 9;
        const OF = 1 << 11;
    }
}

impl fmt::Debug for EFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut str = String::new();
        for (flag, set, clear) in [
            (EFlags::OF, 'O', 'o'),
            (EFlags::IF, 'I', 'i'),
            (EFlags::SF, 'S', 's'),
            (EFlags::ZF, 'Z', 'z'),
            (EFlags::CF, 'C', 'c'),
        ] {
            str.push(if self.contains(flag) { set } else { clear });
        }
        write!(f, "{}", str)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registers {
    gpr: [u32; 8],
    pub eip: u32,
    pub eflags: EFlags,
}

impl Registers {
    pub fn reg_l(&self, i: usize) -> u32 {
        self.gpr[i]
    }
    pub fn reg_w(&self, i: usize) -> u16 {
        self.gpr[i] as u16
    }
    // al..bl are the low bytes of eax..ebx, ah..bh the second bytes
    pub fn reg_b(&self, i: usize) -> u8 {
        if i < 4 {
            self.gpr[i] as u8
        } else {
            (self.gpr[i - 4] >> 8) as u8
        }
    }
    pub fn set_reg_l(&mut self, i: usize, v: u32) {
        self.gpr[i] = v;
    }
    pub fn set_reg_w(&mut self, i: usize, v: u16) {
        self.gpr[i] = (self.gpr[i] & 0xffff_0000) | v as u32;
    }
    pub fn set_reg_b(&mut self, i: usize, v: u8) {
        if i < 4 {
            self.gpr[i] = (self.gpr[i] & !0xff) | v as u32;
        } else {
            self.gpr[i - 4] = (self.gpr[i - 4] & !0xff00) | ((v as u32) << 8);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<u32> {
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "eip" | "pc" => return Some(self.eip),
            "eflags" => return Some(self.eflags.bits()),
            _ => {}
        }
        if let Some(i) = REGSL.iter().position(|r| *r == name) {
            return Some(self.reg_l(i));
        }
        if let Some(i) = REGSW.iter().position(|r| *r == name) {
            return Some(self.reg_w(i) as u32);
        }
        REGSB
            .iter()
            .position(|r| *r == name)
            .map(|i| self.reg_b(i) as u32)
    }

    // writes are truncated to the width of the named register
    pub fn set(&mut self, name: &str, v: u32) -> bool {
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "eip" | "pc" => self.eip = v,
            "eflags" => self.eflags = EFlags::from_bits_retain(v),
            _ => {
                if let Some(i) = REGSL.iter().position(|r| *r == name) {
                    self.set_reg_l(i, v);
                } else if let Some(i) = REGSW.iter().position(|r| *r == name) {
                    self.set_reg_w(i, v as u16);
                } else if let Some(i) = REGSB.iter().position(|r| *r == name) {
                    self.set_reg_b(i, v as u8);
                } else {
                    return false;
                }
            }
        }
        true
    }
}

pub struct Memory {
    ram: Vec<u8>,
}

impl Memory {
    pub fn new(size: usize) -> Self {
        Self { ram: vec![0; size] }
    }
    pub fn size(&self) -> usize {
        self.ram.len()
    }
    fn check(&self, addr: u32, len: usize) -> Result<usize, MemError> {
        let start = addr as usize;
        match start.checked_add(len) {
            Some(end) if end <= self.ram.len() => Ok(start),
            _ => Err(MemError::OutOfBound {
                addr,
                len,
                limit: self.ram.len() as u32,
            }),
        }
    }
    // len is 1, 2 or 4
    pub fn read(&self, addr: u32, len: usize) -> Result<u32, MemError> {
        let start = self.check(addr, len)?;
        let mut bytes = [0u8; 4];
        bytes[..len].copy_from_slice(&self.ram[start..start + len]);
        Ok(u32::from_le_bytes(bytes))
    }
    pub fn write(&mut self, addr: u32, len: usize, val: u32) -> Result<(), MemError> {
        let start = self.check(addr, len)?;
        self.ram[start..start + len].copy_from_slice(&val.to_le_bytes()[..len]);
        Ok(())
    }
    pub fn write_bytes(&mut self, addr: u32, bytes: &[u8]) -> Result<(), MemError> {
        let start = self.check(addr, bytes.len())?;
        self.ram[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

pub struct Machine {
    pub regs: Registers,
    pub mem: Memory,
}

impl Machine {
    pub fn new(mem_size: usize) -> Self {
        let mut m = Self {
            regs: Registers::default(),
            mem: Memory::new(mem_size),
        };
        m.reset();
        m
    }
    pub fn reset(&mut self) {
        self.regs = Registers::default();
        self.regs.eip = IMAGE_START;
    }
}

impl Target for Machine {
    fn lookup_register(&self, name: &str) -> Option<u32> {
        self.regs.lookup(name)
    }
    fn read_memory(&self, addr: u32, width: usize) -> Result<u32, MemError> {
        self.mem.read(addr, width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_aliases() {
        let mut regs = Registers::default();
        regs.set_reg_l(R_EAX, 0x1234_5678);
        assert_eq!(regs.lookup("eax"), Some(0x1234_5678));
        assert_eq!(regs.lookup("ax"), Some(0x5678));
        assert_eq!(regs.lookup("al"), Some(0x78));
        assert_eq!(regs.lookup("ah"), Some(0x56));
        assert_eq!(regs.lookup("EAX"), Some(0x1234_5678));
        assert_eq!(regs.lookup("eaxx"), None);

        assert!(regs.set("ah", 0xff));
        assert_eq!(regs.reg_l(R_EAX), 0x1234_ff78);
        assert!(regs.set("ax", 0xabcd_0001));
        assert_eq!(regs.reg_l(R_EAX), 0x1234_0001);
        assert!(regs.set("bl", 7));
        assert_eq!(regs.lookup("ebx"), Some(7));
        assert!(!regs.set("xyz", 1));
    }

    #[test]
    fn eip_and_flags() {
        let mut m = Machine::new(16);
        assert_eq!(m.regs.lookup("eip"), Some(IMAGE_START));
        assert_eq!(m.regs.lookup("pc"), Some(IMAGE_START));
        m.regs.eflags = EFlags::ZF | EFlags::CF;
        assert_eq!(m.regs.lookup("eflags"), Some(0x41));
        assert_eq!(format!("{:?}", m.regs.eflags), "oisZC");
    }

    #[test]
    fn memory_little_endian() {
        let mut mem = Memory::new(16);
        mem.write(4, 4, 0xdeadbeef).unwrap();
        assert_eq!(mem.read(4, 1), Ok(0xef));
        assert_eq!(mem.read(4, 2), Ok(0xbeef));
        assert_eq!(mem.read(4, 4), Ok(0xdeadbeef));
        assert_eq!(mem.read(5, 4), Ok(0x00deadbe));
        mem.write_bytes(0, &[1, 2, 3]).unwrap();
        assert_eq!(mem.read(0, 4), Ok(0x0003_0201));
    }

    #[test]
    fn memory_bounds() {
        let mut mem = Memory::new(16);
        assert!(mem.read(12, 4).is_ok());
        assert_eq!(
            mem.read(13, 4),
            Err(MemError::OutOfBound {
                addr: 13,
                len: 4,
                limit: 16
            })
        );
        assert!(mem.read(u32::MAX, 4).is_err());
        assert!(mem.write(16, 1, 0).is_err());
        assert!(mem.write_bytes(10, &[0; 7]).is_err());
    }
}
