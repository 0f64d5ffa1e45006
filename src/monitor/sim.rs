/*
    Execution back end.

    The monitor drives whatever implements Cpu one instruction at a time.
    Sim is the built in one: just enough of the i386 encoding to run
    small test images and give the watchpoints something to watch.

    nop             90
    inc r32         40+r
    dec r32         48+r
    mov r32, imm32  b8+r id
    jmp rel8        eb cb
    trap            d6       ends the program, exit code in eax
*/
use crate::{
    log::trace,
    monitor::machine::{EFlags, Machine, MemError, R_EAX},
};

pub const TRAP_OPCODE: u8 = 0xd6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    Running,
    Trap(u32),
    Invalid { pc: u32, opcode: u8 },
}

pub trait Cpu {
    fn exec_once(&mut self, machine: &mut Machine) -> Result<ExecOutcome, MemError>;
}

pub struct Sim;

impl Sim {
    fn update_zf_sf(machine: &mut Machine, v: u32) {
        machine.regs.eflags.set(EFlags::ZF, v == 0);
        machine.regs.eflags.set(EFlags::SF, v & 0x8000_0000 != 0);
    }
}

impl Cpu for Sim {
    fn exec_once(&mut self, machine: &mut Machine) -> Result<ExecOutcome, MemError> {
        let pc = machine.regs.eip;
        let opcode = machine.mem.read(pc, 1)? as u8;
        trace!("exec {:08x}: {:02x}", pc, opcode);
        let next = match opcode {
            0x90 => pc.wrapping_add(1),
            0x40..=0x47 => {
                let r = (opcode - 0x40) as usize;
                let v = machine.regs.reg_l(r).wrapping_add(1);
                machine.regs.set_reg_l(r, v);
                Self::update_zf_sf(machine, v);
                machine.regs.eflags.set(EFlags::OF, v == 0x8000_0000);
                pc.wrapping_add(1)
            }
            0x48..=0x4f => {
                let r = (opcode - 0x48) as usize;
                let v = machine.regs.reg_l(r).wrapping_sub(1);
                machine.regs.set_reg_l(r, v);
                Self::update_zf_sf(machine, v);
                machine.regs.eflags.set(EFlags::OF, v == 0x7fff_ffff);
                pc.wrapping_add(1)
            }
            0xb8..=0xbf => {
                let imm = machine.mem.read(pc.wrapping_add(1), 4)?;
                machine.regs.set_reg_l((opcode - 0xb8) as usize, imm);
                pc.wrapping_add(5)
            }
            0xeb => {
                let rel = machine.mem.read(pc.wrapping_add(1), 1)? as u8 as i8;
                pc.wrapping_add(2).wrapping_add(rel as i32 as u32)
            }
            TRAP_OPCODE => {
                machine.regs.eip = pc.wrapping_add(1);
                return Ok(ExecOutcome::Trap(machine.regs.reg_l(R_EAX)));
            }
            _ => return Ok(ExecOutcome::Invalid { pc, opcode }),
        };
        machine.regs.eip = next;
        Ok(ExecOutcome::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::machine::IMAGE_START;

    fn machine(code: &[u8]) -> Machine {
        let mut m = Machine::new(IMAGE_START as usize + 0x100);
        m.mem.write_bytes(IMAGE_START, code).unwrap();
        m
    }

    #[test]
    fn mov_inc_dec() {
        // mov ecx, 0xffffffff; inc ecx; dec ebx
        let mut m = machine(&[0xb9, 0xff, 0xff, 0xff, 0xff, 0x41, 0x4b]);
        let mut cpu = Sim;
        assert_eq!(cpu.exec_once(&mut m), Ok(ExecOutcome::Running));
        assert_eq!(m.regs.lookup("ecx"), Some(0xffff_ffff));
        assert_eq!(m.regs.eip, IMAGE_START + 5);
        cpu.exec_once(&mut m).unwrap();
        assert_eq!(m.regs.lookup("ecx"), Some(0));
        assert!(m.regs.eflags.contains(EFlags::ZF));
        cpu.exec_once(&mut m).unwrap();
        assert_eq!(m.regs.lookup("ebx"), Some(0xffff_ffff));
        assert!(m.regs.eflags.contains(EFlags::SF));
        assert!(!m.regs.eflags.contains(EFlags::ZF));
        assert_eq!(m.regs.eip, IMAGE_START + 7);
    }

    #[test]
    fn jmp_backwards() {
        // nop; jmp -3
        let mut m = machine(&[0x90, 0xeb, 0xfd]);
        let mut cpu = Sim;
        cpu.exec_once(&mut m).unwrap();
        cpu.exec_once(&mut m).unwrap();
        assert_eq!(m.regs.eip, IMAGE_START);
    }

    #[test]
    fn trap_and_invalid() {
        let mut m = machine(&[0xb8, 0x07, 0, 0, 0, TRAP_OPCODE, 0x0f]);
        let mut cpu = Sim;
        cpu.exec_once(&mut m).unwrap();
        assert_eq!(cpu.exec_once(&mut m), Ok(ExecOutcome::Trap(7)));
        assert_eq!(
            cpu.exec_once(&mut m),
            Ok(ExecOutcome::Invalid {
                pc: IMAGE_START + 6,
                opcode: 0x0f
            })
        );
    }

    #[test]
    fn fetch_out_of_memory() {
        let mut m = Machine::new(16);
        assert!(Sim.exec_once(&mut m).is_err());
    }
}
