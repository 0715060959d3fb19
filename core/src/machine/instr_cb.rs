//! The `CB`-prefixed opcode table (`spec.md` §4.9).
//!
//! Every `CB` opcode is `op[7:6]` selecting the operation group, `op[5:3]`
//! selecting either a bit index (`BIT`/`RES`/`SET`) or a shift/rotate
//! variant, and `op[2:0]` selecting the `r8` operand — the same register
//! encoding, and the same `read_r8`/`write_r8` trick for `(HL)` timing, as
//! the unprefixed table.

use super::{
    instr::{op_bit, op_res, op_rl, op_rlc, op_rr, op_rrc, op_set, op_sla, op_sra, op_srl, op_swap, read_r8, write_r8},
    Machine,
};
use crate::env::Display;

pub(crate) fn execute(m: &mut Machine, op_code: u8, display: &mut dyn Display) {
    let r8_idx = op_code & 0x7;
    let group_idx = (op_code >> 3) & 0x7;

    match op_code >> 6 {
        0b00 => {
            let v = read_r8(m, r8_idx, display);
            let result = match group_idx {
                0 => op_rlc(&mut m.cpu, v, false),
                1 => op_rrc(&mut m.cpu, v, false),
                2 => op_rl(&mut m.cpu, v, false),
                3 => op_rr(&mut m.cpu, v, false),
                4 => op_sla(&mut m.cpu, v),
                5 => op_sra(&mut m.cpu, v),
                6 => op_swap(&mut m.cpu, v),
                7 => op_srl(&mut m.cpu, v),
                _ => unreachable!(),
            };
            write_r8(m, r8_idx, result, display);
        }
        0b01 => {
            let v = read_r8(m, r8_idx, display);
            op_bit(&mut m.cpu, group_idx, v);
        }
        0b10 => {
            let v = read_r8(m, r8_idx, display);
            let result = op_res(group_idx, v);
            write_r8(m, r8_idx, result, display);
        }
        0b11 => {
            let v = read_r8(m, r8_idx, display);
            let result = op_set(group_idx, v);
            write_r8(m, r8_idx, result, display);
        }
        _ => unreachable!(),
    }
}
