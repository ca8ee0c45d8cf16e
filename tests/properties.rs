//! Property tests for instruction semantics.

use proptest::prelude::*;

use ls8::cpu::registers::SP_INIT;
use ls8::{assemble, Cpu, CpuState};

fn boot(source: &str) -> Cpu {
    let bytes = assemble(source).unwrap();
    let mut cpu = Cpu::new();
    cpu.load_program(&bytes).unwrap();
    cpu
}

fn run_source(source: &str) -> (Cpu, String) {
    let mut cpu = boot(source);
    let mut out = Vec::new();
    cpu.run(&mut out).unwrap();
    (cpu, String::from_utf8(out).unwrap())
}

proptest! {
    #[test]
    fn ldi_then_prn_emits_value(reg in 0u8..8, value: u8) {
        let mut cpu = boot(&format!("LDI R{reg},{value}\nPRN R{reg}\nHLT"));
        let mut out = Vec::new();

        cpu.step(&mut out).unwrap();
        prop_assert_eq!(cpu.pc, 3);
        prop_assert_eq!(cpu.regs.get(reg).unwrap(), value);

        cpu.run(&mut out).unwrap();
        prop_assert_eq!(String::from_utf8(out).unwrap(), format!("{value}\n"));
    }

    #[test]
    fn push_then_pop_restores_value_and_sp(src in 0u8..7, dst in 0u8..7, value: u8) {
        let (cpu, _) = run_source(&format!("LDI R{src},{value}\nPUSH R{src}\nPOP R{dst}\nHLT"));

        prop_assert_eq!(cpu.regs.get(dst).unwrap(), value);
        prop_assert_eq!(cpu.regs.sp(), SP_INIT);
    }

    #[test]
    fn add_and_mul_wrap(a: u8, b: u8) {
        let (_, out) = run_source(&format!(
            "LDI R0,{a}\nLDI R1,{b}\nLDI R2,{a}\nADD R0,R1\nMUL R2,R1\nPRN R0\nPRN R2\nHLT"
        ));

        prop_assert_eq!(out, format!("{}\n{}\n", a.wrapping_add(b), a.wrapping_mul(b)));
    }

    #[test]
    fn cmp_sets_exactly_one_flag(a: u8, b: u8) {
        let (cpu, _) = run_source(&format!("LDI R0,{a}\nLDI R1,{b}\nCMP R0,R1\nHLT"));
        let flags = cpu.flags;

        prop_assert_eq!(flags.bits().count_ones(), 1);
        prop_assert_eq!(flags.is_equal(), a == b);
        prop_assert_eq!(flags.is_greater(), a > b);
        prop_assert_eq!(flags.is_less(), a < b);
    }

    #[test]
    fn jeq_and_jne_branch_on_equality(a: u8, b: u8) {
        let source = |jump: &str| format!(
            "LDI R0,{a}\nLDI R1,{b}\nLDI R2,TAKEN\nCMP R0,R1\n{jump} R2\n\
             LDI R3,0\nPRN R3\nHLT\nTAKEN: LDI R3,1\nPRN R3\nHLT"
        );

        let (_, jeq) = run_source(&source("JEQ"));
        let (_, jne) = run_source(&source("JNE"));

        prop_assert_eq!(jeq, if a == b { "1\n" } else { "0\n" });
        prop_assert_eq!(jne, if a == b { "0\n" } else { "1\n" });
    }

    #[test]
    fn call_pushes_return_address_and_ret_restores_it(site in 0usize..200, target in 210u8..240) {
        let mut cpu = Cpu::new();
        let call = assemble("CALL R1\nHLT").unwrap();
        cpu.mem.load_program(site, &call).unwrap();
        cpu.mem.load_program(target as usize, &assemble("RET").unwrap()).unwrap();
        cpu.regs.set(1, target).unwrap();
        cpu.pc = site;
        let mut out = Vec::new();

        cpu.step(&mut out).unwrap();
        prop_assert_eq!(cpu.pc, target as usize);
        prop_assert_eq!(cpu.regs.sp(), SP_INIT - 1);
        prop_assert_eq!(cpu.mem.read(SP_INIT as usize - 1).unwrap() as usize, site + 2);

        cpu.step(&mut out).unwrap();
        prop_assert_eq!(cpu.pc, site + 2);
        prop_assert_eq!(cpu.regs.sp(), SP_INIT);

        cpu.step(&mut out).unwrap();
        prop_assert_eq!(cpu.state, CpuState::Halted);
    }

    #[test]
    fn same_bytes_behave_the_same_on_fresh_machines(bytes in prop::collection::vec(any::<u8>(), 1..64)) {
        let run = |bytes: &[u8]| {
            let mut cpu = Cpu::new();
            cpu.load_program(bytes).unwrap();
            let mut out = Vec::new();
            let result = cpu.run_limited(&mut out, 500);
            (result, out, cpu.snapshot())
        };

        let (first_result, first_out, first_state) = run(&bytes);
        let (second_result, second_out, second_state) = run(&bytes);

        prop_assert_eq!(first_result, second_result);
        prop_assert_eq!(first_out, second_out);
        prop_assert_eq!(first_state, second_state);
    }
}
