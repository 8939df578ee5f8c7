mod helpers;

use std::thread;

use helpers::init_debug_for_tests;
use pagesim::config::MemoryConfig;
use pagesim::kernel::{Kernel, Syscall, Trap, TrapOutcome};
use pagesim::memory::{Pid, PolicyKind, Vpn};
use rand::{Rng, SeedableRng, rngs::StdRng};

#[test]
fn parallel_processes_share_one_memory() {
    init_debug_for_tests();
    let kernel = Kernel::new(MemoryConfig::new(3, PolicyKind::Lru).with_address_space(6)).unwrap();

    const THREADS: u32 = 4;
    const ACCESSES: u64 = 300;

    for pid in 1..=THREADS {
        kernel.spawn(Pid(pid), None).unwrap();
    }

    thread::scope(|scope| {
        for pid in 1..=THREADS {
            let kernel = &kernel;
            scope.spawn(move || {
                let mut rng = StdRng::seed_from_u64(pid as u64);
                for _ in 0..ACCESSES {
                    let vpn = Vpn(rng.random_range(0..6));
                    let write = rng.random_bool(0.3);
                    kernel.access(Pid(pid), vpn, write).unwrap();
                }
            });
        }
    });

    let memory = kernel.lock().unwrap();
    memory.check_invariants().unwrap();

    let stats = memory.stats();
    assert_eq!(stats.hits + stats.faults, THREADS as u64 * ACCESSES);
    assert_eq!(stats.faults, stats.evictions + 3);
}

#[test]
fn syscalls_registered_at_runtime_dispatch() {
    let mut kernel = Kernel::new(MemoryConfig::new(2, PolicyKind::Fifo)).unwrap();
    kernel.spawn(Pid(1), Some(4)).unwrap();

    kernel.syscalls_mut().register(10, Syscall::Read).unwrap();
    assert!(kernel.syscalls_mut().register(64, Syscall::Read).is_err());

    kernel.syscall(Pid(1), 0, &[1, 0, 9]).unwrap();
    let ret = kernel.syscall(Pid(1), 10, &[1, 0]).unwrap();
    assert_eq!(ret.to_string(), "read 9 (hit frame 0)");
}

#[test]
fn traps_resolve_or_kill() {
    let kernel = Kernel::new(MemoryConfig::new(2, PolicyKind::Fifo)).unwrap();
    kernel.spawn(Pid(1), Some(2)).unwrap();

    let outcome = kernel
        .trap(
            Pid(1),
            Trap::PageFault {
                vpn: Vpn(1),
                write: true,
            },
        )
        .unwrap();
    assert!(matches!(outcome, TrapOutcome::Resolved(_)));

    let outcome = kernel.trap(Pid(1), Trap::DivideByZero).unwrap();
    assert_eq!(
        outcome,
        TrapOutcome::Killed {
            pid: Pid(1),
            reason: "divide by zero".into()
        }
    );

    let memory = kernel.lock().unwrap();
    assert_eq!(memory.store().occupied_count(), 0);
    memory.check_invariants().unwrap();
}
