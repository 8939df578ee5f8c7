use pagesim::config::MemoryConfig;
use pagesim::memory::{FrameId, PageTableEntry, Pid, PolicyKind, Vpn};
use pagesim::shell::Session;

pub struct TestShell {
    pub session: Session,
}

#[allow(dead_code)]
impl TestShell {
    pub fn new(frames: usize, policy: PolicyKind) -> Self {
        super::init_debug_for_tests();
        let config = MemoryConfig::new(frames, policy)
            .with_page_size(32)
            .with_address_space(8);
        Self {
            session: Session::new(config).unwrap(),
        }
    }

    /// Runs a command that must succeed and checks invariants afterwards.
    pub fn run(&mut self, line: &str) -> String {
        let out = self
            .session
            .execute(line)
            .unwrap_or_else(|e| panic!("'{line}' failed: {e:#}"));
        self.assert_consistent();
        out
    }

    pub fn run_err(&mut self, line: &str) -> anyhow::Error {
        let err = match self.session.execute(line) {
            Ok(out) => panic!("'{line}' should fail, got: {out}"),
            Err(err) => err,
        };
        self.assert_consistent();
        err
    }

    pub fn entry(&self, pid: u32, vpn: u64) -> PageTableEntry {
        let memory = self.session.kernel().lock().unwrap();
        memory.entry(Pid(pid), Vpn(vpn)).unwrap()
    }

    pub fn ref_count(&self, frame: usize) -> usize {
        let memory = self.session.kernel().lock().unwrap();
        memory.frame(FrameId(frame)).unwrap().ref_count()
    }

    pub fn assert_consistent(&self) {
        let memory = self.session.kernel().lock().unwrap();
        memory.check_invariants().unwrap();
        assert!(memory.store().occupied_count() <= memory.store().capacity());
    }
}
