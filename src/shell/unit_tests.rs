#[cfg(test)]
mod tests {
    use crate::{
        config::MemoryConfig,
        memory::{Pid, PolicyKind, Vpn},
        shell::{Command, Session, parse},
    };

    fn session(frames: usize) -> Session {
        Session::new(MemoryConfig::new(frames, PolicyKind::Fifo).with_address_space(4)).unwrap()
    }

    #[test]
    fn parses_access_modes() {
        assert_eq!(
            parse("access 1 2").unwrap(),
            Command::Access {
                pid: Pid(1),
                vpn: Vpn(2),
                write: false
            }
        );
        assert_eq!(
            parse("ACCESS 1 2 write").unwrap(),
            Command::Access {
                pid: Pid(1),
                vpn: Vpn(2),
                write: true
            }
        );
        assert!(parse("access 1 2 execute").is_err());
    }

    #[test]
    fn parses_variadic_and_optional_arguments() {
        assert_eq!(
            parse("syscall 3 0 1 2 255").unwrap(),
            Command::Syscall {
                pid: Pid(3),
                nr: 0,
                args: vec![1, 2, 255]
            }
        );
        assert_eq!(
            parse("spawn 4").unwrap(),
            Command::Spawn {
                pid: Pid(4),
                pages: None
            }
        );
        assert_eq!(
            parse("trap 1 14 3 w").unwrap(),
            Command::Trap {
                pid: Pid(1),
                num: 14,
                fault: Some((Vpn(3), true))
            }
        );
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(parse("").is_err());
        assert!(parse("fork 1").is_err());
        assert!(parse("fork 1 two").is_err());
        assert!(parse("terminate 1 2").is_err());
        assert!(parse("write 1 0 0 256").is_err());
        assert!(parse("swap 1").is_err());
    }

    #[test]
    fn session_reports_transitions() {
        let mut shell = session(1);

        assert_eq!(shell.execute("spawn 1").unwrap(), "spawned pid 1 (4 pages)");
        assert_eq!(
            shell.execute("access 1 0 write").unwrap(),
            "pid 1 vpn 0 write: fault -> frame 0"
        );
        shell.execute("fork 1 2").unwrap();

        let out = shell.execute("access 2 1").unwrap();
        assert!(out.contains("evicted frame 0"));
        assert!(out.contains("(pid 1, vpn 0)"));
        assert!(out.contains("(pid 2, vpn 0)"));

        let table = shell.execute("table 1").unwrap();
        assert!(table.contains("vpn 0: evicted"));

        let frames = shell.execute("frames").unwrap();
        assert!(frames.starts_with("frame 0: (pid 2, vpn 1) refs=1"));
        assert!(frames.ends_with("FIFO order (next victim first): [0]"));
    }

    #[test]
    fn frames_and_table_render_shared_pages() {
        let mut shell = session(2);
        shell.execute("spawn 1").unwrap();
        shell.execute("access 1 0").unwrap();

        let frames = shell.execute("frames").unwrap();
        assert!(frames.starts_with("frame 0: (pid 1, vpn 0) refs=1\nframe 1: free"));

        shell.execute("fork 1 2").unwrap();
        let frames = shell.execute("frames").unwrap();
        assert!(frames.starts_with("frame 0: (pid 1, vpn 0) (pid 2, vpn 0) refs=2 dirty"));

        assert_eq!(
            shell.execute("table 2").unwrap(),
            "pid 2 (4 pages):\n  vpn 0: frame 0 ro cow"
        );
    }

    #[test]
    fn session_surfaces_errors() {
        let mut shell = session(2);

        let err = shell.execute("access 9 0").unwrap_err();
        assert!(err.to_string().contains("unknown process 9"));

        shell.execute("terminate 9").unwrap_err();
        shell.execute("spawn 1 2").unwrap();
        assert_eq!(shell.execute("table 1").unwrap(), "pid 1: no pages touched");

        let out = shell.execute("trap 1 14 7").unwrap();
        assert!(out.starts_with("pid 1 trap 14: killed pid 1"));
        assert!(shell.execute("stats").unwrap().starts_with("hits=0 faults=0"));
    }
}
