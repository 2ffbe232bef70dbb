#![cfg(target_family = "unix")]
use shm_latch::mmap::Mapper;
use shm_latch::SharedLatch;

/// Run `child` in a forked process and return its exit status.
fn in_child(child: impl FnOnce() -> i32) -> i32 {
    match unsafe { libc::fork() } {
        -1 => panic!("failed to fork: {}", std::io::Error::last_os_error()),
        0 => {
            let code = child();
            // Skip all destructors and exit handlers of the parent's copy.
            unsafe { libc::_exit(code) }
        }
        pid => {
            let mut status = 0;
            assert_eq!(unsafe { libc::waitpid(pid, &mut status, 0) }, pid);
            assert!(libc::WIFEXITED(status));
            libc::WEXITSTATUS(status)
        }
    }
}

#[test]
fn child_opens_anonymous_latch() {
    let latch = SharedLatch::new().unwrap();
    assert!(!latch.is_opened());

    let code = in_child(|| {
        latch.open();
        0
    });

    assert_eq!(code, 0);
    assert!(latch.is_opened());
}

#[test]
fn child_observes_parent() {
    let latch = SharedLatch::new().unwrap();
    latch.open();

    let code = in_child(|| if latch.is_opened() { 0 } else { 1 });
    assert_eq!(code, 0);
}

#[test]
fn unrelated_mapping_in_child() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latch");

    let latch = SharedLatch::with_file(&path).unwrap();
    // Allocated before forking, the child only clones the handle.
    let mapper = Mapper::new();

    // The child maps the file on its own, as an independent process would.
    let code = in_child(|| match SharedLatch::with_mapper(mapper.clone(), Some(path.as_path())) {
        Ok(own) => {
            own.open();
            0
        }
        Err(_) => 1,
    });

    assert_eq!(code, 0);
    assert!(latch.is_opened());
}
