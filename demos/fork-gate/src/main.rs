//! Fork workers first, let them start their real work only once the parent decides so.
use std::time::Duration;

use shm_latch::SharedLatch;

fn main() {
    let workers = std::env::args()
        .nth(1)
        .map_or(4, |num| num.parse().expect("number of workers"));

    let delay = std::env::args()
        .nth(2)
        .map_or(200, |num| num.parse().expect("delay in milliseconds"));

    let latch = match std::env::args_os().nth(3) {
        Some(path) => SharedLatch::with_file(path),
        None => SharedLatch::new(),
    }
    .expect("failed to create latch");

    let mut children = vec![];
    for id in 0..workers {
        match unsafe { libc::fork() } {
            -1 => panic!("failed to fork: {}", std::io::Error::last_os_error()),
            0 => {
                let polls = run_worker(&latch);
                eprintln!("worker {id} started after {polls} polls");
                unsafe { libc::_exit(0) }
            }
            pid => children.push(pid),
        }
    }

    eprintln!("forked {} workers, opening latch in {delay}ms", children.len());
    std::thread::sleep(Duration::from_millis(delay));
    latch.open();

    for pid in children {
        let mut status = 0;
        if -1 == unsafe { libc::waitpid(pid, &mut status, 0) } {
            panic!("failed to wait for {pid}: {}", std::io::Error::last_os_error());
        }
    }
}

fn run_worker(latch: &SharedLatch) -> u64 {
    let mut polls = 0;

    while !latch.is_opened() {
        polls += 1;
        std::thread::sleep(Duration::from_millis(10));
    }

    polls
}
