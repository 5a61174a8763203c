//! A pipeline that runs out of descriptors halfway through being built.
//! Kept in its own test binary because it lowers the process-wide
//! descriptor limit.

#![cfg(target_os = "linux")]

use nix::errno::Errno;
use nix::fcntl::{FcntlArg, fcntl};
use nix::sys::resource::{Resource, getrlimit, setrlimit};
use pipesh::{ArgVector, Input, Output, Pipeline, ShellError};
use std::fs::{self, File};
use std::time::{Duration, Instant};

/// Descriptors open right now, excluding the one used to list them.
fn open_fds() -> Vec<i32> {
    let listed: Vec<i32> = fs::read_dir("/proc/self/fd")
        .expect("list /proc/self/fd")
        .filter_map(|entry| entry.ok()?.file_name().to_str()?.parse().ok())
        .collect();
    listed
        .into_iter()
        .filter(|&fd| fcntl(fd, FcntlArg::F_GETFD).is_ok())
        .collect()
}

/// Smallest descriptor limit that leaves exactly `free` slots unused.
fn limit_with_free_slots(free: usize) -> u64 {
    let open = open_fds();
    let mut seen = 0;
    let mut fd = 0;
    loop {
        if !open.contains(&fd) {
            seen += 1;
            if seen == free {
                return fd as u64 + 1;
            }
        }
        fd += 1;
    }
}

fn pipeline(stages: &[&[&str]]) -> Pipeline {
    Pipeline::new(
        stages
            .iter()
            .map(|s| ArgVector::new(s.iter().copied()).unwrap())
            .collect(),
    )
    .unwrap()
}

#[test]
fn running_out_of_pipes_stops_the_pipeline_and_reaps_what_started() {
    let p = pipeline(&[
        &["yes"],
        &["cat"],
        &["cat"],
        &["head", "-n", "1"],
        &["cat"],
        &["cat"],
    ]);
    let out_path = std::env::temp_dir().join(format!("abort_tests_{}", std::process::id()));

    let before = open_fds().len();
    let out = File::create(&out_path).unwrap();
    let (soft, hard) = getrlimit(Resource::RLIMIT_NOFILE).unwrap();
    // Room for the first pipe only: `yes` starts, the second pipe fails.
    setrlimit(Resource::RLIMIT_NOFILE, limit_with_free_slots(2), hard).unwrap();

    let started = Instant::now();
    let result = p.run_with(Input::Inherit, Output::Fd(out.into()));
    let elapsed = started.elapsed();

    setrlimit(Resource::RLIMIT_NOFILE, soft, hard).unwrap();
    let after = open_fds().len();
    let _ = fs::remove_file(&out_path);

    assert!(
        matches!(result, Err(ShellError::Pipe(Errno::EMFILE))),
        "unexpected result {:?}",
        result
    );
    assert!(elapsed < Duration::from_secs(10), "abort took {:?}", elapsed);
    assert_eq!(before, after, "aborted pipeline leaked descriptors");

    // The shell keeps working once descriptors are available again.
    let out = File::create(&out_path).unwrap();
    let code = pipeline(&[&["echo", "again"], &["cat"]])
        .run_with(Input::Inherit, Output::Fd(out.into()))
        .unwrap();
    let text = fs::read_to_string(&out_path).unwrap();
    let _ = fs::remove_file(&out_path);
    assert_eq!(code, 0);
    assert_eq!(text, "again\n");
}
