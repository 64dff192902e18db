//! # Test oracle
//!
//! Runs a candidate program against its unit tests by appending each test
//! line to the source and handing the result to an interpreter subprocess.
//! The subprocess gets a hard deadline; a child that outlives it is killed
//! and the candidate counted as failing.

use indexmap::IndexMap;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Oracle {
    pub interpreter: String,
    pub timeout: Duration,
}

impl Default for Oracle {
    fn default() -> Oracle {
        Oracle {
            interpreter: "python3".to_owned(),
            timeout: Duration::from_millis(1500),
        }
    }
}

impl Oracle {
    pub fn with_interpreter(interpreter: &str) -> Oracle {
        Oracle {
            interpreter: interpreter.to_owned(),
            ..Oracle::default()
        }
    }

    /// Whether `source`, extended with every test line, exits with status 0
    /// within the deadline. Spawn failures, nonzero exits, and timeouts all
    /// count as failing.
    pub fn run_tests(&self, source: &str, tests: &IndexMap<String, i32>) -> bool {
        let mut code = source.to_owned();
        if !code.ends_with('\n') {
            code.push('\n');
        }
        for test in tests.keys() {
            code.push_str(test);
            code.push('\n');
        }

        let mut child = match Command::new(&self.interpreter)
            .arg("-c")
            .arg(&code)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                log::warn!("oracle: could not spawn '{}': {}", self.interpreter, e);
                return false;
            }
        };

        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return status.success(),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        log::warn!("oracle: test run exceeded {:?}, killing", self.timeout);
                        let _ = child.kill();
                        let _ = child.wait();
                        return false;
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => {
                    log::warn!("oracle: wait failed: {}", e);
                    let _ = child.kill();
                    let _ = child.wait();
                    return false;
                }
            }
        }
    }
}
