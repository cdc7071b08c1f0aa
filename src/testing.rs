//! Test doubles shared by unit tests across modules.

use crate::launcher::{LaunchError, LaunchSpec, Launcher, ServerProcess};
use std::io::Write;
use std::sync::{Arc, Mutex};

/// A `Write` sink whose contents can be read back after it has been moved
/// into a reporter.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Process operations observed by `FakeLauncher`, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Spawn(u32),
    Kill(u32),
}

/// Launcher that hands out numbered fake processes and records every call.
#[derive(Debug, Clone, Default)]
pub struct FakeLauncher {
    calls: Arc<Mutex<Vec<Call>>>,
    next_pid: u32,
    fail: bool,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            next_pid: 100,
            ..Default::default()
        }
    }

    /// A launcher whose every spawn fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn spawns(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Spawn(_)))
            .count()
    }

    pub fn kills(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Kill(_)))
            .count()
    }
}

impl Launcher for FakeLauncher {
    type Process = FakeProcess;

    fn launch(&mut self, spec: &LaunchSpec) -> Result<FakeProcess, LaunchError> {
        if self.fail {
            return Err(LaunchError::Spawn {
                program: spec.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            });
        }
        let pid = self.next_pid;
        self.next_pid += 1;
        self.calls.lock().unwrap().push(Call::Spawn(pid));
        Ok(FakeProcess {
            pid,
            calls: Arc::clone(&self.calls),
        })
    }
}

#[derive(Debug)]
pub struct FakeProcess {
    pid: u32,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ServerProcess for FakeProcess {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn terminate(&mut self) {
        self.calls.lock().unwrap().push(Call::Kill(self.pid));
    }
}
