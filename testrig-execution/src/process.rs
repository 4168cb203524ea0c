//! Process table access on the agent host

use sysinfo::{ProcessesToUpdate, System};

/// Minimal process control surface needed by the agent.
///
/// Image names are matched case-insensitively, so `TestBench.exe` in a
/// configuration finds `testbench.exe` in the process table.
pub trait ProcessControl: Send + Sync {
    /// Names of running processes matching the image name.
    fn list(&self, image: &str) -> Vec<String>;

    /// Kill every process matching the image name, returning how many
    /// kill signals were delivered.
    fn kill(&self, image: &str) -> usize;
}

/// [`ProcessControl`] backed by the live system process table.
#[derive(Debug, Default)]
pub struct SystemProcessControl;

impl SystemProcessControl {
    fn refreshed() -> System {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);
        system
    }
}

impl ProcessControl for SystemProcessControl {
    fn list(&self, image: &str) -> Vec<String> {
        Self::refreshed()
            .processes()
            .values()
            .filter(|process| process.name().eq_ignore_ascii_case(image))
            .map(|process| process.name().to_string_lossy().into_owned())
            .collect()
    }

    fn kill(&self, image: &str) -> usize {
        Self::refreshed()
            .processes()
            .values()
            .filter(|process| process.name().eq_ignore_ascii_case(image))
            .filter(|process| process.kill())
            .count()
    }
}
