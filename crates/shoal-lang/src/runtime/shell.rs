use std::io;
use std::process::Command;

/// Executes the text captured by a `$( … )` substitution. Synchronous and
/// blocking: the call returns once the child closes its stdout. A non-zero
/// exit status is not an error at the language level; whatever output was
/// captured is returned regardless, trailing newline included.
pub trait CommandRunner {
    fn run(&self, command: &str) -> io::Result<String>;
}

/// Runs commands through `sh -c`, the behavior scripts get by default.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &str) -> io::Result<String> {
        let output = Command::new("sh").arg("-c").arg(command).output()?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
