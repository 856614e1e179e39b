//! Container runtime availability checking.

use std::fmt;
use std::process::Command;

const INSTALL_HINT: &str = "Builds run inside containers.\n\
     Install docker and make sure the daemon is running:\n\
     \n\
       Ubuntu/Debian: sudo apt-get install docker.io\n\
       Fedora:        sudo dnf install moby-engine\n\
       Arch:          sudo pacman -S docker\n\
     \n\
     then add your user to the `docker` group or run as root.";

/// Status of the local container runtime.
#[derive(Debug, Clone)]
pub enum RuntimeStatus {
    /// Binary found and daemon answering.
    Available { server_version: String },

    /// Binary found but the daemon did not answer.
    Unreachable { message: String },

    /// No runtime binary on `PATH`.
    Missing { install_hint: String },
}

impl RuntimeStatus {
    /// Probe the `docker` binary on `PATH`.
    pub fn detect() -> Self {
        Self::detect_binary("docker")
    }

    /// Probe a specific runtime binary.
    pub fn detect_binary(binary: &str) -> Self {
        let binary_exists = Command::new("which")
            .arg(binary)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);

        if !binary_exists {
            return RuntimeStatus::Missing {
                install_hint: INSTALL_HINT.to_string(),
            };
        }

        match Command::new(binary)
            .args(["info", "--format", "{{.ServerVersion}}"])
            .output()
        {
            Ok(output) if output.status.success() => RuntimeStatus::Available {
                server_version: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            },
            Ok(output) => RuntimeStatus::Unreachable {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            },
            Err(e) => RuntimeStatus::Unreachable {
                message: e.to_string(),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, RuntimeStatus::Available { .. })
    }

    pub fn install_hint(&self) -> Option<&str> {
        match self {
            RuntimeStatus::Missing { install_hint } => Some(install_hint),
            _ => None,
        }
    }
}

impl fmt::Display for RuntimeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeStatus::Available { server_version } => {
                write!(f, "Container runtime available (server {server_version})")
            }
            RuntimeStatus::Unreachable { message } => {
                write!(f, "Container runtime unreachable: {message}")
            }
            RuntimeStatus::Missing { install_hint } => {
                write!(f, "Container runtime missing\n\n{install_hint}")
            }
        }
    }
}
