//! Everything that touches the Step Functions Local emulator itself
//!
//! - [`Installer`] fetches the emulator distribution
//! - [`EmulatorCommand`] launches it as a child process
//! - [`wait_until_port_open`] blocks until it accepts connections
//! - [`ManagementApi`] registers state machines with it

mod api;
mod install;
mod process;
mod readiness;

pub use api::{dummy_role_arn, HttpManagementApi, ManagementApi};
pub use install::{extract_archive, Installer, JAR_FILE_NAME};
pub use process::{EmulatorCommand, EmulatorProcess};
pub use readiness::wait_until_port_open;
