//! labpower-exec: Remote power execution
//!
//! Turns a logical power action plus a validated target address into a
//! parameterized invocation against one transport: the Windows `shutdown`
//! program, an SSH session, or a dry run that only logs.

pub mod addr;
pub mod dry_run;
pub mod error;
pub mod keys;
pub mod ssh;
pub mod traits;
pub mod windows;

pub use addr::{AddrError, HostAddr, Target};
pub use dry_run::DryRunExecutor;
pub use error::ExecError;
pub use keys::{KeyError, KeySource, ResolvedKey};
pub use ssh::{SshPowerExecutor, SshPowerExecutorBuilder};
pub use traits::{PowerAction, PowerExecutor};
pub use windows::{Invocation, WindowsShutdownExecutor};
