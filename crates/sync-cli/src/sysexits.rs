//! sysexits-style process exit codes (spec.md §6, §7).

use std::process::ExitCode;

use sync_core::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Ok,
    Usage,
    NoInput,
    Internal,
    CantCreate,
    NoPerm,
    Config,
}

impl Exit {
    pub fn code(self) -> u8 {
        match self {
            Exit::Ok => 0,
            Exit::Usage => 64,
            Exit::NoInput => 66,
            Exit::Internal => 70,
            Exit::CantCreate => 73,
            Exit::NoPerm => 77,
            Exit::Config => 78,
        }
    }

    /// Classify a run-time engine failure per the taxonomy in
    /// spec.md §7. Object-store and local-I/O failures that survive
    /// to this point are internal errors; a locked state directory
    /// (another run already in progress) is also internal rather than
    /// a configuration problem, since the configuration itself was
    /// valid.
    pub fn from_engine_error(err: &EngineError) -> Self {
        match err {
            EngineError::MissingMount(_) => Exit::NoInput,
            EngineError::State(sync_state::StateError::AlreadyLocked(_)) => Exit::Internal,
            EngineError::State(sync_state::StateError::LockIo { .. }) => Exit::CantCreate,
            _ => Exit::Internal,
        }
    }
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit.code())
    }
}
