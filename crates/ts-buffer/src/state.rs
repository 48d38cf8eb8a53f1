//! Per-chunk activity state machine.
//!
//! A chunk is touched by at most one write role and one read role at a
//! time. Their combination is tracked as an explicit [`Activity`] value so
//! that the transitions below are the only way to change it:
//!
//! | from          | open read     | close read | open write   | close write |
//! |---------------|---------------|------------|--------------|-------------|
//! | Idle          | ReadOnly      | Idle       | WriteOnly    | Idle        |
//! | ReadOnly      | ReadOnly      | Idle       | **rejected** | ReadOnly    |
//! | WriteOnly     | ReadAndWrite  | WriteOnly  | WriteOnly    | Idle        |
//! | ReadAndWrite  | ReadAndWrite  | WriteOnly  | ReadAndWrite | ReadOnly    |

use ts_core::{Error, Result};

/// Which roles currently hold a chunk open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activity {
    #[default]
    Idle,
    ReadOnly,
    WriteOnly,
    ReadAndWrite,
}

impl Activity {
    pub fn is_reading(self) -> bool {
        matches!(self, Activity::ReadOnly | Activity::ReadAndWrite)
    }

    pub fn is_writing(self) -> bool {
        matches!(self, Activity::WriteOnly | Activity::ReadAndWrite)
    }

    /// Whether the backing file handle is needed at all.
    pub fn is_idle(self) -> bool {
        self == Activity::Idle
    }

    pub fn on_open_read(self) -> Activity {
        match self {
            Activity::Idle | Activity::ReadOnly => Activity::ReadOnly,
            Activity::WriteOnly | Activity::ReadAndWrite => Activity::ReadAndWrite,
        }
    }

    pub fn on_close_read(self) -> Activity {
        match self {
            Activity::Idle | Activity::ReadOnly => Activity::Idle,
            Activity::WriteOnly | Activity::ReadAndWrite => Activity::WriteOnly,
        }
    }

    /// Write may not start underneath an active reader.
    pub fn on_open_write(self) -> Result<Activity> {
        match self {
            Activity::Idle | Activity::WriteOnly => Ok(Activity::WriteOnly),
            Activity::ReadAndWrite => Ok(Activity::ReadAndWrite),
            Activity::ReadOnly => Err(Error::invariant(
                "write requested for a chunk that is already open for read",
            )),
        }
    }

    pub fn on_close_write(self) -> Activity {
        match self {
            Activity::Idle | Activity::WriteOnly => Activity::Idle,
            Activity::ReadOnly | Activity::ReadAndWrite => Activity::ReadOnly,
        }
    }
}
