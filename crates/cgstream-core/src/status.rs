//! Status codes returned by nodes and schedulers.
//!
//! Every node operation reports through a small closed set of integer codes.
//! In Rust they are carried as [`NodeResult`]: `Ok(())` is `CG_SUCCESS` and
//! every other code is a [`Status`] variant. The numeric values are part of
//! the external ABI and never change.
//!
//! # Taxonomy
//!
//! | Code | Kind |
//! |------|------|
//! | [`Status::SkipExecution`] | recoverable, async mode only |
//! | [`Status::PausedScheduler`] | recoverable, resumable later |
//! | [`Status::StopScheduler`] | clean termination |
//! | everything else | fatal for the current scheduling call |

/// Numeric code for success.
pub const CG_SUCCESS: i32 = 0;

/// Node id used when a node is not identified for the external world.
pub const CG_UNIDENTIFIED_NODE: i32 = -1;

/// Non-success outcome of a node or scheduler operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Status {
    /// Not enough data in an input FIFO.
    BufferUnderflow = -1,
    /// Not enough free space in an output FIFO.
    BufferOverflow = -2,
    /// Memory allocation failed while building the graph.
    MemoryAllocationFailure = -3,
    /// A node failed to initialize.
    InitFailure = -4,
    /// Node cannot run this pass; the scheduler moves on.
    SkipExecution = -5,
    /// Generic buffer error (bad index, conflicting borrow).
    BufferError = -6,
    /// Error reported by the OS layer.
    OsError = -7,
    /// Graph finished its useful work.
    StopScheduler = -8,
    /// Scheduler suspended; can be resumed later.
    PausedScheduler = -9,
}

/// Result of a node or scheduler operation.
pub type NodeResult = Result<(), Status>;

impl Status {
    /// Returns the numeric code.
    #[inline]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Returns `true` for codes that abort the scheduling call as a failure.
    ///
    /// Skip, pause and stop are control codes, not errors.
    #[inline]
    pub const fn is_error(self) -> bool {
        !matches!(
            self,
            Self::SkipExecution | Self::StopScheduler | Self::PausedScheduler
        )
    }

    /// Returns the C name of the code.
    pub const fn name(self) -> &'static str {
        match self {
            Self::BufferUnderflow => "CG_BUFFER_UNDERFLOW",
            Self::BufferOverflow => "CG_BUFFER_OVERFLOW",
            Self::MemoryAllocationFailure => "CG_MEMORY_ALLOCATION_FAILURE",
            Self::InitFailure => "CG_INIT_FAILURE",
            Self::SkipExecution => "CG_SKIP_EXECUTION",
            Self::BufferError => "CG_BUFFER_ERROR",
            Self::OsError => "CG_OS_ERROR",
            Self::StopScheduler => "CG_STOP_SCHEDULER",
            Self::PausedScheduler => "CG_PAUSED_SCHEDULER",
        }
    }
}

/// Converts a result to its numeric code.
#[inline]
pub fn status_code(result: &NodeResult) -> i32 {
    match result {
        Ok(()) => CG_SUCCESS,
        Err(status) => status.code(),
    }
}

/// Converts a numeric code to a result.
///
/// Unknown codes are reported as [`Status::BufferError`].
pub fn result_from_code(code: i32) -> NodeResult {
    if code == CG_SUCCESS {
        return Ok(());
    }
    Err(Status::try_from(code).unwrap_or(Status::BufferError))
}

/// Error for a code outside the closed set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnknownStatus(pub i32);

impl TryFrom<i32> for Status {
    type Error = UnknownStatus;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Ok(match code {
            -1 => Self::BufferUnderflow,
            -2 => Self::BufferOverflow,
            -3 => Self::MemoryAllocationFailure,
            -4 => Self::InitFailure,
            -5 => Self::SkipExecution,
            -6 => Self::BufferError,
            -7 => Self::OsError,
            -8 => Self::StopScheduler,
            -9 => Self::PausedScheduler,
            other => return Err(UnknownStatus(other)),
        })
    }
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Status {}

impl core::fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown status code {}", self.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnknownStatus {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_abi() {
        assert_eq!(Status::BufferUnderflow.code(), -1);
        assert_eq!(Status::BufferOverflow.code(), -2);
        assert_eq!(Status::MemoryAllocationFailure.code(), -3);
        assert_eq!(Status::InitFailure.code(), -4);
        assert_eq!(Status::SkipExecution.code(), -5);
        assert_eq!(Status::BufferError.code(), -6);
        assert_eq!(Status::OsError.code(), -7);
        assert_eq!(Status::StopScheduler.code(), -8);
        assert_eq!(Status::PausedScheduler.code(), -9);
    }

    #[test]
    fn try_from_round_trips_every_code() {
        for code in -9..=-1 {
            let status = Status::try_from(code).unwrap();
            assert_eq!(status.code(), code);
        }
        assert_eq!(Status::try_from(0), Err(UnknownStatus(0)));
        assert_eq!(Status::try_from(-10), Err(UnknownStatus(-10)));
    }

    #[test]
    fn control_codes_are_not_errors() {
        assert!(!Status::SkipExecution.is_error());
        assert!(!Status::StopScheduler.is_error());
        assert!(!Status::PausedScheduler.is_error());
        assert!(Status::BufferUnderflow.is_error());
        assert!(Status::OsError.is_error());
    }

    #[test]
    fn result_code_conversion() {
        assert_eq!(status_code(&Ok(())), CG_SUCCESS);
        assert_eq!(status_code(&Err(Status::StopScheduler)), -8);
        assert_eq!(result_from_code(0), Ok(()));
        assert_eq!(result_from_code(-9), Err(Status::PausedScheduler));
        assert_eq!(result_from_code(-42), Err(Status::BufferError));
    }

    #[test]
    fn display_includes_name_and_code() {
        let text = format!("{}", Status::BufferOverflow);
        assert_eq!(text, "CG_BUFFER_OVERFLOW (-2)");
    }
}
