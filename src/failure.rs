//! Host-boundary failure bridge.
//!
//! A kernel failure crosses the host boundary as an opaque [`FailureHandle`]
//! token. The host catches it, keeps the token, and later asks
//! [`describe_failure`] for a readable `{message, kind}` record.
//!
//! Handles are created by [`raise`] (or [`catch_failure`]) and destroyed by
//! [`release`]. Nothing checks a token before it is dereferenced: the caller
//! guarantees that it came from `raise` and has not been released.

use std::panic::{catch_unwind, AssertUnwindSafe, UnwindSafe};

use serde::Serialize;

use crate::error::{KernelError, Result};

/// Kind reported for a failure produced by a panic inside a kernel call.
pub const PANIC_KIND: &str = "Panic";

/// Kind reported when `describe_failure` is given the null token.
pub const NULL_HANDLE_KIND: &str = "NullHandle";

/// A kernel failure object owned by the failure machinery.
#[derive(Clone, Debug)]
pub struct Failure {
    kind: String,
    message: String,
}

impl Failure {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&KernelError> for Failure {
    fn from(err: &KernelError) -> Self {
        Failure::new(err.kind(), err.to_string())
    }
}

/// Opaque token for a raised [`Failure`], as transported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct FailureHandle(usize);

impl FailureHandle {
    pub const NULL: FailureHandle = FailureHandle(0);

    /// Wrap a raw token received from the host.
    pub fn from_raw(token: usize) -> Self {
        FailureHandle(token)
    }

    /// The raw token handed to the host.
    pub fn into_raw(self) -> usize {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Readable view of a failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailureView {
    pub message: String,
    pub kind: String,
}

/// Box a failure and hand out its token.
pub fn raise_failure(failure: Failure) -> FailureHandle {
    tracing::debug!(kind = failure.kind(), "raising kernel failure");
    FailureHandle(Box::into_raw(Box::new(failure)) as usize)
}

/// Raise a kernel error as a failure handle.
pub fn raise(err: KernelError) -> FailureHandle {
    raise_failure(Failure::from(&err))
}

/// Extract the message and kind of a raised failure.
///
/// Never panics. The null token yields a fixed `NullHandle` view.
///
/// # Safety
///
/// A non-null `handle` must have been returned by [`raise`],
/// [`raise_failure`] or [`catch_failure`] and must not have been passed to
/// [`release`]. Any other token is undefined behavior.
pub unsafe fn describe_failure(handle: FailureHandle) -> FailureView {
    if handle.is_null() {
        return FailureView {
            message: "no failure object".to_string(),
            kind: NULL_HANDLE_KIND.to_string(),
        };
    }
    // SAFETY: the caller guarantees the token is a live `Box<Failure>` pointer.
    let failure = unsafe { &*(handle.0 as *const Failure) };
    let message = if failure.message.is_empty() {
        failure.kind.clone()
    } else {
        failure.message.clone()
    };
    FailureView {
        message,
        kind: failure.kind.clone(),
    }
}

/// Destroy a raised failure. Releasing the null token is a no-op.
///
/// # Safety
///
/// Same contract as [`describe_failure`]; the token is dead afterwards.
pub unsafe fn release(handle: FailureHandle) {
    if handle.is_null() {
        return;
    }
    // SAFETY: the caller guarantees the token is a live `Box<Failure>` pointer
    // that is released exactly once.
    drop(unsafe { Box::from_raw(handle.0 as *mut Failure) });
}

/// Run a kernel call at the host boundary.
///
/// Both `Err(KernelError)` and panics are converted into a raised failure.
pub fn catch_failure<T, F>(f: F) -> std::result::Result<T, FailureHandle>
where
    F: FnOnce() -> Result<T> + UnwindSafe,
{
    match catch_unwind(f) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(raise(err)),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "kernel call panicked".to_string());
            Err(raise_failure(Failure::new(PANIC_KIND, message)))
        }
    }
}

/// [`catch_failure`] for closures that borrow non-unwind-safe state.
pub fn catch_failure_assert<T, F>(f: F) -> std::result::Result<T, FailureHandle>
where
    F: FnOnce() -> Result<T>,
{
    catch_failure(AssertUnwindSafe(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raised_error_is_described() {
        let handle = raise(KernelError::NotSupported("binary IGES".into()));
        assert!(!handle.is_null());
        let view = unsafe { describe_failure(handle) };
        assert_eq!(view.kind, "NotSupported");
        assert!(view.message.contains("binary IGES"));
        // Describing does not consume the failure.
        assert_eq!(unsafe { describe_failure(handle) }, view);
        unsafe { release(handle) };
    }

    #[test]
    fn null_handle_is_reported_not_dereferenced() {
        let view = unsafe { describe_failure(FailureHandle::NULL) };
        assert_eq!(view.kind, NULL_HANDLE_KIND);
        assert!(!view.message.is_empty());
        unsafe { release(FailureHandle::NULL) };
    }

    #[test]
    fn raw_token_round_trips() {
        let handle = raise_failure(Failure::new("Custom", "boom"));
        let token = handle.into_raw();
        let back = FailureHandle::from_raw(token);
        let view = unsafe { describe_failure(back) };
        assert_eq!(view.message, "boom");
        unsafe { release(back) };
    }

    #[test]
    fn empty_message_falls_back_to_kind() {
        let handle = raise_failure(Failure::new("Silent", ""));
        let view = unsafe { describe_failure(handle) };
        assert_eq!(view.message, "Silent");
        unsafe { release(handle) };
    }

    #[test]
    fn catch_failure_passes_values_through() {
        let value = catch_failure(|| Ok(42)).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn catch_failure_raises_errors() {
        let handle = catch_failure(|| -> Result<()> {
            Err(KernelError::Construction("no faces".into()))
        })
        .unwrap_err();
        let view = unsafe { describe_failure(handle) };
        assert_eq!(view.kind, "ConstructionError");
        unsafe { release(handle) };
    }

    #[test]
    fn catch_failure_assert_allows_mutable_borrows() {
        let mut written = Vec::new();
        let count = catch_failure_assert(|| {
            written.push("header");
            written.push("data");
            Ok(written.len())
        })
        .unwrap();
        assert_eq!(count, 2);

        let handle = catch_failure_assert(|| -> Result<()> {
            written.clear();
            Err(KernelError::NotSupported("binary IGES output".into()))
        })
        .unwrap_err();
        assert!(written.is_empty());
        let view = unsafe { describe_failure(handle) };
        assert_eq!(view.kind, "NotSupported");
        unsafe { release(handle) };
    }

    #[test]
    fn catch_failure_converts_panics() {
        let handle = catch_failure(|| -> Result<()> { panic!("kernel assertion") }).unwrap_err();
        let view = unsafe { describe_failure(handle) };
        assert_eq!(view.kind, PANIC_KIND);
        assert_eq!(view.message, "kernel assertion");
        unsafe { release(handle) };
    }
}
