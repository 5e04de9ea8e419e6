//! Panic capture for invoked methods
//!
//! The dispatcher catches unwinding panics from method bodies. By the time
//! `catch_unwind` returns, the stack that panicked is gone, so the hook
//! installed here records the location and a backtrace in a thread-local
//! slot while it still exists. The dispatcher takes it right after the catch.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic;
use std::sync::Once;

thread_local! {
    static LAST_PANIC: RefCell<Option<String>> = const { RefCell::new(None) };
}

static INSTALL: Once = Once::new();

/// Install the recording hook, chained in front of the existing one
///
/// Only the first call has an effect. The previous hook (usually the
/// default stderr printer) still runs for every panic.
pub fn install_panic_hook() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                .unwrap_or_else(|| "unknown location".to_string());
            let trace = format!(
                "panicked at {}: {}\nstack backtrace:\n{}",
                location,
                panic_to_string(info.payload()),
                Backtrace::force_capture()
            );
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

/// Take the trace recorded for the most recent panic on this thread
pub fn take_panic_trace() -> Option<String> {
    LAST_PANIC.with(|slot| slot.borrow_mut().take())
}

/// Convert a panic payload to its message text
///
/// Handles `&str` and `String` payloads, which cover `panic!` with a
/// literal or a format string.
pub fn panic_to_string(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
