//! C hook table handed to native engines.
//!
//! The engine receives a pointer to [`ForkfrontHooks`] for the duration of
//! `forkfront_main`. Each hook forwards to the session's [`EngineHost`].
//! Panics raised by the host are contained here; unwinding into C is
//! undefined behaviour.

use std::borrow::Cow;
use std::ffi::{c_char, c_int, c_void, CStr};
use std::panic::{catch_unwind, AssertUnwindSafe};

use log::error;
use transport::{TextAttr, WindowId, WindowType, NO_INPUT};

use crate::engine::EngineHost;

/// Function table passed to `forkfront_main`.
#[repr(C)]
pub struct ForkfrontHooks {
    /// Opaque context; engines pass it back unchanged as the first argument.
    pub ctx: *mut c_void,
    /// Returns the next key code, `0` for none, `0x1B` for abort.
    pub pull_key: unsafe extern "C" fn(ctx: *mut c_void) -> u32,
    /// Writes a position and returns `1`, or returns `-1` when the head is
    /// not a position.
    pub pull_position: unsafe extern "C" fn(ctx: *mut c_void, x: *mut c_int, y: *mut c_int) -> c_int,
    /// Copies a NUL-terminated line into `buf` (truncated to `cap - 1`
    /// bytes) and returns its full byte length, or `-1` when the head is not
    /// a line.
    pub pull_line: unsafe extern "C" fn(ctx: *mut c_void, buf: *mut c_char, cap: usize) -> c_int,
    /// Copies up to `cap` selected ids into `out` and returns the selection
    /// size, or `-1` when the head is not a menu selection.
    pub pull_menu_selection:
        unsafe extern "C" fn(ctx: *mut c_void, out: *mut c_int, cap: usize) -> c_int,
    pub ready: unsafe extern "C" fn(ctx: *mut c_void),
    pub busy: unsafe extern "C" fn(ctx: *mut c_void),
    pub create_window: unsafe extern "C" fn(ctx: *mut c_void, id: c_int, kind: c_int),
    pub clear_window: unsafe extern "C" fn(ctx: *mut c_void, id: c_int),
    pub display_window: unsafe extern "C" fn(ctx: *mut c_void, id: c_int, blocking: c_int),
    pub destroy_window: unsafe extern "C" fn(ctx: *mut c_void, id: c_int),
    pub put_string:
        unsafe extern "C" fn(ctx: *mut c_void, id: c_int, attr: c_int, text: *const c_char),
}

impl ForkfrontHooks {
    /// Builds a hook table whose context points at `host`.
    ///
    /// The table must not outlive the borrowed host reference.
    pub fn new(host: &&dyn EngineHost) -> Self {
        Self {
            ctx: host as *const &dyn EngineHost as *mut c_void,
            pull_key,
            pull_position,
            pull_line,
            pull_menu_selection,
            ready,
            busy,
            create_window,
            clear_window,
            display_window,
            destroy_window,
            put_string,
        }
    }
}

/// Recovers the host behind a hook context.
///
/// # Safety
/// `ctx` must come from [`ForkfrontHooks::new`] and the host it references
/// must still be alive.
unsafe fn host<'a>(ctx: *mut c_void) -> &'a dyn EngineHost {
    // SAFETY: guaranteed by the caller; `ctx` addresses a live `&dyn EngineHost`.
    unsafe { *(ctx as *const &dyn EngineHost) }
}

fn contained<R>(hook: &'static str, fallback: R, f: impl FnOnce() -> R) -> R {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error!("engine hook `{hook}` panicked; returning neutral value");
            fallback
        }
    }
}

unsafe extern "C" fn pull_key(ctx: *mut c_void) -> u32 {
    // SAFETY: the engine hands back the context we gave it.
    let host = unsafe { host(ctx) };
    contained("pull_key", NO_INPUT, || host.pull_key())
}

unsafe extern "C" fn pull_position(ctx: *mut c_void, x: *mut c_int, y: *mut c_int) -> c_int {
    // SAFETY: as above.
    let host = unsafe { host(ctx) };
    contained("pull_position", -1, || match host.pull_position() {
        Some((px, py)) => {
            // SAFETY: the engine passes writable out-pointers or null.
            unsafe {
                if !x.is_null() {
                    *x = px;
                }
                if !y.is_null() {
                    *y = py;
                }
            }
            1
        }
        None => -1,
    })
}

unsafe extern "C" fn pull_line(ctx: *mut c_void, buf: *mut c_char, cap: usize) -> c_int {
    // SAFETY: as above.
    let host = unsafe { host(ctx) };
    contained("pull_line", -1, || {
        let Some(line) = host.pull_line() else {
            return -1;
        };
        let bytes = line.as_bytes();
        if !buf.is_null() && cap > 0 {
            let n = bytes.len().min(cap - 1);
            // SAFETY: `buf` is valid for `cap` bytes per the hook contract and
            // `n + 1 <= cap`.
            unsafe {
                std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf.cast::<u8>(), n);
                *buf.add(n) = 0;
            }
        }
        c_int::try_from(bytes.len()).unwrap_or(c_int::MAX)
    })
}

unsafe extern "C" fn pull_menu_selection(ctx: *mut c_void, out: *mut c_int, cap: usize) -> c_int {
    // SAFETY: as above.
    let host = unsafe { host(ctx) };
    contained("pull_menu_selection", -1, || {
        let Some(ids) = host.pull_menu_selection() else {
            return -1;
        };
        if !out.is_null() {
            let n = ids.len().min(cap);
            // SAFETY: `out` is valid for `cap` ints per the hook contract.
            unsafe { std::ptr::copy_nonoverlapping(ids.as_ptr(), out, n) };
        }
        c_int::try_from(ids.len()).unwrap_or(c_int::MAX)
    })
}

unsafe extern "C" fn ready(ctx: *mut c_void) {
    // SAFETY: as above.
    let host = unsafe { host(ctx) };
    contained("ready", (), || host.game_ready());
}

unsafe extern "C" fn busy(ctx: *mut c_void) {
    // SAFETY: as above.
    let host = unsafe { host(ctx) };
    contained("busy", (), || host.game_busy());
}

unsafe extern "C" fn create_window(ctx: *mut c_void, id: c_int, kind: c_int) {
    // SAFETY: as above.
    let host = unsafe { host(ctx) };
    contained("create_window", (), || {
        host.create_window(WindowId(id), WindowType(kind))
    });
}

unsafe extern "C" fn clear_window(ctx: *mut c_void, id: c_int) {
    // SAFETY: as above.
    let host = unsafe { host(ctx) };
    contained("clear_window", (), || host.clear_window(WindowId(id)));
}

unsafe extern "C" fn display_window(ctx: *mut c_void, id: c_int, blocking: c_int) {
    // SAFETY: as above.
    let host = unsafe { host(ctx) };
    contained("display_window", (), || {
        host.display_window(WindowId(id), blocking != 0)
    });
}

unsafe extern "C" fn destroy_window(ctx: *mut c_void, id: c_int) {
    // SAFETY: as above.
    let host = unsafe { host(ctx) };
    contained("destroy_window", (), || host.destroy_window(WindowId(id)));
}

unsafe extern "C" fn put_string(ctx: *mut c_void, id: c_int, attr: c_int, text: *const c_char) {
    // SAFETY: as above.
    let host = unsafe { host(ctx) };
    let text = if text.is_null() {
        Cow::Borrowed("")
    } else {
        // SAFETY: the engine passes a NUL-terminated string valid for this call.
        unsafe { CStr::from_ptr(text) }.to_string_lossy()
    };
    contained("put_string", (), || {
        host.put_string(WindowId(id), TextAttr(attr), &text)
    });
}
