//! # C ABI
//!
//! Flat `extern "C"` entry points over [`ControlSurface::global`] for hosts
//! that load the engine as a native plugin.
//!
//! Every entry point catches panics; a panic is logged and reported as the
//! same sentinel an ordinary failure would produce.
//!
//! Strings returned by [`ember_cpu_profile`] and [`ember_gpu_profile`] are
//! NUL-terminated UTF-8 owned by the library. A pointer stays valid until the
//! next call of the same function.

#![allow(unsafe_code)]

use std::ffi::{c_char, CString};
use std::panic::{self, AssertUnwindSafe};

use parking_lot::{const_mutex, Mutex};

use crate::control::ControlSurface;

/// Returned when a profile string cannot be produced.
static EMPTY: &[u8; 1] = b"\0";

static CPU_PROFILE: Mutex<Option<CString>> = const_mutex(None);
static GPU_PROFILE: Mutex<Option<CString>> = const_mutex(None);

fn guarded<R>(entry: &'static str, fallback: R, f: impl FnOnce() -> R) -> R {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        tracing::error!(entry, "panic caught at the C boundary");
        fallback
    })
}

fn publish_string(slot: &Mutex<Option<CString>>, text: String) -> *const c_char {
    let mut slot = slot.lock();
    *slot = CString::new(text).ok();
    slot.as_ref()
        .map_or(EMPTY.as_ptr().cast::<c_char>(), |s| s.as_ptr())
}

/// Creates the engine. Returns `false` on any failure.
#[no_mangle]
pub extern "C" fn ember_initialize(thread_count: i32, width: i32, height: i32) -> bool {
    guarded("ember_initialize", false, || {
        ControlSurface::global().initialize(thread_count, width, height)
    })
}

/// Shuts the engine down. Safe to call more than once.
#[no_mangle]
pub extern "C" fn ember_release() {
    guarded("ember_release", (), || ControlSurface::global().shutdown());
}

/// Engine bookkeeping for the next frame.
#[no_mangle]
pub extern "C" fn ember_update() {
    guarded("ember_update", (), || ControlSurface::global().update());
}

/// Renders one frame, blocking until it is presented.
#[no_mangle]
pub extern "C" fn ember_render() {
    guarded("ember_render", (), || ControlSurface::global().render());
}

/// Number of render threads, `0` without an engine.
#[no_mangle]
pub extern "C" fn ember_render_thread_count() -> i32 {
    guarded("ember_render_thread_count", 0, || {
        ControlSurface::global().thread_count()
    })
}

/// CPU breakdown of the last presented frame.
#[no_mangle]
pub extern "C" fn ember_cpu_profile() -> *const c_char {
    guarded("ember_cpu_profile", EMPTY.as_ptr().cast(), || {
        publish_string(&CPU_PROFILE, ControlSurface::global().cpu_profile())
    })
}

/// GPU breakdown of the last presented frame.
#[no_mangle]
pub extern "C" fn ember_gpu_profile() -> *const c_char {
    guarded("ember_gpu_profile", EMPTY.as_ptr().cast(), || {
        publish_string(&GPU_PROFILE, ControlSurface::global().gpu_profile())
    })
}

/// Skips the next update+render cycle.
#[no_mangle]
pub extern "C" fn ember_signal_reset() {
    guarded("ember_signal_reset", (), || {
        ControlSurface::global().signal_reset();
    });
}

/// Changes the anisotropic filtering level. Returns `false` outside `[1, 16]`.
#[no_mangle]
pub extern "C" fn ember_set_anisotropy(level: i32) -> bool {
    guarded("ember_set_anisotropy", false, || {
        ControlSurface::global().set_anisotropy(level)
    })
}

/// Requests a new resolution for the next frame.
#[no_mangle]
pub extern "C" fn ember_resize(width: i32, height: i32) -> bool {
    guarded("ember_resize", false, || {
        ControlSurface::global().resize(width, height)
    })
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;

    fn read(ptr: *const c_char) -> String {
        assert!(!ptr.is_null());
        // SAFETY: the pointer comes from a profile slot and no other call
        // of the same function runs while it is read
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }

    #[test]
    fn test_guarded_turns_panic_into_fallback() {
        let value = guarded("test", 7, || -> i32 { panic!("boom") });
        assert_eq!(value, 7);
    }

    #[test]
    fn test_publish_string_interior_nul_is_empty() {
        let slot = Mutex::new(None);
        assert_eq!(read(publish_string(&slot, String::from("a\0b"))), "");
        assert_eq!(read(publish_string(&slot, String::from("Frame 3"))), "Frame 3");
    }

    #[test]
    fn test_global_lifecycle() {
        assert_eq!(ember_render_thread_count(), 0);
        assert_eq!(read(ember_cpu_profile()), "");

        assert!(ember_initialize(3, 320, 240));
        assert!(!ember_initialize(3, 320, 240));
        assert_eq!(ember_render_thread_count(), 3);
        assert!(ember_set_anisotropy(16));
        assert!(!ember_set_anisotropy(0));
        assert!(ember_resize(640, 480));

        for _ in 0..3 {
            ember_update();
            ember_render();
        }
        ember_signal_reset();
        ember_update();
        ember_render();

        assert!(read(ember_cpu_profile()).starts_with("Frame 2"));
        assert!(read(ember_gpu_profile()).starts_with("Frame 2"));

        ember_release();
        ember_release();
        assert_eq!(ember_render_thread_count(), 0);
        assert_eq!(read(ember_cpu_profile()), "");
        assert_eq!(read(ember_gpu_profile()), "");
    }
}
