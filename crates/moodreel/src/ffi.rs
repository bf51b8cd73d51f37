//! FFI bindings for the library.
//!
//! Settings cross the boundary as UTF-8 JSON in the shape of
//! [`Settings`], missing fields take their defaults. Every published state
//! is handed to the `on_state` callback as UTF-8 JSON in the shape of
//! [`crate::core::UiState`].

use std::ffi::{CStr, c_char, c_void};
use std::sync::{Arc, LazyLock};

use moodreel_core::{ActorDeadError, Settings};
use tokio::runtime::{Builder as RuntimeBuilder, Runtime};

use crate::{Session, SessionBuilder};

static TOKIO_RUNTIME: LazyLock<Runtime> = LazyLock::new(|| {
    RuntimeBuilder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .build()
        .unwrap()
});

/// Error codes returned by the C APIs.
#[repr(u32)]
#[derive(Debug, PartialEq, Eq)]
pub enum ErrorCode {
    /// No error occurred.
    Ok = 0,
    /// Invalid parameters, strings or settings JSON.
    Invalid = 1,
    /// The conversation has stopped and takes no more intents.
    Dead = 2,
}

impl From<Result<(), ActorDeadError>> for ErrorCode {
    #[inline]
    fn from(result: Result<(), ActorDeadError>) -> Self {
        match result {
            Ok(()) => ErrorCode::Ok,
            Err(_) => ErrorCode::Dead,
        }
    }
}

/// Callbacks for the events from the session.
///
/// Note that callback functions and `user_info` are assumed to be thread-safe
/// and able to send across the thread boundaries.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct SessionCallbacks {
    /// User-defined data to be passed to the callbacks.
    pub user_info: *mut c_void,
    /// Callback to handle a published state.
    ///
    /// Parameters:
    /// - `user_info`: The user-defined data.
    /// - `state_json`: The state as JSON, not nul-terminated. It's only valid
    ///   during the call.
    /// - `state_json_len`: Length of the JSON string.
    pub on_state: Option<unsafe extern "C" fn(*mut c_void, *const c_char, usize)>,
    /// Callback to free the user-defined data.
    pub free: Option<unsafe extern "C" fn(*mut c_void)>,
}

// SAFETY: `SessionCallbacks` is guaranteed to be thread-safe by users.
unsafe impl Send for SessionCallbacks {}
unsafe impl Sync for SessionCallbacks {}

/// Frees the user info once the last callback referencing it is gone.
struct CallbacksGuard {
    callbacks: SessionCallbacks,
}

impl Drop for CallbacksGuard {
    fn drop(&mut self) {
        if let Some(free) = self.callbacks.free {
            // SAFETY: Assume the callback is valid.
            unsafe { free(self.callbacks.user_info) };
        }
    }
}

/// A session handed out to the C side.
///
/// `user_info` lives as long as the session, whether or not a callback
/// refers to it.
struct FfiSession {
    session: Session,
    // Dropped after `session`.
    _guard: Option<Arc<CallbacksGuard>>,
}

/// Reads a settings JSON string, a null pointer means the defaults.
///
/// # Safety
///
/// `settings_json` must be null or point to a nul-terminated string.
unsafe fn read_settings(settings_json: *const c_char) -> Option<Settings> {
    if settings_json.is_null() {
        return Some(Settings::default());
    }
    // SAFETY: Assume the caller has provided the valid pointer.
    let json = unsafe { CStr::from_ptr(settings_json) }.to_str().ok()?;
    match serde_json::from_str(json) {
        Ok(settings) => Some(settings),
        Err(err) => {
            warn!("invalid settings JSON: {err}");
            None
        }
    }
}

/// Creates a session talking to the endpoint described by the settings.
///
/// `out` will be set to a pointer to the session if the call succeeds. The
/// `on_state` callback is invoked with the initial state shortly after,
/// from a background thread.
///
/// The caller must free the session with `mr_session_free`, or the
/// resources will be leaked.
///
/// # Safety
///
/// `settings_json` must be null or contain a valid nul terminator at the
/// end of the string. `callbacks` must be null or a valid pointer to
/// `SessionCallbacks` value, whose fields are either valid pointers or null.
/// `out` must be a valid pointer that points to a pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mr_session_new(
    settings_json: *const c_char,
    callbacks: *const SessionCallbacks,
    out: *mut *mut c_void,
) -> ErrorCode {
    // SAFETY: Assume the caller has provided the valid pointer.
    let Some(settings) = (unsafe { read_settings(settings_json) }) else {
        return ErrorCode::Invalid;
    };

    let mut builder = SessionBuilder::with_settings(settings);
    let mut guard = None;
    if !callbacks.is_null() {
        // SAFETY: Assume the callbacks are valid.
        let callbacks = unsafe { *callbacks };
        let callbacks_guard = Arc::new(CallbacksGuard { callbacks });
        if let Some(on_state) = callbacks.on_state {
            let callbacks_guard = Arc::clone(&callbacks_guard);
            builder = builder.on_state(move |state| {
                let json = match serde_json::to_string(state) {
                    Ok(json) => json,
                    Err(err) => {
                        error!("failed to encode the state: {err}");
                        return;
                    }
                };
                // SAFETY: Assume the callback is valid.
                unsafe {
                    on_state(
                        callbacks_guard.callbacks.user_info,
                        json.as_ptr() as *const _,
                        json.len(),
                    )
                };
            });
        }
        guard = Some(callbacks_guard);
    }

    // We must enter the runtime before building the session, since it will
    // spawn the orchestrator actor, which requires a runtime.
    let runtime = &*TOKIO_RUNTIME;
    let _enter = runtime.enter();

    let session_ptr = Box::into_raw(Box::new(FfiSession {
        session: builder.build(),
        _guard: guard,
    }));
    // SAFETY: Assume `out` is valid and properly aligned.
    unsafe {
        (out as *mut *mut FfiSession).write(session_ptr);
    }

    ErrorCode::Ok
}

/// Replaces the text of the input box.
///
/// # Safety
///
/// `session` must be a valid pointer returned from `mr_session_new`.
/// String pointed by `text` must contain a valid nul terminator at the end
/// of the string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mr_session_set_input(
    session: *mut c_void,
    text: *const c_char,
) -> ErrorCode {
    let Ok(text) = unsafe { CStr::from_ptr(text) }.to_str() else {
        return ErrorCode::Invalid;
    };

    // SAFETY: Assume the caller has provided the valid pointer.
    let session = unsafe { &(*(session as *mut FfiSession)).session };
    session.set_input(text).into()
}

/// Sends the input box as a user message.
///
/// Does nothing if the input is blank or a reply is pending.
///
/// # Safety
///
/// `session` must be a valid pointer returned from `mr_session_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mr_session_send(session: *mut c_void) -> ErrorCode {
    // SAFETY: Assume the caller has provided the valid pointer.
    let session = unsafe { &(*(session as *mut FfiSession)).session };
    session.send().into()
}

/// Starts a new chat.
///
/// # Safety
///
/// `session` must be a valid pointer returned from `mr_session_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mr_session_new_chat(session: *mut c_void) -> ErrorCode {
    // SAFETY: Assume the caller has provided the valid pointer.
    let session = unsafe { &(*(session as *mut FfiSession)).session };
    session.new_chat().into()
}

/// Applies new settings, which also starts a new chat.
///
/// # Safety
///
/// `session` must be a valid pointer returned from `mr_session_new`.
/// String pointed by `settings_json` must contain a valid nul terminator at
/// the end of the string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mr_session_update_settings(
    session: *mut c_void,
    settings_json: *const c_char,
) -> ErrorCode {
    if settings_json.is_null() {
        return ErrorCode::Invalid;
    }
    // SAFETY: Checked for null, the caller guarantees the rest.
    let Some(settings) = (unsafe { read_settings(settings_json) }) else {
        return ErrorCode::Invalid;
    };

    // SAFETY: Assume the caller has provided the valid pointer.
    let session = unsafe { &(*(session as *mut FfiSession)).session };
    session.update_settings(settings).into()
}

/// Frees a session.
///
/// No callback is invoked after this call returns, except the one that may
/// be running at the moment. `user_info` is freed once that one is done.
///
/// # Safety
///
/// `session` must be a valid pointer returned from `mr_session_new`, and
/// must not be used after this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mr_session_free(session: *mut c_void) {
    // SAFETY: Assume the caller has provided the valid pointer.
    unsafe {
        drop(Box::from_raw(session as *mut FfiSession));
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;
    use std::ptr;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use super::*;

    #[derive(Default)]
    struct Received {
        states: Mutex<Vec<String>>,
    }

    unsafe extern "C" fn on_state(
        user_info: *mut c_void,
        json: *const c_char,
        len: usize,
    ) {
        let received = unsafe { &*(user_info as *const Received) };
        let bytes = unsafe { std::slice::from_raw_parts(json as *const u8, len) };
        let json = String::from_utf8(bytes.to_vec()).unwrap();
        received.states.lock().unwrap().push(json);
    }

    unsafe extern "C" fn free(user_info: *mut c_void) {
        drop(unsafe { Box::from_raw(user_info as *mut Received) });
    }

    static FREED: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn count_free(_user_info: *mut c_void) {
        FREED.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_invalid_settings() {
        let settings = CString::new("{ not json").unwrap();
        let mut session = ptr::null_mut();
        let code = unsafe {
            mr_session_new(settings.as_ptr(), ptr::null(), &mut session)
        };
        assert_eq!(code, ErrorCode::Invalid);
        assert!(session.is_null());
    }

    #[test]
    fn test_states_are_delivered_as_json() {
        let received = Box::into_raw(Box::new(Received::default()));
        let callbacks = SessionCallbacks {
            user_info: received as *mut c_void,
            on_state: Some(on_state),
            free: Some(free),
        };
        let settings = CString::new(r#"{ "api_key": "sk-test" }"#).unwrap();
        let input = CString::new("I like jazz").unwrap();

        let mut session = ptr::null_mut();
        unsafe {
            let code = mr_session_new(settings.as_ptr(), &callbacks, &mut session);
            assert_eq!(code, ErrorCode::Ok);
            assert_eq!(mr_session_set_input(session, input.as_ptr()), ErrorCode::Ok);
        }

        let deadline = Instant::now() + Duration::from_secs(1);
        let found = loop {
            // SAFETY: `received` is freed only after the session.
            let states = unsafe { &*received }.states.lock().unwrap().clone();
            let found = states.iter().any(|json| {
                let state: serde_json::Value = serde_json::from_str(json).unwrap();
                state["input"] == "I like jazz" && state["phase"] == "gathering"
            });
            if found || Instant::now() > deadline {
                break found;
            }
            std::thread::sleep(Duration::from_millis(10));
        };
        assert!(found);

        unsafe { mr_session_free(session) };
    }

    #[test]
    fn test_user_info_outlives_session_without_on_state() {
        let callbacks = SessionCallbacks {
            user_info: ptr::null_mut(),
            on_state: None,
            free: Some(count_free),
        };
        let mut session = ptr::null_mut();
        unsafe {
            let code = mr_session_new(ptr::null(), &callbacks, &mut session);
            assert_eq!(code, ErrorCode::Ok);
        }
        assert_eq!(FREED.load(Ordering::SeqCst), 0);

        unsafe {
            assert_eq!(mr_session_new_chat(session), ErrorCode::Ok);
            mr_session_free(session);
        }
        assert_eq!(FREED.load(Ordering::SeqCst), 1);
    }
}
