//! Global stop hotkey. The game window owns keyboard focus while the engine
//! runs, so the stop key has to be caught system-wide.

use crate::engine::StopSignal;
use crate::logger;

const PREFIX: &str = "hotkey";

/// Human-readable name of the stop hotkey on this OS.
pub fn hotkey_label() -> &'static str {
    if cfg!(target_os = "macos") {
        "Cmd+Shift+Q"
    } else if cfg!(target_os = "windows") {
        "Ctrl+Shift+Q"
    } else {
        "unavailable"
    }
}

/// Start a background thread that raises `signal` on Cmd+Shift+Q.
#[cfg(target_os = "macos")]
pub fn start_hotkey_listener(signal: StopSignal) {
    use std::ffi::c_void;

    logger::register_prefix(PREFIX, logger::COLOR_BLUE);

    type CGEventTapProxy = *mut c_void;
    type CGEventRef = *mut c_void;
    type CFMachPortRef = *mut c_void;
    type CFRunLoopSourceRef = *mut c_void;
    type CFRunLoopRef = *mut c_void;
    type CFStringRef = *const c_void;
    type CGEventMask = u64;
    type CGEventType = u32;

    type CGEventTapCallBack =
        unsafe extern "C" fn(CGEventTapProxy, CGEventType, CGEventRef, *mut c_void) -> CGEventRef;

    const K_CG_HID_EVENT_TAP: u32 = 0;
    const K_CG_HEAD_INSERT_EVENT_TAP: u32 = 0;
    const K_CG_EVENT_TAP_OPTION_LISTEN_ONLY: u32 = 1;
    const CG_EVENT_KEY_DOWN: u32 = 10;
    const K_CG_KEYBOARD_EVENT_KEYCODE: u32 = 9;

    const FLAG_SHIFT: u64 = 0x0002_0000;
    const FLAG_CONTROL: u64 = 0x0004_0000;
    const FLAG_ALTERNATE: u64 = 0x0008_0000;
    const FLAG_COMMAND: u64 = 0x0010_0000;

    const KEYCODE_Q: i64 = 12;

    #[link(name = "CoreGraphics", kind = "framework")]
    extern "C" {
        fn CGEventTapCreate(
            tap: u32,
            place: u32,
            options: u32,
            events_of_interest: CGEventMask,
            callback: CGEventTapCallBack,
            user_info: *mut c_void,
        ) -> CFMachPortRef;
        fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);
        fn CGEventGetFlags(event: CGEventRef) -> u64;
        fn CGEventGetIntegerValueField(event: CGEventRef, field: u32) -> i64;
    }

    #[link(name = "CoreFoundation", kind = "framework")]
    extern "C" {
        fn CFMachPortCreateRunLoopSource(
            allocator: *const c_void,
            port: CFMachPortRef,
            order: i64,
        ) -> CFRunLoopSourceRef;
        fn CFRunLoopGetCurrent() -> CFRunLoopRef;
        fn CFRunLoopAddSource(rl: CFRunLoopRef, source: CFRunLoopSourceRef, mode: CFStringRef);
        fn CFRunLoopRun();
        static kCFRunLoopCommonModes: CFStringRef;
    }

    unsafe extern "C" fn on_key(
        _proxy: CGEventTapProxy,
        event_type: CGEventType,
        event: CGEventRef,
        user_info: *mut c_void,
    ) -> CGEventRef {
        unsafe {
            if event_type != CG_EVENT_KEY_DOWN {
                return event;
            }
            let flags = CGEventGetFlags(event);
            let keycode = CGEventGetIntegerValueField(event, K_CG_KEYBOARD_EVENT_KEYCODE);
            let wanted = flags & (FLAG_COMMAND | FLAG_SHIFT) == FLAG_COMMAND | FLAG_SHIFT
                && flags & (FLAG_ALTERNATE | FLAG_CONTROL) == 0;
            if keycode == KEYCODE_Q && wanted {
                let signal = &*(user_info as *const StopSignal);
                signal.stop();
            }
            event
        }
    }

    std::thread::spawn(move || unsafe {
        // Lives as long as the run loop, which never returns.
        let signal_ptr = Box::into_raw(Box::new(signal)) as *mut c_void;
        let tap = CGEventTapCreate(
            K_CG_HID_EVENT_TAP,
            K_CG_HEAD_INSERT_EVENT_TAP,
            K_CG_EVENT_TAP_OPTION_LISTEN_ONLY,
            1 << CG_EVENT_KEY_DOWN,
            on_key,
            signal_ptr,
        );
        if tap.is_null() {
            logger::error_p(
                PREFIX,
                "failed to create event tap for the stop hotkey, \
                 grant Accessibility permission to your terminal",
            );
            drop(Box::from_raw(signal_ptr as *mut StopSignal));
            return;
        }
        let source = CFMachPortCreateRunLoopSource(std::ptr::null(), tap, 0);
        CFRunLoopAddSource(CFRunLoopGetCurrent(), source, kCFRunLoopCommonModes);
        CGEventTapEnable(tap, true);
        logger::info_p(PREFIX, "stop hotkey Cmd+Shift+Q registered");
        CFRunLoopRun();
    });
}

/// Start a background thread that raises `signal` on Ctrl+Shift+Q.
#[cfg(target_os = "windows")]
pub fn start_hotkey_listener(signal: StopSignal) {
    use std::ffi::c_void;

    logger::register_prefix(PREFIX, logger::COLOR_BLUE);

    type HWND = *mut c_void;

    #[repr(C)]
    struct POINT {
        x: i32,
        y: i32,
    }

    #[repr(C)]
    struct MSG {
        hwnd: HWND,
        message: u32,
        w_param: usize,
        l_param: isize,
        time: u32,
        pt: POINT,
    }

    const MOD_CONTROL: u32 = 0x0002;
    const MOD_SHIFT: u32 = 0x0004;
    const MOD_NOREPEAT: u32 = 0x4000;
    const VK_Q: u32 = 0x51;
    const WM_HOTKEY: u32 = 0x0312;
    const HOTKEY_ID: i32 = 1;

    #[link(name = "user32")]
    extern "system" {
        fn RegisterHotKey(hwnd: HWND, id: i32, modifiers: u32, vk: u32) -> i32;
        fn GetMessageW(msg: *mut MSG, hwnd: HWND, min: u32, max: u32) -> i32;
    }

    std::thread::spawn(move || unsafe {
        let ok = RegisterHotKey(
            std::ptr::null_mut(),
            HOTKEY_ID,
            MOD_CONTROL | MOD_SHIFT | MOD_NOREPEAT,
            VK_Q,
        );
        if ok == 0 {
            logger::error_p(
                PREFIX,
                "failed to register stop hotkey Ctrl+Shift+Q, \
                 another application may have claimed it",
            );
            return;
        }
        logger::info_p(PREFIX, "stop hotkey Ctrl+Shift+Q registered");

        let mut msg: MSG = std::mem::zeroed();
        // Returns 0 on WM_QUIT
        while GetMessageW(&mut msg, std::ptr::null_mut(), 0, 0) > 0 {
            if msg.message == WM_HOTKEY && msg.w_param == HOTKEY_ID as usize {
                signal.stop();
            }
        }
    });
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub fn start_hotkey_listener(_signal: StopSignal) {
    logger::register_prefix(PREFIX, logger::COLOR_BLUE);
    logger::warn_p(PREFIX, "no global stop hotkey on this platform, use the dashboard instead");
}
