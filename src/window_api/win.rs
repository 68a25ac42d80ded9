use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::{error, instrument};
use windows::Win32::{
    System::SystemInformation::GetTickCount64,
    UI::{
        Input::KeyboardAndMouse::{GetLastInputInfo, LASTINPUTINFO},
        WindowsAndMessaging::{GetForegroundWindow, GetWindowTextW},
    },
};

use super::WindowManager;

/// Title of the foreground window. Nothing in the foreground, e.g. while the desktop is focused,
/// gives an empty title.
#[instrument]
pub fn get_active_title() -> Result<String> {
    let window = unsafe { GetForegroundWindow() };
    if window.is_invalid() {
        return Ok(String::new());
    }

    let mut text: [u16; 4096] = [0; 4096];
    let len = unsafe { GetWindowTextW(window, &mut text) };
    Ok(String::from_utf16_lossy(&text[..len.max(0) as usize]))
}

#[instrument]
pub fn get_idle_time() -> Result<Duration> {
    let mut last: LASTINPUTINFO = LASTINPUTINFO {
        cbSize: size_of::<LASTINPUTINFO>() as u32,
        dwTime: 0,
    };
    let is_success = unsafe { GetLastInputInfo(&mut last) };
    if !is_success.as_bool() {
        return Err(anyhow!("Failed to retrieve user idle time"));
    }

    // dwTime is the low 32 bits of the tick count.
    let tick_count = unsafe { GetTickCount64() } as u32;
    Ok(Duration::from_millis(
        tick_count.wrapping_sub(last.dwTime).into(),
    ))
}

#[derive(Default)]
pub struct WindowsWindowManager {}

impl WindowsWindowManager {
    pub fn new() -> Self {
        Self {}
    }
}

impl WindowManager for WindowsWindowManager {
    fn get_active_window_title(&mut self) -> Result<String> {
        get_active_title().inspect_err(|e| error!("Failed to get active window {e:?}"))
    }

    fn get_idle_time(&mut self) -> Result<Duration> {
        get_idle_time().inspect_err(|e| error!("Failed to get idle time {e:?}"))
    }
}
