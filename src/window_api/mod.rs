//! Contains logic for probing the focused window in different environments.
//! [GenericWindowManager] is the main artifact of this module that abstracts
//! the operations.

#[cfg(feature = "win")]
pub mod win;
#[cfg(feature = "x11")]
pub mod x11;

#[cfg(feature = "win")]
extern crate windows;

#[cfg(feature = "x11")]
extern crate xcb;

use std::time::Duration;

use anyhow::Result;

/// Intended to serve as a contract windows and linux systems must implement.
#[cfg_attr(test, mockall::automock)]
pub trait WindowManager {
    /// Raw title of the focused window. For example 'bash in hello' or '● report.docx - Word'.
    /// An empty string means nothing is focused.
    fn get_active_window_title(&mut self) -> Result<String>;

    /// Retrieve amount of time user has been inactive.
    fn get_idle_time(&mut self) -> Result<Duration>;
}

/// Serves as a cross-compatible WindowManager implementation.
pub struct GenericWindowManager {
    inner: Box<dyn WindowManager>,
}

impl GenericWindowManager {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                use win::WindowsWindowManager;
                Ok(Self {
                    inner: Box::new(WindowsWindowManager::new()),
                })
            }
            else if #[cfg(feature = "x11")] {
                use x11::LinuxWindowManager;
                Ok(Self {
                    inner: Box::new(LinuxWindowManager::new()?),
                })
            }
            else {
                // Keeps the crate buildable for tests on machines without a window system.
                Err(anyhow::anyhow!(
                    "No window manager was compiled in, enable the `x11` or `win` feature"
                ))
            }
        }
    }
}

impl WindowManager for GenericWindowManager {
    fn get_active_window_title(&mut self) -> Result<String> {
        self.inner.get_active_window_title()
    }

    fn get_idle_time(&mut self) -> Result<Duration> {
        self.inner.get_idle_time()
    }
}
