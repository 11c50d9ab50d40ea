/// Interactive console attached to the communication channel.
pub trait Console {
    /// Detach the console so the channel carries only protocol bytes.
    fn detach(&mut self) -> std::io::Result<()>;
}

/// No interactive console exists; nothing to detach.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoConsole;

impl Console for NoConsole {
    fn detach(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(unix)]
pub use tty::TtyConsole;

#[cfg(unix)]
mod tty {
    use std::io::IsTerminal;
    use std::os::fd::RawFd;

    use tracing::debug;

    use super::Console;

    /// Console on the process standard streams.
    ///
    /// Detaching puts any terminal among stdin/stdout into raw mode: no echo,
    /// no line editing, no signal keys (Ctrl-C arrives as a plain byte) and no
    /// output newline translation. Saved settings are restored on drop.
    #[derive(Default)]
    pub struct TtyConsole {
        saved: Vec<(RawFd, libc::termios)>,
    }

    impl TtyConsole {
        pub fn new() -> Self {
            Self::default()
        }

        /// True once at least one terminal has been switched to raw mode.
        pub fn is_detached(&self) -> bool {
            !self.saved.is_empty()
        }

        fn make_raw(&mut self, fd: RawFd) -> std::io::Result<()> {
            if self.saved.iter().any(|(saved, _)| *saved == fd) {
                return Ok(());
            }

            // SAFETY: `termios` is plain old data, fully written by `tcgetattr`.
            let mut original: libc::termios = unsafe { std::mem::zeroed() };
            // SAFETY: `fd` is a terminal and `original` is a valid writable pointer.
            if unsafe { libc::tcgetattr(fd, &mut original) } != 0 {
                return Err(std::io::Error::last_os_error());
            }

            let mut raw = original;
            // SAFETY: `raw` is an initialised termios copied from `original`.
            unsafe { libc::cfmakeraw(&mut raw) };
            // SAFETY: `fd` is a terminal and `raw` is a valid termios.
            if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &raw) } != 0 {
                return Err(std::io::Error::last_os_error());
            }

            debug!(fd, "terminal switched to raw mode");
            self.saved.push((fd, original));
            Ok(())
        }
    }

    impl Console for TtyConsole {
        fn detach(&mut self) -> std::io::Result<()> {
            if std::io::stdin().is_terminal() {
                self.make_raw(libc::STDIN_FILENO)?;
            }
            if std::io::stdout().is_terminal() {
                self.make_raw(libc::STDOUT_FILENO)?;
            }
            Ok(())
        }
    }

    impl Drop for TtyConsole {
        fn drop(&mut self) {
            for (fd, original) in self.saved.drain(..).rev() {
                // SAFETY: restoring settings previously read from the same descriptor.
                let _ = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &original) };
            }
        }
    }

    impl std::fmt::Debug for TtyConsole {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("TtyConsole")
                .field("raw_fds", &self.saved.iter().map(|(fd, _)| *fd).collect::<Vec<_>>())
                .finish()
        }
    }
}
