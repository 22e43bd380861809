// Janus evdev Input
// Exclusive reader for one physical keyboard with dropped-event recovery

use std::collections::VecDeque;
use std::io::Read;
use std::os::unix::io::AsRawFd;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::{Duration, Instant};

use evdev::raw_stream::RawDevice;
use evdev::EventType;

use super::{InputError, InputMessage, InputSource, Wake};
use crate::{Edge, Key};

const SYN_REPORT: u16 = 0;
const SYN_DROPPED: u16 = 3;

enum Readiness {
    Readable,
    TimedOut,
    Interrupted,
}

/// Reads key events from one evdev device.
///
/// After `SYN_DROPPED` every event up to the next `SYN_REPORT` is discarded
/// and replaced by a `Resync` snapshot of the keys the kernel reports down.
pub struct EvdevSource {
    device: RawDevice,
    name: String,
    pending: VecDeque<InputMessage>,
    wakeup: Option<UnixStream>,
    grabbed: bool,
    dropping: bool,
}

impl EvdevSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let device = RawDevice::open(path).map_err(|source| InputError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let name = device.name().unwrap_or("Unknown").to_string();
        log::info!("Opened {} ({})", path.display(), name);

        Ok(Self {
            device,
            name,
            pending: VecDeque::new(),
            wakeup: None,
            grabbed: false,
            dropping: false,
        })
    }

    /// Wake `next_event` with `Wake::Interrupted` whenever `wakeup` becomes readable
    pub fn with_wakeup(mut self, wakeup: UnixStream) -> Result<Self, InputError> {
        wakeup.set_nonblocking(true)?;
        self.wakeup = Some(wakeup);
        Ok(self)
    }

    /// Take exclusive ownership of the device's events
    pub fn grab(&mut self) -> Result<(), InputError> {
        // A previous instance that crashed may still hold the grab.
        let _ = self.device.ungrab();
        self.device.grab().map_err(InputError::Grab)?;
        self.grabbed = true;
        log::info!("Grabbed {}", self.name);
        Ok(())
    }

    pub fn ungrab(&mut self) {
        if self.grabbed {
            let _ = self.device.ungrab();
            self.grabbed = false;
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Keys the physical device can report
    pub fn supported_keys(&self) -> Vec<Key> {
        self.device
            .supported_keys()
            .map(|keys| keys.iter().map(|k| Key::from(k.code())).collect())
            .unwrap_or_default()
    }

    fn key_snapshot(&self) -> Result<Vec<Key>, InputError> {
        let state = self.device.get_key_state()?;
        Ok(state.iter().map(|k| Key::from(k.code())).collect())
    }

    fn wait_readable(&mut self, timeout: Option<Duration>) -> Result<Readiness, InputError> {
        let wake_fd = self.wakeup.as_ref().map_or(-1, |w| w.as_raw_fd());
        let mut fds = [
            libc::pollfd {
                fd: self.device.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
            // Negative fds are ignored by ppoll.
            libc::pollfd {
                fd: wake_fd,
                events: libc::POLLIN,
                revents: 0,
            },
        ];
        let timespec = timeout.map(|t| libc::timespec {
            tv_sec: t.as_secs() as libc::time_t,
            tv_nsec: t.subsec_nanos() as libc::c_long,
        });
        let timespec_ptr = timespec
            .as_ref()
            .map_or(std::ptr::null(), |ts| ts as *const libc::timespec);

        let rc = unsafe {
            libc::ppoll(
                fds.as_mut_ptr(),
                fds.len() as libc::nfds_t,
                timespec_ptr,
                std::ptr::null(),
            )
        };

        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                return Ok(Readiness::Interrupted);
            }
            return Err(InputError::Io(err));
        }
        if rc == 0 {
            return Ok(Readiness::TimedOut);
        }
        if fds[1].revents & libc::POLLIN != 0 {
            self.drain_wakeup();
            return Ok(Readiness::Interrupted);
        }
        // POLLERR/POLLHUP surface as read errors below.
        Ok(Readiness::Readable)
    }

    fn drain_wakeup(&mut self) {
        if let Some(wakeup) = self.wakeup.as_mut() {
            let mut buf = [0u8; 64];
            while matches!(wakeup.read(&mut buf), Ok(n) if n > 0) {}
        }
    }

    fn read_batch(&mut self) -> Result<(), InputError> {
        let events: Vec<evdev::InputEvent> = self.device.fetch_events()?.collect();
        for event in events {
            let event_type = event.event_type();
            if event_type == EventType::SYNCHRONIZATION {
                match event.code() {
                    SYN_DROPPED => {
                        log::warn!("{}: input events dropped, resynchronizing", self.name);
                        self.dropping = true;
                    }
                    SYN_REPORT if self.dropping => {
                        self.dropping = false;
                        let snapshot = self.key_snapshot()?;
                        log::warn!("{}: resynced, {} key(s) down", self.name, snapshot.len());
                        self.pending.push_back(InputMessage::Resync(snapshot));
                    }
                    _ => {}
                }
            } else if event_type == EventType::KEY && !self.dropping {
                match Edge::from_value(event.value()) {
                    Some(edge) => self
                        .pending
                        .push_back(InputMessage::key(Key::from(event.code()), edge)),
                    None => log::debug!("Ignoring key {} with value {}", event.code(), event.value()),
                }
            }
        }
        Ok(())
    }
}

impl InputSource for EvdevSource {
    fn next_event(&mut self, timeout: Option<Duration>) -> Result<Wake, InputError> {
        let started = Instant::now();
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Ok(Wake::Input(message));
            }
            // A batch may hold nothing we forward (MSC_SCAN, LEDs); keep waiting
            // for whatever is left of the timeout.
            let remaining = timeout.map(|t| t.saturating_sub(started.elapsed()));
            match self.wait_readable(remaining)? {
                Readiness::Readable => self.read_batch()?,
                Readiness::TimedOut => return Ok(Wake::Timeout),
                Readiness::Interrupted => return Ok(Wake::Interrupted),
            }
        }
    }
}

/// The grab must be released on every exit path, otherwise the keyboard
/// stays dead for the rest of the session.
impl Drop for EvdevSource {
    fn drop(&mut self) {
        self.ungrab();
    }
}
