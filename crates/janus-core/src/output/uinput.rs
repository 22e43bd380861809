// Janus uinput Output
// Virtual keyboard that receives the corrected event stream

use evdev::uinput::VirtualDeviceBuilder;
use evdev::{AttributeSet, EventType, InputEvent};

use super::{OutputError, OutputEvent, OutputSink};
use crate::state::PressedKeyState;
use crate::{Edge, Key};

/// Virtual uinput keyboard
pub struct VirtualDevice {
    device: evdev::uinput::VirtualDevice,
    pressed_keys: PressedKeyState,
    closed: bool,
}

impl VirtualDevice {
    /// Name prefix used to recognise (and never grab) our own device
    pub const DEFAULT_NAME: &'static str = crate::config::DEFAULT_VIRTUAL_NAME;

    /// Create a virtual keyboard able to emit every key in `keys`
    pub fn new(name: &str, keys: impl IntoIterator<Item = Key>) -> Result<Self, OutputError> {
        let mut key_set = AttributeSet::<evdev::Key>::new();
        for key in keys {
            key_set.insert(evdev::Key::new(key.code()));
        }

        let device = VirtualDeviceBuilder::new()
            .map_err(|e: std::io::Error| OutputError::DeviceCreation(e.to_string()))?
            .name(name)
            .with_keys(&key_set)
            .map_err(|e: std::io::Error| OutputError::DeviceCreation(e.to_string()))?
            .build()
            .map_err(|e: std::io::Error| OutputError::DeviceCreation(e.to_string()))?;

        log::info!("Created virtual device '{}'", name);

        Ok(Self {
            device,
            pressed_keys: PressedKeyState::new(),
            closed: false,
        })
    }

    /// Release every key still held on the virtual device
    pub fn release_all(&mut self) -> Result<(), OutputError> {
        for key in self.pressed_keys.drain() {
            log::debug!("Releasing stuck output key {}", key);
            self.write(OutputEvent::new(key, Edge::Up))?;
        }
        Ok(())
    }

    /// Release held keys and stop accepting output
    pub fn close(&mut self) -> Result<(), OutputError> {
        if !self.closed {
            self.release_all()?;
            self.closed = true;
        }
        Ok(())
    }

    fn write(&mut self, event: OutputEvent) -> Result<(), OutputError> {
        let raw = InputEvent::new(EventType::KEY, event.key.code(), event.edge.value());
        // emit() terminates the batch with SYN_REPORT.
        self.device
            .emit(&[raw])
            .map_err(|source| OutputError::Write { event, source })
    }
}

impl OutputSink for VirtualDevice {
    fn send(&mut self, event: OutputEvent) -> Result<(), OutputError> {
        self.write(event)?;
        match event.edge {
            Edge::Down => {
                self.pressed_keys.add(event.key);
            }
            Edge::Up => {
                self.pressed_keys.remove(event.key);
            }
            Edge::Repeat => {}
        }
        Ok(())
    }
}

/// Never leave keys stuck down on the virtual device, even when unwinding.
impl Drop for VirtualDevice {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Failed to release virtual keys on drop: {}", e);
        }
    }
}
