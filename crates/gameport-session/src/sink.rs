use gameport_core::{Axis, ButtonId, VirtualAxisState};

use crate::error::SinkError;

/// A virtual joystick the mapped state is written to.
///
/// Calls are synchronous; writing the same value twice is harmless.
pub trait DeviceSink: Send {
    fn set_axis(&mut self, axis: Axis, value: u16) -> Result<(), SinkError>;

    fn set_button(&mut self, button: ButtonId, pressed: bool) -> Result<(), SinkError>;

    /// Write a whole mapped state, axes first, stopping at the first error.
    fn forward(&mut self, state: &VirtualAxisState) -> Result<(), SinkError> {
        for &(axis, value) in &state.axes {
            self.set_axis(axis, value)?;
        }
        for &(button, pressed) in &state.buttons {
            self.set_button(button, pressed)?;
        }
        Ok(())
    }
}

/// Acquires virtual joysticks by numeric id.
pub trait SinkProvider: Send + Sync {
    fn acquire(&self, device_id: u32) -> Result<Box<dyn DeviceSink>, SinkError>;
}

impl<T: SinkProvider + ?Sized> SinkProvider for Box<T> {
    fn acquire(&self, device_id: u32) -> Result<Box<dyn DeviceSink>, SinkError> {
        (**self).acquire(device_id)
    }
}
