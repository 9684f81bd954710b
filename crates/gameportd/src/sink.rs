use colored::Colorize;
use gameport_core::{Axis, ButtonId, VirtualAxisState, BUTTON_COUNT};
use gameport_session::{DeviceSink, SinkError, SinkProvider};

use crate::print_debug;

/// Provider for `--dry-run`: logs mapped values instead of driving a device.
pub(crate) struct DryRunProvider;

impl SinkProvider for DryRunProvider {
    fn acquire(&self, device_id: u32) -> Result<Box<dyn DeviceSink>, SinkError> {
        print_debug!("dry run: virtual joystick {device_id} acquired");
        Ok(Box::new(DryRunSink {
            device_id,
            state: VirtualAxisState::centered(),
        }))
    }
}

pub(crate) struct DryRunSink {
    device_id: u32,
    state: VirtualAxisState,
}

impl DeviceSink for DryRunSink {
    fn set_axis(&mut self, axis: Axis, value: u16) -> Result<(), SinkError> {
        self.state.axes[axis.index()] = (axis, value);
        Ok(())
    }

    fn set_button(&mut self, button: ButtonId, pressed: bool) -> Result<(), SinkError> {
        if let Some(slot) = self
            .state
            .buttons
            .iter_mut()
            .find(|(id, _)| *id == button)
        {
            slot.1 = pressed;
        }
        Ok(())
    }

    fn forward(&mut self, state: &VirtualAxisState) -> Result<(), SinkError> {
        if *state == self.state {
            return Ok(());
        }
        self.state = *state;
        print_debug!("joystick {}: {}", self.device_id, describe(state));
        Ok(())
    }
}

fn describe(state: &VirtualAxisState) -> String {
    let mut out = String::new();
    for (axis, value) in state.axes {
        out.push_str(&format!("{axis}={value} "));
    }
    let mut buttons = [' '; BUTTON_COUNT];
    for (slot, (_, pressed)) in buttons.iter_mut().zip(state.buttons) {
        *slot = if pressed { '#' } else { '.' };
    }
    out.push('[');
    out.extend(buttons);
    out.push(']');
    out
}
