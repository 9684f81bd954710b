//! Virtual joystick backed by Linux uinput.

use std::io;

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{
    AbsInfo, AbsoluteAxisType, AttributeSet, BusType, EventType, InputEvent, InputId, Key,
    UinputAbsSetup,
};
use gameport_core::{
    Axis, ButtonId, VirtualAxisState, AXIS_CENTER, AXIS_MAX, AXIS_MIN, BUTTON_COUNT,
};

use crate::error::SinkError;
use crate::sink::{DeviceSink, SinkProvider};

const VENDOR_ID: u16 = 0x1209;
const PRODUCT_ID: u16 = 0x6770;

/// Joystick buttons 1 to 4, in order.
const BUTTON_KEYS: [Key; BUTTON_COUNT] =
    [Key::BTN_TRIGGER, Key::BTN_THUMB, Key::BTN_THUMB2, Key::BTN_TOP];

/// [`SinkProvider`] creating a uinput joystick per acquisition.
/// Requires write access to `/dev/uinput`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UinputProvider;

impl SinkProvider for UinputProvider {
    fn acquire(&self, device_id: u32) -> Result<Box<dyn DeviceSink>, SinkError> {
        Ok(Box::new(UinputJoystick::new(device_id)?))
    }
}

/// Four axis, four button virtual joystick.
///
/// Only changed values are emitted. The device is removed on drop.
pub struct UinputJoystick {
    device: VirtualDevice,
    axes: [u16; 4],
    buttons: [bool; BUTTON_COUNT],
}

impl UinputJoystick {
    pub fn new(device_id: u32) -> Result<Self, SinkError> {
        let acquire = |source| SinkError::Acquire { device_id, source };
        let version = u16::try_from(device_id).map_err(|_| {
            acquire(io::Error::new(
                io::ErrorKind::InvalidInput,
                "device id does not fit in 16 bits",
            ))
        })?;

        let mut keys = AttributeSet::<Key>::new();
        for key in BUTTON_KEYS {
            keys.insert(key);
        }

        let name = format!("gameport joystick {device_id}");
        let mut builder = VirtualDeviceBuilder::new()
            .map_err(acquire)?
            .name(&name)
            .input_id(InputId::new(
                BusType::BUS_VIRTUAL,
                VENDOR_ID,
                PRODUCT_ID,
                version,
            ))
            .with_keys(&keys)
            .map_err(acquire)?;

        for axis in Axis::ALL {
            let setup = UinputAbsSetup::new(
                axis_code(axis),
                AbsInfo::new(
                    i32::from(AXIS_CENTER),
                    i32::from(AXIS_MIN),
                    i32::from(AXIS_MAX),
                    0,
                    0,
                    1,
                ),
            );
            builder = builder.with_absolute_axis(&setup).map_err(acquire)?;
        }

        let device = builder.build().map_err(acquire)?;
        log::debug!("created uinput joystick {name:?}");

        Ok(Self {
            device,
            axes: [AXIS_CENTER; 4],
            buttons: [false; BUTTON_COUNT],
        })
    }

    fn emit(&mut self, events: &[InputEvent]) -> Result<(), SinkError> {
        if events.is_empty() {
            return Ok(());
        }
        self.device.emit(events).map_err(SinkError::Write)
    }
}

impl DeviceSink for UinputJoystick {
    fn set_axis(&mut self, axis: Axis, value: u16) -> Result<(), SinkError> {
        if self.axes[axis.index()] == value {
            return Ok(());
        }
        self.emit(&[axis_event(axis, value)])?;
        self.axes[axis.index()] = value;
        Ok(())
    }

    fn set_button(&mut self, button: ButtonId, pressed: bool) -> Result<(), SinkError> {
        let Some(slot) = button_slot(button) else {
            return Ok(());
        };
        if self.buttons[slot] == pressed {
            return Ok(());
        }
        self.emit(&[button_event(slot, pressed)])?;
        self.buttons[slot] = pressed;
        Ok(())
    }

    /// Emits all changes of a frame as one report.
    fn forward(&mut self, state: &VirtualAxisState) -> Result<(), SinkError> {
        let mut events = Vec::with_capacity(state.axes.len() + state.buttons.len());
        let mut axes = self.axes;
        let mut buttons = self.buttons;

        for &(axis, value) in &state.axes {
            if axes[axis.index()] != value {
                axes[axis.index()] = value;
                events.push(axis_event(axis, value));
            }
        }
        for &(button, pressed) in &state.buttons {
            if let Some(slot) = button_slot(button) {
                if buttons[slot] != pressed {
                    buttons[slot] = pressed;
                    events.push(button_event(slot, pressed));
                }
            }
        }

        self.emit(&events)?;
        self.axes = axes;
        self.buttons = buttons;
        Ok(())
    }
}

fn axis_code(axis: Axis) -> AbsoluteAxisType {
    match axis {
        Axis::X => AbsoluteAxisType::ABS_X,
        Axis::Y => AbsoluteAxisType::ABS_Y,
        Axis::Z => AbsoluteAxisType::ABS_Z,
        Axis::RX => AbsoluteAxisType::ABS_RX,
    }
}

fn button_slot(button: ButtonId) -> Option<usize> {
    let slot = usize::from(button).checked_sub(1)?;
    (slot < BUTTON_COUNT).then_some(slot)
}

fn axis_event(axis: Axis, value: u16) -> InputEvent {
    InputEvent::new(EventType::ABSOLUTE, axis_code(axis).0, i32::from(value))
}

fn button_event(slot: usize, pressed: bool) -> InputEvent {
    InputEvent::new(EventType::KEY, BUTTON_KEYS[slot].code(), i32::from(pressed))
}
