use crate::frame::TelemetryFrame;
use crate::policy::AxisPolicy;
use crate::types::{Axis, ButtonId, AXIS_CENTER, AXIS_MAX, BUTTON_COUNT, RAW_AXIS_MAX};

/// Mapped output ready to be written to the virtual joystick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VirtualAxisState {
    pub axes: [(Axis, u16); 4],
    /// Button id and pressed flag.
    pub buttons: [(ButtonId, bool); BUTTON_COUNT],
}

impl Default for VirtualAxisState {
    fn default() -> Self {
        Self::centered()
    }
}

impl VirtualAxisState {
    /// All axes centered, all buttons released.
    pub fn centered() -> Self {
        Self {
            axes: Axis::ALL.map(|axis| (axis, AXIS_CENTER)),
            buttons: [(1, false), (2, false), (3, false), (4, false)],
        }
    }

    /// Value of a single logical axis.
    pub fn axis(&self, axis: Axis) -> u16 {
        self.axes[axis.index()].1
    }

    /// `(X, Y)` values.
    pub fn channel1(&self) -> (u16, u16) {
        (self.axis(Axis::X), self.axis(Axis::Y))
    }

    /// `(Z, RX)` values.
    pub fn channel2(&self) -> (u16, u16) {
        (self.axis(Axis::Z), self.axis(Axis::RX))
    }

    /// Pressed flag of a button, `None` for unknown ids.
    pub fn button(&self, id: ButtonId) -> Option<bool> {
        self.buttons
            .iter()
            .find(|(button, _)| *button == id)
            .map(|(_, pressed)| *pressed)
    }
}

/// Scale a raw `[0, 1023]` reading to the `[0, 32767]` device range.
///
/// Readings outside the nominal domain are clamped to the device range.
#[inline]
pub fn scale_axis(raw: f64) -> u16 {
    let scaled = (raw * f64::from(AXIS_MAX) / RAW_AXIS_MAX).round();
    if scaled.is_nan() {
        return AXIS_CENTER;
    }
    scaled.clamp(0.0, f64::from(AXIS_MAX)) as u16
}

/// Map a frame to the virtual joystick state under `policy`.
///
/// Swap is applied first, then disabled channels are forced to center.
pub fn map_frame(frame: &TelemetryFrame, policy: AxisPolicy) -> VirtualAxisState {
    let frame = if policy.swap { frame.swapped() } else { *frame };

    let (x, y) = channel(frame.x1, frame.y1, policy.axis1_enabled);
    let (z, rx) = channel(frame.x2, frame.y2, policy.axis2_enabled);

    let mut buttons = [(0, false); BUTTON_COUNT];
    for (i, (slot, level)) in buttons.iter_mut().zip(frame.buttons).enumerate() {
        *slot = (i as ButtonId + 1, level != 0);
    }

    VirtualAxisState {
        axes: [(Axis::X, x), (Axis::Y, y), (Axis::Z, z), (Axis::RX, rx)],
        buttons,
    }
}

fn channel(x: f64, y: f64, enabled: bool) -> (u16, u16) {
    if enabled {
        (scale_axis(x), scale_axis(y))
    } else {
        (AXIS_CENTER, AXIS_CENTER)
    }
}
