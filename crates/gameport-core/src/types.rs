/// Lowest value of a virtual joystick axis.
pub const AXIS_MIN: u16 = 0;
/// Highest value of a virtual joystick axis (15-bit range).
pub const AXIS_MAX: u16 = 32767;
/// Mid-scale value reported for a centered or disabled axis.
pub const AXIS_CENTER: u16 = 16383;

/// Full-scale reading of the gameport ADC (10-bit range).
pub const RAW_AXIS_MAX: f64 = 1023.0;

/// Number of buttons carried by a frame and exposed by the device.
pub const BUTTON_COUNT: usize = 4;

/// Logical button number on the virtual device, starting from 1.
pub type ButtonId = u8;

/// Logical axes of the virtual joystick.
///
/// Channel 1 is `X`/`Y`, channel 2 is `Z`/`RX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
    RX,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::X, Axis::Y, Axis::Z, Axis::RX];

    /// Position of the axis inside [`Axis::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
            Axis::RX => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
            Axis::RX => "RX",
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
