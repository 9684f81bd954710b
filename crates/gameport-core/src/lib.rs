mod frame;
mod mapper;
mod policy;
mod types;

pub use frame::{decode_line, parse_line, RejectReason, TelemetryFrame, FIELD_COUNT};
pub use mapper::{map_frame, scale_axis, VirtualAxisState};
pub use policy::{AtomicAxisPolicy, AxisPolicy};
pub use types::{
    Axis, ButtonId, AXIS_CENTER, AXIS_MAX, AXIS_MIN, BUTTON_COUNT, RAW_AXIS_MAX,
};
