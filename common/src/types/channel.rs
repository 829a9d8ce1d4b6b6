use std::fmt;

/// Identifies one independent hardware data channel.
///
/// # Examples
///
/// ```
/// use common::types::channel::ChannelId;
///
/// assert_eq!(ChannelId::Accelerometer.arity(), 3);
/// assert_eq!(ChannelId::Light.arity(), 1);
/// assert_eq!(ChannelId::try_from("gyroscope").unwrap(), ChannelId::Gyroscope);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelId {
    Accelerometer,
    Gyroscope,
    Light,
    Magnetometer,
    Pressure,
    Proximity,
    Temperature,
}

impl ChannelId {
    /// All channels a device inventory may report, in a stable order.
    pub const ALL: [ChannelId; 7] = [
        ChannelId::Accelerometer,
        ChannelId::Gyroscope,
        ChannelId::Light,
        ChannelId::Magnetometer,
        ChannelId::Pressure,
        ChannelId::Proximity,
        ChannelId::Temperature,
    ];

    /// Number of values a single reading from this channel carries.
    pub fn arity(&self) -> usize {
        match self {
            ChannelId::Accelerometer | ChannelId::Gyroscope | ChannelId::Magnetometer => 3,
            ChannelId::Light
            | ChannelId::Pressure
            | ChannelId::Proximity
            | ChannelId::Temperature => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChannelId::Accelerometer => "accelerometer",
            ChannelId::Gyroscope => "gyroscope",
            ChannelId::Light => "light",
            ChannelId::Magnetometer => "magnetometer",
            ChannelId::Pressure => "pressure",
            ChannelId::Proximity => "proximity",
            ChannelId::Temperature => "temperature",
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<&str> for ChannelId {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower_case_value = value.to_lowercase();
        ChannelId::ALL
            .iter()
            .find(|id| lower_case_value.contains(&id.name()[..3.min(id.name().len())]))
            .copied()
            .ok_or(format!("Unknown channel: {}", value))
    }
}

/// Static description of a hardware channel as reported by the device
/// inventory. Immutable once enumerated.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDescriptor {
    pub id: ChannelId,
    pub vendor: String,
    pub power_draw_milliamps: f64,
    pub version_code: i32,
    pub available: bool,
}

impl ChannelDescriptor {
    pub fn new(
        id: ChannelId,
        vendor: &str,
        power_draw_milliamps: f64,
        version_code: i32,
        available: bool,
    ) -> Self {
        Self {
            id,
            vendor: vendor.to_string(),
            power_draw_milliamps,
            version_code,
            available,
        }
    }

    /// Descriptor for a channel the device does not carry.
    pub fn unavailable(id: ChannelId) -> Self {
        Self {
            id,
            vendor: String::new(),
            power_draw_milliamps: 0.0,
            version_code: 0,
            available: false,
        }
    }
}

impl fmt::Display for ChannelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.available {
            write!(
                f,
                "{} (vendor: {}, power: {} mA, version: {})",
                self.id, self.vendor, self.power_draw_milliamps, self.version_code
            )
        } else {
            write!(f, "{}: not available", self.id)
        }
    }
}
