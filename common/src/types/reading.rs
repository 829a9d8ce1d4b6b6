use crate::types::channel::ChannelId;

/// Payload of a single reading. Channels report either one value
/// (light, pressure, proximity, temperature) or three (accelerometer,
/// gyroscope, magnetometer).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadingValues {
    Scalar(f64),
    Axes3([f64; 3]),
}

impl ReadingValues {
    pub fn as_slice(&self) -> &[f64] {
        match self {
            ReadingValues::Scalar(value) => std::slice::from_ref(value),
            ReadingValues::Axes3(values) => values,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// A reading always carries at least one value.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// A timestamped reading from one hardware channel.
///
/// # Examples
///
/// ```
/// use common::types::channel::ChannelId;
/// use common::types::reading::Reading;
///
/// let reading = Reading::try_new(ChannelId::Accelerometer, 0.5, vec![0.0, 9.8, 0.2]).unwrap();
/// assert_eq!(reading.timestamp(), 0.5);
/// assert_eq!(reading.values().as_slice(), &[0.0, 9.8, 0.2]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    channel: ChannelId,
    timestamp: f64,
    values: ReadingValues,
}

impl Reading {
    /// Creates a reading, validating the payload arity against the channel.
    pub fn try_new(channel: ChannelId, timestamp: f64, values: Vec<f64>) -> Result<Self, String> {
        if values.len() != channel.arity() {
            return Err(format!(
                "Channel {} expects {} values, got {}",
                channel,
                channel.arity(),
                values.len()
            ));
        }
        let values = match values.len() {
            1 => ReadingValues::Scalar(values[0]),
            _ => ReadingValues::Axes3([values[0], values[1], values[2]]),
        };
        Ok(Self {
            channel,
            timestamp,
            values,
        })
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Monotonic timestamp in seconds since the session clock origin.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn values(&self) -> &ReadingValues {
        &self.values
    }
}
