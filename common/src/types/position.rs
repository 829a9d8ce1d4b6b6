use std::fmt;

/// A position provider the platform can be asked for a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    /// Satellite-based provider (primary).
    Satellite,
    /// Network-based provider (secondary).
    Network,
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderId::Satellite => write!(f, "satellite"),
            ProviderId::Network => write!(f, "network"),
        }
    }
}

/// Whether a fix came from a provider cache or a live update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixSource {
    Cached,
    Live,
}

/// A single resolved position reading. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub accuracy_meters: Option<f64>,
    pub speed_mps: Option<f64>,
    pub bearing_degrees: Option<f64>,
    pub provider: ProviderId,
    pub source: FixSource,
}

impl PositionFix {
    pub fn new(latitude: f64, longitude: f64, provider: ProviderId, source: FixSource) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy_meters: None,
            speed_mps: None,
            bearing_degrees: None,
            provider,
            source,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_accuracy(mut self, accuracy_meters: f64) -> Self {
        self.accuracy_meters = Some(accuracy_meters);
        self
    }

    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }

    pub fn with_bearing(mut self, bearing_degrees: f64) -> Self {
        self.bearing_degrees = Some(bearing_degrees);
        self
    }

    /// Same fix, re-tagged with the given source.
    pub fn tagged(mut self, source: FixSource) -> Self {
        self.source = source;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_builder() {
        let fix = PositionFix::new(52.52, 13.405, ProviderId::Satellite, FixSource::Cached)
            .with_altitude(34.0)
            .with_accuracy(5.0);

        assert_eq!(fix.latitude, 52.52);
        assert_eq!(fix.altitude, Some(34.0));
        assert_eq!(fix.accuracy_meters, Some(5.0));
        assert_eq!(fix.speed_mps, None);
        assert_eq!(fix.bearing_degrees, None);
    }

    #[test]
    fn test_tagged() {
        let fix = PositionFix::new(0.0, 0.0, ProviderId::Network, FixSource::Cached);
        assert_eq!(fix.tagged(FixSource::Live).source, FixSource::Live);
    }
}
