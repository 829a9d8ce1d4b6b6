use crate::types::channel::ChannelId;
use crate::types::reading::Reading;

/// Latest-known reading per reporting channel.
///
/// The snapshot holds exactly one entry per channel that has reported at
/// least once; a later reading replaces the earlier one in place. Entry
/// order is the order in which channels first reported. The snapshot is
/// replaced wholesale on every emission; it is not an accumulating log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: Vec<Reading>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the entry for the reading's channel, or appends it if the
    /// channel has not reported yet.
    pub fn update(&mut self, reading: Reading) {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.channel() == reading.channel())
        {
            Some(entry) => *entry = reading,
            None => self.entries.push(reading),
        }
    }

    /// Latest reading for a channel, if it has reported this session.
    pub fn latest(&self, channel: ChannelId) -> Option<&Reading> {
        self.entries.iter().find(|entry| entry.channel() == channel)
    }

    /// Entries in first-report order.
    pub fn entries(&self) -> &[Reading] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
