//! Partition of a fleet into bounded transfer windows

use std::ops::Range;

/// One window: a contiguous run of devices in enumeration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetWindow {
    /// Window number within the repetition
    pub index: usize,
    /// Devices covered by the window
    pub devices: Range<usize>,
}

impl FleetWindow {
    /// Number of devices in the window
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the window is empty (never yielded by [`FleetWindows`])
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Iterator over the disjoint windows covering `0..fleet_size`
///
/// Every window but the last holds exactly `window_size` devices; the union
/// of all windows is the fleet, each device appearing once.
#[derive(Debug, Clone)]
pub struct FleetWindows {
    fleet_size: usize,
    window_size: usize,
    next_device: usize,
    next_index: usize,
}

impl FleetWindows {
    /// Windows of at most `window_size` devices (a zero size is treated as 1)
    #[must_use]
    pub fn new(fleet_size: usize, window_size: usize) -> Self {
        Self {
            fleet_size,
            window_size: window_size.max(1),
            next_device: 0,
            next_index: 0,
        }
    }

    /// Window size in effect
    #[must_use]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Total number of windows: `ceil(fleet_size / window_size)`
    #[must_use]
    pub fn count_total(&self) -> usize {
        self.fleet_size.div_ceil(self.window_size)
    }
}

impl Iterator for FleetWindows {
    type Item = FleetWindow;

    fn next(&mut self) -> Option<FleetWindow> {
        if self.next_device >= self.fleet_size {
            return None;
        }
        let start = self.next_device;
        let end = (start + self.window_size).min(self.fleet_size);
        let window = FleetWindow {
            index: self.next_index,
            devices: start..end,
        };
        self.next_device = end;
        self.next_index += 1;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.fleet_size - self.next_device.min(self.fleet_size))
            .div_ceil(self.window_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FleetWindows {}
