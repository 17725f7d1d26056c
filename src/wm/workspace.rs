//! Workspace Module
//!
//! Desktop names and the current desktop, as published by the running WM.

/// Snapshot of the virtual desktops
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopState {
    /// Current desktop index (0-based)
    pub current: u32,

    /// One name per desktop
    pub names: Vec<String>,
}

impl DesktopState {
    /// Default names ("Desktop 1", ...) for `count` desktops
    pub fn new(count: u32) -> Self {
        let names = (0..count).map(|i| format!("Desktop {}", i + 1)).collect();
        Self { current: 0, names }
    }

    pub fn with_names(names: Vec<String>) -> Self {
        Self { current: 0, names }
    }

    pub fn count(&self) -> u32 {
        self.names.len() as u32
    }

    pub fn name(&self, desktop: u32) -> String {
        self.names
            .get(desktop as usize)
            .cloned()
            .unwrap_or_else(|| format!("Desktop {}", desktop + 1))
    }

    /// Desktop to the right, wrapping
    pub fn next(&self) -> u32 {
        if self.count() == 0 {
            return 0;
        }
        (self.current + 1) % self.count()
    }

    /// Desktop to the left, wrapping
    pub fn previous(&self) -> u32 {
        if self.count() == 0 {
            return 0;
        }
        (self.current + self.count() - 1) % self.count()
    }

    /// Fill in missing names so there is one per desktop
    pub fn resize(&mut self, count: u32) {
        let count = count as usize;
        self.names.truncate(count);
        while self.names.len() < count {
            let n = self.names.len() + 1;
            self.names.push(format!("Desktop {}", n));
        }
        if self.current as usize >= count {
            self.current = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desktop_wrapping() {
        let mut desktops = DesktopState::new(4);
        assert_eq!(desktops.previous(), 3);
        desktops.current = 3;
        assert_eq!(desktops.next(), 0);
        assert_eq!(desktops.name(1), "Desktop 2");
    }

    #[test]
    fn test_resize_names() {
        let mut desktops = DesktopState::with_names(vec!["web".into()]);
        desktops.current = 0;
        desktops.resize(3);
        assert_eq!(desktops.names, vec!["web", "Desktop 2", "Desktop 3"]);
        desktops.current = 2;
        desktops.resize(1);
        assert_eq!(desktops.count(), 1);
        assert_eq!(desktops.current, 0);
    }
}
