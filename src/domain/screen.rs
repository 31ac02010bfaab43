// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers

use serde::{Deserialize, Serialize};

/// Requested viewport geometry (§3 Session.screen).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    pub width: i32,
    pub height: i32,
    #[serde(default = "default_dpi")]
    pub dpi: i32,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_dpi() -> i32 {
    96
}

fn default_scale() -> f64 {
    1.0
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            dpi: default_dpi(),
            scale: default_scale(),
        }
    }
}

impl Screen {
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_nonpositive_dimensions() {
        let s = Screen { width: 0, height: 1080, ..Default::default() };
        assert!(!s.is_valid());
    }
}
