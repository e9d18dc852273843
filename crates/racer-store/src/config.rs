//! Bounds applied to client-written values.

use serde::{Deserialize, Serialize};

/// Upper bounds for pushed values. Lower bounds are always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Highest level a client may push. Default: 9999.
    pub max_level: u32,
    /// Highest count a client may push for any resource.
    /// Default: 999,999,999.
    pub max_resource_count: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_level: 9_999,
            max_resource_count: 999_999_999,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_default() {
        let limits = Limits::default();
        assert_eq!(limits.max_level, 9_999);
        assert_eq!(limits.max_resource_count, 999_999_999);
    }
}
