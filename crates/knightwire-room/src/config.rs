//! Room configuration.

use std::time::Duration;

/// Configuration shared by every room in a [`RoomStore`](crate::RoomStore).
///
/// Override individual fields with struct update syntax:
///
/// ```rust
/// use std::time::Duration;
/// use knightwire_room::RoomConfig;
///
/// let config = RoomConfig {
///     deletion_grace: Duration::from_secs(30),
///     ..RoomConfig::default()
/// };
/// assert_eq!(config.max_code_attempts, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    /// How long a room may sit with no attached connections before it is
    /// deleted. Any join within the window cancels the deletion.
    pub deletion_grace: Duration,

    /// How many random codes to try before giving up on room creation.
    pub max_code_attempts: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            deletion_grace: Duration::from_secs(5 * 60),
            max_code_attempts: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.deletion_grace, Duration::from_secs(300));
        assert_eq!(config.max_code_attempts, 64);
    }

    #[test]
    fn test_room_config_struct_update_keeps_other_defaults() {
        let config = RoomConfig {
            max_code_attempts: 1,
            ..RoomConfig::default()
        };
        assert_eq!(config.deletion_grace, Duration::from_secs(300));
        assert_eq!(config.max_code_attempts, 1);
    }
}
