//! Development bypass. When enabled (`DEV_BYPASS_AUTH=true`), services skip
//! session resolution and both stores and answer from the fixture graph in
//! [`fixtures`]. The flag is read once at startup and handed to every service.

pub mod fixtures;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DevBypass(bool);

impl DevBypass {
    #[cfg(test)]
    pub fn enabled() -> Self {
        Self(true)
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self(false)
    }

    /// Interprets the raw `DEV_BYPASS_AUTH` value. Only `true` (any case) enables it.
    pub fn from_env_value(value: Option<&str>) -> Self {
        Self(value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true")))
    }

    pub fn is_enabled(&self) -> bool {
        self.0
    }
}
