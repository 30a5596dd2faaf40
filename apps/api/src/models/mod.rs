pub mod job;
pub mod profile;
pub mod resume;
pub mod sections;
pub mod subscription;
pub mod user;

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent patch field (`None`) from an explicit `null` (`Some(None)`).
/// Use with `#[serde(default, deserialize_with = "double_option")]`.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
