//! Greeting policy
//!
//! Decides which greeting a visitor sees from three pieces of UI state:
//! whether the page has loaded, whether the visitor is signed in, and an
//! optional display name.

pub const LOADING: &str = "Loading...";
pub const NOT_SIGNED_IN: &str = "Not signed in";
pub const FALLBACK_NAME: &str = "User";

/// Inputs of a single greeting decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreetingRequest {
    pub loaded: bool,
    pub signed_in: bool,
    pub full_name: Option<String>,
}

impl Default for GreetingRequest {
    fn default() -> Self {
        Self {
            loaded: true,
            signed_in: false,
            full_name: None,
        }
    }
}

impl GreetingRequest {
    pub fn decide(&self) -> String {
        decide(self.loaded, self.signed_in, self.full_name.as_deref())
    }
}

/// Pick the greeting text.
///
/// Rules are checked in order: not loaded wins over everything, then a
/// signed-in visitor is greeted by name (or `User` when the name is missing
/// or empty), otherwise the visitor is told they are not signed in.
pub fn decide(loaded: bool, signed_in: bool, display_name: Option<&str>) -> String {
    if !loaded {
        return LOADING.to_string();
    }

    if signed_in {
        let name = display_name
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_NAME);
        return format!("Hello {name}!");
    }

    NOT_SIGNED_IN.to_string()
}
