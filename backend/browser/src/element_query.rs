//! Element Queries
//!
//! Locates elements through `WebDriver:FindElement` using any of the WebDriver
//! location strategies.

use std::fmt;

use serde_json::{json, Map, Value};

use crate::client::MarionetteClient;
use crate::error::ClientResult;

pub const FIND_ELEMENT: &str = "WebDriver:FindElement";

/// Key under which W3C element references are returned.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Location strategies understood by Marionette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Id,
    Name,
    ClassName,
    TagName,
    CssSelector,
    LinkText,
    PartialLinkText,
    XPath,
    Anon,
    AnonAttribute,
}

impl Strategy {
    pub const ALL: [Strategy; 10] = [
        Strategy::Id,
        Strategy::Name,
        Strategy::ClassName,
        Strategy::TagName,
        Strategy::CssSelector,
        Strategy::LinkText,
        Strategy::PartialLinkText,
        Strategy::XPath,
        Strategy::Anon,
        Strategy::AnonAttribute,
    ];

    /// Wire name of the strategy (the `using` parameter).
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Id => "id",
            Strategy::Name => "name",
            Strategy::ClassName => "class name",
            Strategy::TagName => "tag name",
            Strategy::CssSelector => "css selector",
            Strategy::LinkText => "link text",
            Strategy::PartialLinkText => "partial link text",
            Strategy::XPath => "xpath",
            Strategy::Anon => "anon",
            Strategy::AnonAttribute => "anon attribute",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MarionetteClient {
    /// Find the first element matching `value` under the `using` strategy.
    ///
    /// `using` goes to the remote end verbatim; unknown strategies are for the
    /// browser to reject.
    pub fn find_element(&mut self, using: &str, value: &str) -> ClientResult<Map<String, Value>> {
        self.send_command(FIND_ELEMENT, &json!({ "using": using, "value": value }))
    }

    pub fn find_element_by(
        &mut self,
        strategy: Strategy,
        value: &str,
    ) -> ClientResult<Map<String, Value>> {
        self.find_element(strategy.as_str(), value)
    }
}

/// Pull the element reference out of a `WebDriver:FindElement` result, e.g.
/// `{"value": {"element-6066-11e4-a52e-4f735466cecf": "0acd2abe-..."}}`.
pub fn element_reference(payload: &Map<String, Value>) -> Option<&str> {
    payload
        .get("value")
        .and_then(|v| v.get(ELEMENT_KEY))
        .and_then(Value::as_str)
}
