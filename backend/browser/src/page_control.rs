//! Page Control Actions
//!
//! Navigation and in-page script evaluation on the active browsing context.

use serde_json::{json, Map, Value};

use crate::client::MarionetteClient;
use crate::error::ClientResult;

pub const NAVIGATE: &str = "WebDriver:Navigate";
pub const EXECUTE_SCRIPT: &str = "WebDriver:ExecuteScript";

/// Script timeout sent with every `WebDriver:ExecuteScript`.
pub const SCRIPT_TIMEOUT: u64 = 10;

impl MarionetteClient {
    /// Navigate the current browsing context to `url`.
    ///
    /// Marionette only answers once the page has loaded, so a response
    /// without an error is all that success means here.
    pub fn navigate(&mut self, url: &str) -> ClientResult<()> {
        self.send_command(NAVIGATE, &json!({ "url": url }))?;
        Ok(())
    }

    /// Run `script` as a function body in the page, with `args` available as
    /// `arguments[i]`. The raw result object is returned; the script's return
    /// value sits under its `value` key.
    pub fn execute_script(
        &mut self,
        script: &str,
        args: &[Value],
    ) -> ClientResult<Map<String, Value>> {
        let params = json!({
            "script": script,
            "args": args,
            "scriptTimeout": SCRIPT_TIMEOUT,
        });
        self.send_command(EXECUTE_SCRIPT, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{error_reply, reply, FakeEndpoint, Reply};

    #[test]
    fn navigate_sends_url_and_ignores_payload() {
        let endpoint = FakeEndpoint::serve(|cmd| Reply::Frame(reply(cmd, json!({"value": null}))));
        let mut client = MarionetteClient::open(endpoint.options()).unwrap();

        client.navigate("https://example.com/").unwrap();
        client.close();

        let received = endpoint.join();
        assert_eq!(received[0][2], NAVIGATE);
        assert_eq!(received[0][3], json!({"url": "https://example.com/"}));
    }

    #[test]
    fn navigate_surfaces_remote_errors() {
        let endpoint = FakeEndpoint::serve(|cmd| {
            Reply::Frame(error_reply(cmd, "unknown error", "Reached error page"))
        });
        let mut client = MarionetteClient::open(endpoint.options()).unwrap();

        let err = client.navigate("https://nowhere.invalid/").unwrap_err();
        assert_eq!(err.as_remote().unwrap().detail(), Some("Reached error page"));
    }

    #[test]
    fn execute_script_sends_script_args_and_timeout() {
        let endpoint = FakeEndpoint::serve(|cmd| Reply::Frame(reply(cmd, json!({"value": 3}))));
        let mut client = MarionetteClient::open(endpoint.options()).unwrap();

        let payload = client
            .execute_script("return arguments[0] + arguments[1];", &[json!(1), json!(2)])
            .unwrap();
        assert_eq!(payload["value"], 3);
        client.close();

        let received = endpoint.join();
        assert_eq!(received[0][2], EXECUTE_SCRIPT);
        assert_eq!(
            received[0][3],
            json!({
                "script": "return arguments[0] + arguments[1];",
                "args": [1, 2],
                "scriptTimeout": 10
            })
        );
    }
}
