//! Local storage helpers.
//!
//! Built entirely on [`MarionetteClient::execute_script`]: each operation is a
//! generated script body. Keys and values travel as script arguments, never
//! spliced into the script text.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::client::MarionetteClient;
use crate::error::{ClientError, ClientResult};
use crate::page_control::EXECUTE_SCRIPT;

const GET_ALL_SCRIPT: &str = "var entries = {};\
    Object.keys(localStorage).forEach(function(key) {\
      entries[key] = localStorage.getItem(key);\
    });\
    return JSON.stringify(entries);";

const CLEAR_SCRIPT: &str = "localStorage.clear();";

/// Local storage of the page currently loaded in the client's session.
pub struct LocalStorage<'a> {
    client: &'a mut MarionetteClient,
}

impl MarionetteClient {
    pub fn local_storage(&mut self) -> LocalStorage<'_> {
        LocalStorage { client: self }
    }
}

impl LocalStorage<'_> {
    /// Store every entry. Booleans and null are stored as `"true"`,
    /// `"false"` and `"null"`; arrays and objects as their JSON text.
    pub fn set<K, I>(&mut self, entries: I) -> ClientResult<()>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let (script, args) = set_items_script(entries);
        if args.is_empty() {
            return Ok(());
        }
        self.client.execute_script(&script, &args)?;
        Ok(())
    }

    /// Read every key/value pair.
    pub fn get(&mut self) -> ClientResult<BTreeMap<String, String>> {
        let payload = self.client.execute_script(GET_ALL_SCRIPT, &[])?;
        let encoded = payload
            .get("value")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ClientError::protocol_violation(EXECUTE_SCRIPT, "local storage script returned no value")
            })?;
        serde_json::from_str(encoded).map_err(|e| {
            ClientError::protocol_violation(
                EXECUTE_SCRIPT,
                format!("local storage script returned invalid JSON: {e}"),
            )
        })
    }

    /// Remove every key for the current origin.
    pub fn clear(&mut self) -> ClientResult<()> {
        self.client.execute_script(CLEAR_SCRIPT, &[])?;
        Ok(())
    }
}

fn set_items_script<K, I>(entries: I) -> (String, Vec<Value>)
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    let mut script = String::new();
    let mut args = Vec::new();
    for (key, value) in entries {
        let key_index = args.len();
        script.push_str(&format!(
            "localStorage.setItem(arguments[{key_index}], arguments[{}]);\n",
            key_index + 1
        ));
        args.push(Value::String(key.into()));
        args.push(Value::String(storage_string(value)));
    }
    (script, args)
}

fn storage_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{reply, FakeEndpoint, Reply};
    use serde_json::json;

    #[test]
    fn values_are_stringified_for_storage() {
        assert_eq!(storage_string(json!("plain")), "plain");
        assert_eq!(storage_string(json!(true)), "true");
        assert_eq!(storage_string(json!(false)), "false");
        assert_eq!(storage_string(Value::Null), "null");
        assert_eq!(storage_string(json!(42)), "42");
        assert_eq!(storage_string(json!({"a": [1]})), r#"{"a":[1]}"#);
    }

    #[test]
    fn set_script_passes_keys_and_values_as_arguments() {
        let (script, args) = set_items_script([("token", json!("x'y")), ("seen", json!(true))]);
        assert_eq!(
            script,
            "localStorage.setItem(arguments[0], arguments[1]);\n\
             localStorage.setItem(arguments[2], arguments[3]);\n"
        );
        assert_eq!(args, vec![json!("token"), json!("x'y"), json!("seen"), json!("true")]);
    }

    #[test]
    fn set_sends_one_execute_script() {
        let endpoint = FakeEndpoint::serve(|cmd| Reply::Frame(reply(cmd, json!({"value": null}))));
        let mut client = MarionetteClient::open(endpoint.options()).unwrap();

        client
            .local_storage()
            .set([("theme", json!("dark")), ("count", json!(3))])
            .unwrap();
        client.local_storage().set(Vec::<(String, Value)>::new()).unwrap();
        client.close();

        let received = endpoint.join();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0][2], EXECUTE_SCRIPT);
        assert_eq!(received[0][3]["args"], json!(["theme", "dark", "count", "3"]));
    }

    #[test]
    fn get_parses_stringified_entries() {
        let endpoint = FakeEndpoint::serve(|cmd| {
            Reply::Frame(reply(cmd, json!({"value": r#"{"theme":"dark","count":"3"}"#})))
        });
        let mut client = MarionetteClient::open(endpoint.options()).unwrap();

        let entries = client.local_storage().get().unwrap();
        assert_eq!(entries.get("theme").map(String::as_str), Some("dark"));
        assert_eq!(entries.get("count").map(String::as_str), Some("3"));
    }

    #[test]
    fn get_without_value_is_violation() {
        let endpoint = FakeEndpoint::serve(|cmd| Reply::Frame(reply(cmd, json!({"value": null}))));
        let mut client = MarionetteClient::open(endpoint.options()).unwrap();
        assert!(matches!(
            client.local_storage().get().unwrap_err(),
            ClientError::ProtocolViolation { .. }
        ));
    }

    #[test]
    fn get_with_invalid_json_is_violation() {
        let endpoint = FakeEndpoint::serve(|cmd| Reply::Frame(reply(cmd, json!({"value": "{oops"}))));
        let mut client = MarionetteClient::open(endpoint.options()).unwrap();
        assert!(matches!(
            client.local_storage().get().unwrap_err(),
            ClientError::ProtocolViolation { .. }
        ));
    }

    #[test]
    fn clear_runs_clear_script() {
        let endpoint = FakeEndpoint::serve(|cmd| Reply::Frame(reply(cmd, json!({"value": null}))));
        let mut client = MarionetteClient::open(endpoint.options()).unwrap();
        client.local_storage().clear().unwrap();
        client.close();

        let received = endpoint.join();
        assert_eq!(received[0][3]["script"], CLEAR_SCRIPT);
        assert_eq!(received[0][3]["args"], json!([]));
    }
}
