//! # Remote State Server Client
//!
//! Reads and writes system variables through the XML API of a Homematic
//! CCU. Both directions are plain GET requests:
//!
//! - read:  `<url>/state.cgi?datapoint_id=<id>`
//! - write: `<url>/statechange.cgi?ise_id=<id>&new_value=<payload>`

use sensorlog_core::SensorlogError;
use std::time::Duration;

/// Request timeout; a stuck CCU must not stall the tick loop for long.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Blocking client for one CCU.
#[derive(Debug, Clone)]
pub struct HomematicClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl HomematicClient {
    /// Create a client for the XML API at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, SensorlogError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SensorlogError::Config(format!("Cannot create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn state_url(&self, datapoint: &str) -> String {
        format!("{}/state.cgi?datapoint_id={}", self.base_url, datapoint)
    }

    #[must_use]
    pub fn statechange_url(&self, ise_id: &str, payload: &str) -> String {
        format!(
            "{}/statechange.cgi?ise_id={}&new_value={}",
            self.base_url, ise_id, payload
        )
    }

    fn get(&self, url: &str) -> Result<String, reqwest::Error> {
        self.http.get(url).send()?.error_for_status()?.text()
    }

    /// Current value of a system variable.
    pub fn read_state(&self, datapoint: &str) -> Result<f64, SensorlogError> {
        let url = self.state_url(datapoint);
        let body = self.get(&url).map_err(|e| {
            SensorlogError::SourceRead(format!("Cannot read datapoint {datapoint} from {url}: {e}"))
        })?;

        let text = extract_value(&body).ok_or_else(|| {
            SensorlogError::SourceRead(format!(
                "No value='' attribute for datapoint {datapoint}. Requested URL: {url}"
            ))
        })?;
        parse_state_value(&text).ok_or_else(|| {
            SensorlogError::SourceRead(format!("Datapoint {datapoint} is not numeric: '{text}'"))
        })
    }

    /// Set a system variable.
    pub fn set_state(&self, ise_id: &str, payload: &str) -> Result<(), SensorlogError> {
        let url = self.statechange_url(ise_id, payload);
        self.get(&url)
            .map(|_| ())
            .map_err(|e| SensorlogError::Publish(format!("Cannot publish to ISE {ise_id}: {e}")))
    }
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

/// Text of the first `value=` attribute in an XML API response.
///
/// The character after `=` is the quote; the value runs to the next
/// unescaped occurrence of that quote. An unterminated value reads as empty.
#[must_use]
pub fn extract_value(body: &str) -> Option<String> {
    let start = body.find("value=")? + "value=".len();
    let rest = body.get(start..)?;
    let mut chars = rest.char_indices();
    let (_, quote) = chars.next()?;
    let first = quote.len_utf8();
    if first >= rest.len() {
        return None;
    }

    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == quote {
            return rest.get(first..i).map(str::to_string);
        }
    }
    Some(String::new())
}

/// Numeric reading of a state value. Empty is 0; booleans are 0/1.
#[must_use]
pub fn parse_state_value(text: &str) -> Option<f64> {
    match text.trim() {
        "" | "false" => Some(0.0),
        "true" => Some(1.0),
        other => other.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_quoted_value() {
        let body = "<state><datapoint ise_id='1234' value='21.5' valuetype='4'/></state>";
        assert_eq!(extract_value(body).as_deref(), Some("21.5"));
    }

    #[test]
    fn extracts_double_quoted_value_with_escape() {
        let body = r#"<datapoint value="a\"b" />"#;
        assert_eq!(extract_value(body).as_deref(), Some(r#"a\"b"#));
    }

    #[test]
    fn empty_and_unterminated_values_read_as_empty() {
        assert_eq!(extract_value("value=''").as_deref(), Some(""));
        assert_eq!(extract_value("value='12").as_deref(), Some(""));
    }

    #[test]
    fn non_ascii_quote_and_value_are_char_safe() {
        assert_eq!(extract_value("<state value=\u{e9}1\u{e9}/>").as_deref(), Some("1"));
        assert_eq!(
            extract_value("<state value='\u{b0}C 21' />").as_deref(),
            Some("\u{b0}C 21")
        );
        assert_eq!(extract_value("value=\u{e9}").as_deref(), None);
        assert_eq!(extract_value("value=\u{e9}\u{fc}\\\u{e9}").as_deref(), Some(""));
    }

    #[test]
    fn missing_attribute_is_none() {
        assert_eq!(extract_value("<state/>"), None);
        assert_eq!(extract_value("value="), None);
        assert_eq!(extract_value("value='"), None);
    }

    #[test]
    fn state_values() {
        assert_eq!(parse_state_value(""), Some(0.0));
        assert_eq!(parse_state_value("true"), Some(1.0));
        assert_eq!(parse_state_value(" 3.25 "), Some(3.25));
        assert_eq!(parse_state_value("on"), None);
    }

    #[test]
    fn urls_are_built_from_trimmed_base() {
        let client = HomematicClient::new("http://ccu/addons/xmlapi/").expect("client");
        assert_eq!(client.base_url(), "http://ccu/addons/xmlapi");
        assert_eq!(
            client.state_url("1234"),
            "http://ccu/addons/xmlapi/state.cgi?datapoint_id=1234"
        );
        assert_eq!(
            client.statechange_url("77", "4.5"),
            "http://ccu/addons/xmlapi/statechange.cgi?ise_id=77&new_value=4.5"
        );
    }
}
