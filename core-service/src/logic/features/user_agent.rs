//! User agent features
//!
//! Free text → one browser category and one device category, each one-hot
//! expanded into the columns of [`USER_AGENT_COLUMNS`].

use serde::{Deserialize, Serialize};

use super::layout::USER_AGENT_COLUMNS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Browser {
    Chrome,
    Firefox,
    Safari,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Device {
    Mobile,
    Tablet,
    Desktop,
}

/// Classify a user agent string.
///
/// Chrome UAs also carry "Safari", so Safari only wins without "Chrome".
pub fn classify(ua: &str) -> (Browser, Device) {
    let browser = if ua.contains("Chrome") {
        Browser::Chrome
    } else if ua.contains("Safari") {
        Browser::Safari
    } else if ua.contains("Firefox") {
        Browser::Firefox
    } else {
        Browser::Unknown
    };

    let device = if ua.contains("Android") || ua.contains("iPhone") {
        Device::Mobile
    } else if ua.contains("iPad") {
        Device::Tablet
    } else {
        Device::Desktop
    };

    (browser, device)
}

/// One-hot values aligned with `USER_AGENT_COLUMNS`
pub fn one_hot(ua: &str) -> [(&'static str, f64); 6] {
    let (browser, device) = classify(ua);
    let flag = |b: bool| if b { 1.0 } else { 0.0 };

    [
        (USER_AGENT_COLUMNS[0], flag(browser == Browser::Chrome)),
        (USER_AGENT_COLUMNS[1], flag(browser == Browser::Firefox)),
        (USER_AGENT_COLUMNS[2], flag(browser == Browser::Safari)),
        (USER_AGENT_COLUMNS[3], flag(device == Device::Mobile)),
        (USER_AGENT_COLUMNS[4], flag(device == Device::Desktop)),
        (USER_AGENT_COLUMNS[5], flag(device == Device::Tablet)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_beats_safari() {
        let ua = "Mozilla/5.0 (Linux; Android 13) AppleWebKit/537.36 Chrome/120.0 Mobile Safari/537.36";
        assert_eq!(classify(ua), (Browser::Chrome, Device::Mobile));
    }

    #[test]
    fn test_safari_without_chrome() {
        let ua = "Mozilla/5.0 (iPad; CPU OS 15_0 like Mac OS X) Version/15.0 Safari/604.1";
        assert_eq!(classify(ua), (Browser::Safari, Device::Tablet));
    }

    #[test]
    fn test_firefox_desktop() {
        let ua = "Mozilla/5.0 (X11; Linux x86_64; rv:115.0) Gecko/20100101 Firefox/115.0";
        assert_eq!(classify(ua), (Browser::Firefox, Device::Desktop));
    }

    #[test]
    fn test_unknown_browser() {
        assert_eq!(classify("curl/8.1.2"), (Browser::Unknown, Device::Desktop));
    }

    #[test]
    fn test_one_hot_flags() {
        let columns = one_hot("Mozilla/5.0 (iPhone) Safari/604.1");
        let set: Vec<_> = columns.iter().filter(|(_, v)| *v == 1.0).map(|(c, _)| *c).collect();
        assert_eq!(set, vec!["Browser_Safari", "Device_Mobile"]);
    }
}
