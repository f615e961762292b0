//! Tracked-name matching against reported device names.
//!
//! A tracked name is present when it and a reported name contain one
//! another, ignoring case. Drivers report truncated or decorated names
//! ("Bob's AirPods Pro"), so either direction counts.

use std::collections::BTreeSet;

/// Whether a reported device name and a tracked name refer to the same device.
///
/// Blank names never match: an empty string is a substring of everything.
pub fn names_match(connected: &str, tracked: &str) -> bool {
    let connected = connected.trim().to_lowercase();
    let tracked = tracked.trim().to_lowercase();
    if connected.is_empty() || tracked.is_empty() {
        return false;
    }
    connected.contains(&tracked) || tracked.contains(&connected)
}

/// The subset of `tracked` names present among `connected` device names.
///
/// Returned names keep the spelling from `tracked`.
pub fn match_present<'a, I>(connected: &[String], tracked: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    tracked
        .into_iter()
        .filter(|t| connected.iter().any(|c| names_match(c, t)))
        .map(str::to_string)
        .collect()
}

/// Connected device names that match no tracked name, in reported order.
pub fn untracked<'a, I>(connected: &[String], tracked: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let tracked: Vec<&str> = tracked.into_iter().collect();
    connected
        .iter()
        .filter(|c| !tracked.iter().any(|t| names_match(c, t)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_case_insensitive_substring() {
        let present = match_present(&names(&["Bob's AirPods Pro"]), ["airpods"]);
        assert_eq!(present, BTreeSet::from(["airpods".to_string()]));
    }

    #[test]
    fn test_tracked_name_longer_than_reported() {
        let present = match_present(&names(&["AirPods"]), ["Bob's AirPods Pro"]);
        assert_eq!(present, BTreeSet::from(["Bob's AirPods Pro".to_string()]));
    }

    #[test]
    fn test_no_match() {
        assert!(match_present(&names(&["Generic Mic"]), ["AirPods"]).is_empty());
    }

    #[test]
    fn test_empty_tracked_list() {
        assert!(match_present(&names(&["AirPods Pro"]), std::iter::empty::<&str>()).is_empty());
    }

    #[test]
    fn test_blank_names_never_match() {
        assert!(!names_match("", "AirPods"));
        assert!(!names_match("AirPods", "  "));
        assert!(match_present(&names(&[""]), ["AirPods"]).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let connected = names(&["AirPods Pro", "Zone Vibe 100", "Speakers"]);
        let tracked = ["AirPods", "Zone Vibe", "Headset"];
        let first = match_present(&connected, tracked);
        let second = match_present(&connected, tracked);
        assert_eq!(first, second);
        assert_eq!(
            first,
            BTreeSet::from(["AirPods".to_string(), "Zone Vibe".to_string()])
        );
    }

    #[test]
    fn test_untracked() {
        let connected = names(&["AirPods Pro", "Built-in Speakers", "HDMI Output"]);
        assert_eq!(
            untracked(&connected, ["airpods"]),
            names(&["Built-in Speakers", "HDMI Output"])
        );
    }
}
