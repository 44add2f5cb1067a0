//! Inline Keyboards
//!
//! Button layouts and the callback payloads they carry.

use serde::{Deserialize, Serialize};

pub const PLATFORM_PREFIX: &str = "platform_";
pub const NICHE_PREFIX: &str = "niche_";

pub const UPGRADE_PRO: &str = "upgrade_pro";
pub const ELITE_PACKAGE: &str = "elite_package";
pub const DEAL_PACKAGING: &str = "deal_packaging";
pub const EXPORT_RATECARD: &str = "export_ratecard";

/// A single inline button
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Button {
    /// Button that sends `data` back as a callback
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: Some(data.into()),
            url: None,
        }
    }

    /// Button that opens `url`
    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: None,
            url: Some(url.into()),
        }
    }
}

/// Rows of buttons
pub type Keyboard = Vec<Vec<Button>>;

/// (label, platform key)
const PLATFORMS: &[(&str, &str)] = &[
    ("Instagram", "instagram"),
    ("TikTok", "tiktok"),
    ("YouTube Shorts", "youtube"),
    ("Twitter", "twitter"),
    ("Facebook", "facebook"),
    ("Other", "other"),
];

/// (label, button key, niche key used for pricing)
const NICHES: &[(&str, &str, &str)] = &[
    ("Fashion/Beauty", "fashion", "beauty"),
    ("Tech/Gadgets", "tech", "tech"),
    ("Meme/Comedy", "comedy", "comedy"),
    ("Lifestyle/Vlog", "lifestyle", "lifestyle"),
    ("Food/Hospitality", "food", "lifestyle"),
    ("Music/Entertainment", "music", "entertainment"),
    ("Fitness/Wellness", "fitness", "fitness"),
    ("Other", "other", "general"),
];

fn pairs(buttons: Vec<Button>) -> Keyboard {
    buttons.chunks(2).map(<[Button]>::to_vec).collect()
}

pub fn platform_keyboard() -> Keyboard {
    pairs(
        PLATFORMS
            .iter()
            .map(|(label, key)| Button::callback(*label, format!("{PLATFORM_PREFIX}{key}")))
            .collect(),
    )
}

pub fn niche_keyboard() -> Keyboard {
    pairs(
        NICHES
            .iter()
            .map(|(label, key, _)| Button::callback(*label, format!("{NICHE_PREFIX}{key}")))
            .collect(),
    )
}

/// PRO and ELITE purchase options
pub fn tiers_keyboard() -> Keyboard {
    vec![
        vec![Button::callback("🚀 Upgrade to PRO (₦10,000)", UPGRADE_PRO)],
        vec![Button::callback("📦 ELITE Deal Packaging (₦25,000)", ELITE_PACKAGE)],
    ]
}

/// Follow-up actions under a rendered quote
pub fn quote_keyboard(is_pro: bool) -> Keyboard {
    if is_pro {
        vec![vec![
            Button::callback("📦 Deal Packaging", DEAL_PACKAGING),
            Button::callback("📁 Export Ratecard", EXPORT_RATECARD),
        ]]
    } else {
        vec![vec![
            Button::callback("🔐 Unlock PRO", UPGRADE_PRO),
            Button::callback("📦 Deal Packaging", DEAL_PACKAGING),
        ]]
    }
}

/// Niche key for a niche button; unknown buttons price as general
pub fn niche_for_button(key: &str) -> &'static str {
    let key = key.trim().to_lowercase();
    NICHES
        .iter()
        .find(|(_, button, _)| *button == key)
        .map_or("general", |(_, _, niche)| *niche)
}

/// Title-case a key for display (`youtube` → `Youtube`)
pub fn title_case(key: &str) -> String {
    key.split(['_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_keyboard_layout() {
        let keyboard = platform_keyboard();
        assert_eq!(keyboard.len(), 3);
        assert!(keyboard.iter().all(|row| row.len() == 2));
        assert_eq!(keyboard[1][0].callback_data.as_deref(), Some("platform_youtube"));
    }

    #[test]
    fn test_niche_mapping() {
        assert_eq!(niche_for_button("fashion"), "beauty");
        assert_eq!(niche_for_button("food"), "lifestyle");
        assert_eq!(niche_for_button("music"), "entertainment");
        assert_eq!(niche_for_button("other"), "general");
        assert_eq!(niche_for_button("astrology"), "general");
        assert_eq!(niche_keyboard().concat().len(), 8);
    }

    #[test]
    fn test_quote_keyboard_by_tier() {
        let free = quote_keyboard(false).concat();
        assert_eq!(free[0].callback_data.as_deref(), Some(UPGRADE_PRO));

        let pro = quote_keyboard(true).concat();
        assert!(pro.iter().any(|b| b.callback_data.as_deref() == Some(EXPORT_RATECARD)));
        assert!(pro.iter().all(|b| b.callback_data.as_deref() != Some(UPGRADE_PRO)));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("youtube"), "Youtube");
        assert_eq!(title_case("followers_only"), "Followers Only");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_link_button_serialization() {
        let json = serde_json::to_value(Button::link("Pay", "https://pay.example")).unwrap();
        assert_eq!(json["url"], "https://pay.example");
        assert!(json.get("callback_data").is_none());
    }
}
