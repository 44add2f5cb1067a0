//! Message Rendering
//!
//! Chat text for quotes, status and the fixed menus. Markdown uses the
//! single-asterisk style chat clients expect.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use creator_payments::{EntitlementStatus, Plan, SubscriberRecord};
use pricing_core::{EffectiveMode, SingleQuote};

use crate::keyboard::title_case;

pub const WELCOME: &str = "👋 Welcome to *Creator Monetization Bot*\n\n\
Send your stats in one of these forms:\n\
`50k` followers only\n\
`12000 0.08` views + engagement\n\
`50k 12000 0.08` followers + views + engagement\n\n\
I'll estimate what brands should pay you.";

pub const INVALID_FORMAT: &str = "❌ *Invalid format*\n\n\
Use one of the following:\n\
`50k` followers only\n\
`12000 0.08` views + engagement\n\
`50k 12000 0.08` followers + views + engagement\n\n\
Engagement can be `0.08`, `8` or `8%`.";

pub const ASK_PLATFORM: &str = "📱 Which *platform* are you pricing for?";

pub const ASK_NICHE: &str = "📂 Now select your *niche:*";

pub const STATS_FIRST: &str = "⚠️ Send your stats first, for example `50k 12000 0.08`.";

pub const TIERS: &str = "🔥 *Creator Monetization Tiers*\n\n\
🆓 *FREE*\n\
• Pricing Insights\n\
• Followers/View Benchmarking\n\n\
💼 *PRO, ₦10,000 one-time*\n\
• Whitelisting Pricing\n\
• USD + NGN Dual Rates\n\
• Brand Deal Scripts\n\
• Negotiation Playbook\n\n\
🏛 *ELITE, ₦25,000 per package*\n\
• Done-For-You Deal Packaging\n\
• Baseline Pricing + Usage Rights\n\
• Pitch-ready Deliverables\n\n\
👇 Select an option to continue:";

pub const ALREADY_PRO: &str = "🎉 *You're already PRO!*\n\n\
You already have:\n\
✔ Whitelisting\n\
✔ USD Pricing\n\
✔ Negotiation Scripts";

pub const CHECKOUT_PENDING: &str = "💳 *Generating secure checkout link...*";

pub const PRO_LOCKED: &str = "🔒 *PRO Feature*\n\n\
Brand deal resources are available on *PRO* only.\n\n\
👉 Type `upgrade` to unlock PRO.";

pub const EXPORT_SOON: &str = "📁 Export Feature Coming Soon!\nYou'll be able to download branded ratecards.";

pub const UNKNOWN_ACTION: &str = "⚠️ Unknown action.";

pub const UNKNOWN_COMMAND: &str = "🤔 I don't know that command. Try /start.";

pub const CANCELLED: &str = "✅ Action cancelled.\n\nYou can start again anytime.";

/// Group digits in threes (`1000000` → `1,000,000`)
pub fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn naira(amount: u64) -> String {
    format!("₦{}", group_digits(amount))
}

/// Dollars with cents and grouped thousands
pub fn dollars(amount: Decimal) -> String {
    let cents = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let whole = cents.trunc();
    let fraction = ((cents - whole) * Decimal::ONE_HUNDRED).abs().to_u64().unwrap_or_default();
    let whole = whole.abs().to_u64().unwrap_or_default();
    format!("${}.{fraction:02}", group_digits(whole))
}

fn percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

/// Quote message; PRO figures appear only when the quote carries them
pub fn quote(quote: &SingleQuote) -> String {
    let basis = &quote.basis;
    let mut text = format!(
        "📊 *Creator Pricing Insight*\n\n*Platform:* {}\n*Niche:* {}\n",
        title_case(&basis.platform),
        title_case(&basis.niche),
    );

    match basis.mode {
        EffectiveMode::Full => {
            if let Some(followers) = basis.followers {
                text.push_str(&format!("*Followers:* {}\n", group_digits(followers)));
            }
            if let Some(views) = basis.avg_views {
                text.push_str(&format!("*Avg Views:* {}\n", group_digits(views)));
            }
            if let Some(rate) = basis.engagement_rate {
                text.push_str(&format!("*Engagement:* {}\n", percent(rate)));
            }
        }
        EffectiveMode::FollowersOnly => {
            if let Some(followers) = basis.followers {
                text.push_str(&format!("*Followers:* {}\n", group_digits(followers)));
            }
        }
        EffectiveMode::ViewsOnly => {
            if let Some(views) = basis.avg_views {
                text.push_str(&format!("*Avg Views:* {}\n", group_digits(views)));
            }
        }
    }

    text.push_str(&format!(
        "\n💰 *Recommended Rate:* {}\n🟡 *Minimum Acceptable:* {}\n*Usage Rights:* {}-Month\n",
        naira(quote.recommended_amount),
        naira(quote.minimum_amount),
        basis.usage_months,
    ));

    match (&quote.whitelist, basis.is_pro) {
        (Some(whitelist), true) => {
            text.push_str(&format!(
                "\n💥 *With Whitelisting:* {}\n💱 *USD Rate:* ~{}\n💱 *USD + Whitelisting:* ~{}\n",
                naira(whitelist.amount),
                dollars(quote.recommended_amount_usd),
                dollars(whitelist.amount_usd),
            ));
        }
        _ => text.push_str(
            "\n🔒 *Whitelisting Rights:* Locked (PRO only)\n\
             Whitelisting allows brands to run ads with your content.\n\n\
             ✨ Unlock PRO to access:\n\
             • Whitelisting Pricing\n\
             • USD + NGN Dual Rates\n\
             • Negotiation Scripts\n\
             • Exportable Ratecards\n",
        ),
    }

    text
}

fn date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// `/status` message
pub fn status(status: &EntitlementStatus, record: Option<&SubscriberRecord>) -> String {
    match status {
        EntitlementStatus::Active { expires_at } => {
            let activated = record
                .and_then(|r| r.activated_at)
                .map_or_else(String::new, |at| format!("Activated on: {}\n", date(at)));
            format!(
                "💼 *Account Status: PRO*\n\n{activated}Expires on: {}\n\nYou have full access to PRO features.",
                date(*expires_at)
            )
        }
        EntitlementStatus::Expired { expired_at } => format!(
            "⌛ *Account Status: FREE*\n\nYour PRO access expired on {}.\nType `upgrade` to renew.",
            date(*expired_at)
        ),
        EntitlementStatus::NoRecord => "🆓 *Account Status: FREE*\n\n\
            You are currently on the free plan.\n\
            Type `upgrade` to unlock PRO features."
            .into(),
        EntitlementStatus::Inactive | EntitlementStatus::InvalidExpiry => {
            "🆓 *Account Status: FREE*\n\nUpgrade anytime to unlock PRO.".into()
        }
    }
}

/// Reply asking for whatever metric is missing
pub fn missing_metric() -> String {
    "⚠️ I need at least your follower count or your average views.\n\n\
     Send `50k` for followers or `12000 0.08` for views + engagement."
        .into()
}

/// Message under a fresh checkout link
pub fn pay_link(plan: Plan) -> String {
    let pricing = plan.pricing();
    format!(
        "👉 *Complete payment for {}* ({})\n\nAfter payment, come back and type /status.",
        pricing.name,
        naira(u64::try_from(pricing.amount_kobo / 100).unwrap_or_default()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricing_core::{AudienceSignals, PricingEngine};
    use rust_decimal_macros::dec;

    fn instagram_tech(is_pro: bool) -> SingleQuote {
        PricingEngine::default()
            .calculate(
                &AudienceSignals::new(Some(50_000), Some(12_000), Some(0.08)),
                "instagram",
                "tech",
                is_pro,
            )
            .unwrap()
    }

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(1_000), "1,000");
        assert_eq!(group_digits(1_000_000), "1,000,000");
        assert_eq!(group_digits(12_345_678), "12,345,678");
    }

    #[test]
    fn test_dollars() {
        assert_eq!(dollars(dec!(769.23)), "$769.23");
        assert_eq!(dollars(dec!(1538.46)), "$1,538.46");
        assert_eq!(dollars(dec!(9)), "$9.00");
        assert_eq!(dollars(dec!(0.5)), "$0.50");
    }

    #[test]
    fn test_free_quote_is_locked() {
        let text = quote(&instagram_tech(false));
        assert!(text.contains("₦1,000,000"));
        assert!(text.contains("₦500,000"));
        assert!(text.contains("*Engagement:* 8.00%"));
        assert!(text.contains("Locked (PRO only)"));
        assert!(!text.contains("$"));
        assert!(!text.contains("₦2,000,000"));
    }

    #[test]
    fn test_pro_quote_shows_whitelisting_and_usd() {
        let text = quote(&instagram_tech(true));
        assert!(text.contains("*With Whitelisting:* ₦2,000,000"));
        assert!(text.contains("~$769.23"));
        assert!(text.contains("~$1,538.46"));
        assert!(!text.contains("Locked"));
    }

    #[test]
    fn test_status_messages() {
        let now = Utc::now();
        let active = status(&EntitlementStatus::Active { expires_at: now }, None);
        assert!(active.contains("PRO"));

        let free = status(&EntitlementStatus::NoRecord, None);
        assert!(free.contains("FREE"));

        let expired = status(&EntitlementStatus::Expired { expired_at: now }, None);
        assert!(expired.contains("expired"));
    }

    #[test]
    fn test_pay_link_amount() {
        assert!(pay_link(Plan::Pro).contains("₦10,000"));
        assert!(pay_link(Plan::Elite).contains("₦25,000"));
    }
}
