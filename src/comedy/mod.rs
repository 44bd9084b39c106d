pub mod service;
pub mod single_flight;

pub use service::{JokeOutcome, JokeService, JokeSource};

use serde::Serialize;

/// The category that gets the family-roast treatment.
pub const WAJED_CATEGORY: &str = "wajed";

const FALLBACK_COMEDIAN: &str = "rodney";

const WAJED_INSTRUCTIONS: &str = r#"

Special Instructions for "Wajed" category:
- Roast Wajed (Ahmad's son) about being "Hoover" (eating everything)
- Refer to him as "entrepreneur" (which means unemployed)
- Mention his "Melo" nickname (which Ahmad hates)
- Sarcastically mention he makes the "best eggs" in UAE
- CRITICAL: Refer to Wajed's partner as "fiancée" or "engagement" ONLY. Do NOT say he is married.
- Roast his philosophical speaking style and political satire posts
- Keep it playful and affectionate, like family humor"#;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comedian {
    pub id: &'static str,
    pub name: &'static str,
    pub tagline: &'static str,
    pub image_url: &'static str,
    pub categories: &'static [&'static str],
    #[serde(skip)]
    base_prompt: &'static str,
}

pub const COMEDIANS: &[Comedian] = &[
    Comedian {
        id: "rodney",
        name: "Rodney Dangerfield",
        tagline: "I Get No Respect!",
        image_url: "/comedians/Rodney Dangerfield.png",
        categories: &["marriage", "aging", "money", "family", "no_respect", "wajed"],
        base_prompt: "You are Rodney Dangerfield. You are a legendary comedian known for \"I don't get no respect!\" \
Never break character. Deliver jokes in Rodney's style: self-deprecating, complaining about getting no respect, \
with his signature delivery.",
    },
    Comedian {
        id: "george",
        name: "George Carlin",
        tagline: "The Truth Hurts... But It's Funny",
        image_url: "/comedians/George Carlin.png",
        categories: &["marriage", "aging", "money", "family", "truth", "wajed"],
        base_prompt: "You are George Carlin. You are a legendary comedian known for social commentary and truth-telling. \
Never break character. Deliver jokes in Carlin's style: sharp, observational, unapologetically honest, \
with biting social commentary.",
    },
    Comedian {
        id: "don",
        name: "Don Rickles",
        tagline: "The Roast Master",
        image_url: "/comedians/Don Rickles.png",
        categories: &["marriage", "aging", "money", "family", "roast", "wajed"],
        base_prompt: "You are Don Rickles. You are a legendary comedian known as \"Mr. Warmth\" and the master of insult comedy. \
Never break character. Deliver jokes in Rickles' style: sharp roasts, playful insults, with his signature wit and timing.",
    },
];

pub fn find_comedian(id: &str) -> Option<&'static Comedian> {
    COMEDIANS.iter().find(|c| c.id == id)
}

/// System instruction for a joke. Unknown comedians get Rodney.
pub fn comedian_prompt(comedian: &str, category: &str) -> String {
    let base = find_comedian(comedian)
        .or_else(|| find_comedian(FALLBACK_COMEDIAN))
        .map(|c| c.base_prompt)
        .unwrap_or_default();

    let mut prompt = base.to_string();
    if category == WAJED_CATEGORY {
        prompt.push_str(WAJED_INSTRUCTIONS);
    }
    prompt
}

pub fn user_prompt(category: &str) -> String {
    if category == WAJED_CATEGORY {
        "Tell me a roast joke about Wajed, Ahmad's son. Keep it playful and family-friendly.".to_string()
    } else {
        format!("Tell me a joke about {}. Keep it clean and funny.", category)
    }
}
