use std::sync::Arc;

use serde::Serialize;

use super::{CardView, SectionHeaderView, TextBlockView};
use crate::auth::Capability;
use crate::collections::CollectionEditor;
use crate::content::{SectionBinding, TextBinding};
use crate::gateway::Gateway;
use crate::models::{Category, ChallengeRecord, CtfChallenge, HackTheBoxMachine, SectionCopy, TryHackMeRoom};

pub const HERO_TITLE_KEY: &str = "hero-title";
pub const HERO_DESCRIPTION_KEY: &str = "hero-description";
pub const ABOUT_ME_KEY: &str = "about-me";

const HERO_TITLE: &str = r"> Cybersecurity\n> Portfolio";
const HERO_DESCRIPTION: &str = "Welcome to my cybersecurity journey. Explore my achievements from \
TryHackMe rooms, Hack The Box machines, and CTF competitions. Every challenge conquered, every \
vulnerability discovered, and every flag captured represents a step forward in the endless pursuit \
of security knowledge.";
const ABOUT_ME: &str = "I am a passionate cybersecurity enthusiast dedicated to understanding the \
intricate world of digital security. My journey spans across various platforms including TryHackMe, \
Hack The Box, and numerous CTF competitions. Each challenge I tackle enhances my skills in penetration \
testing, vulnerability assessment, and ethical hacking. I believe in continuous learning and pushing \
the boundaries of what's possible in cybersecurity.";

/// Built-in copy for a known text key
pub fn text_default(key: &str) -> Option<&'static str> {
    match key {
        HERO_TITLE_KEY => Some(HERO_TITLE),
        HERO_DESCRIPTION_KEY => Some(HERO_DESCRIPTION),
        ABOUT_ME_KEY => Some(ABOUT_ME),
        _ => None,
    }
}

struct CategoryCopy {
    section_key: &'static str,
    title: &'static str,
    description: &'static str,
    empty: &'static str,
    add_label: &'static str,
}

fn category_copy(category: Category) -> CategoryCopy {
    match category {
        Category::Rooms => CategoryCopy {
            section_key: "tryhackme",
            title: "TryHackMe Rooms",
            description: "Rooms completed on the TryHackMe platform",
            empty: "No TryHackMe rooms added yet.",
            add_label: "Add Room",
        },
        Category::Machines => CategoryCopy {
            section_key: "hackthebox",
            title: "Hack The Box Machines",
            description: "Machines owned on Hack The Box",
            empty: "No Hack The Box machines added yet.",
            add_label: "Add Machine",
        },
        Category::Ctf => CategoryCopy {
            section_key: "ctf",
            title: "CTF Challenges",
            description: "Challenges solved in Capture The Flag competitions",
            empty: "No CTF challenges added yet.",
            add_label: "Add Challenge",
        },
    }
}

/// Built-in header copy for a known section key
pub fn section_default(key: &str) -> Option<SectionCopy> {
    Category::ALL
        .into_iter()
        .map(category_copy)
        .find(|copy| copy.section_key == key)
        .map(|copy| SectionCopy::new(copy.title, copy.description))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySectionView {
    pub category: Category,
    pub header: SectionHeaderView,
    pub cards: Vec<CardView>,
    /// Shown in place of the grid when there are no cards
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HomePage {
    pub hero_title: TextBlockView,
    pub hero_description: TextBlockView,
    pub about_me: TextBlockView,
    pub sections: Vec<CategorySectionView>,
}

async fn text_block(gateway: &Arc<dyn Gateway>, key: &'static str, capability: Capability) -> TextBlockView {
    let default = text_default(key).unwrap_or_default().to_string();
    let text = TextBinding::new(gateway.clone(), key, default).load().await;
    TextBlockView::new(key, text, capability)
}

async fn category_section<R: ChallengeRecord>(
    gateway: &Arc<dyn Gateway>,
    category: Category,
    capability: Capability,
) -> CategorySectionView {
    let copy = category_copy(category);
    let header = SectionBinding::new(
        gateway.clone(),
        copy.section_key,
        SectionCopy::new(copy.title, copy.description),
    );
    let editor = CollectionEditor::<R>::new(gateway.clone(), capability);

    // a failed list leaves the section empty; the editor already logged it
    let (header, _) = futures::join!(header.load(), editor.list());
    let cards = editor.cards().await;

    CategorySectionView {
        category,
        header: SectionHeaderView::new(copy.section_key, header, capability),
        empty_message: cards.is_empty().then(|| copy.empty.to_string()),
        add_label: capability.can_edit().then(|| copy.add_label.to_string()),
        cards,
    }
}

/// Loads every block of the home page concurrently
pub async fn build_home(gateway: Arc<dyn Gateway>, capability: Capability) -> HomePage {
    let (hero_title, hero_description, about_me, rooms, machines, ctf) = futures::join!(
        text_block(&gateway, HERO_TITLE_KEY, capability),
        text_block(&gateway, HERO_DESCRIPTION_KEY, capability),
        text_block(&gateway, ABOUT_ME_KEY, capability),
        category_section::<TryHackMeRoom>(&gateway, Category::Rooms, capability),
        category_section::<HackTheBoxMachine>(&gateway, Category::Machines, capability),
        category_section::<CtfChallenge>(&gateway, Category::Ctf, capability),
    );

    HomePage {
        hero_title,
        hero_description,
        about_me,
        sections: vec![rooms, machines, ctf],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;
    use serde_json::json;

    #[tokio::test]
    async fn empty_store_renders_defaults_for_visitors() {
        let gw = Arc::new(MemoryGateway::new());
        let page = build_home(gw.clone(), Capability::VISITOR).await;

        assert_eq!(page.hero_title.lines, vec!["> Cybersecurity", "> Portfolio"]);
        assert!(!page.hero_title.editable);
        assert_eq!(page.sections[1].header.title, "Hack The Box Machines");
        assert_eq!(
            page.sections[1].empty_message.as_deref(),
            Some("No Hack The Box machines added yet.")
        );
        assert!(page.sections.iter().all(|s| s.add_label.is_none()));
        assert_eq!(gw.write_count(), 0);
    }

    #[tokio::test]
    async fn stored_rows_fill_sections() {
        let gw = Arc::new(MemoryGateway::new());
        gw.seed(
            "tryhackme_rooms",
            vec![json!({"title": "Blue", "description": "EternalBlue", "difficulty": "Easy",
                        "url": "https://tryhackme.com/room/blue"})],
        )
        .await;
        gw.seed("static_content", vec![json!({"key": "about-me", "content": "Hi"})]).await;

        let page = build_home(gw, Capability::ADMIN).await;
        assert_eq!(page.about_me.text, "Hi");
        assert!(page.about_me.editable);
        assert_eq!(page.sections[0].cards.len(), 1);
        assert!(page.sections[0].empty_message.is_none());
        assert_eq!(page.sections[0].add_label.as_deref(), Some("Add Room"));
    }

    #[test]
    fn section_defaults_by_key() {
        assert_eq!(section_default("ctf").unwrap().title, "CTF Challenges");
        assert!(section_default("blog").is_none());
        assert!(text_default("hero-title").unwrap().contains(r"\n"));
    }
}
