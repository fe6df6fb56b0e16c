//! Static copy of the fundraising page.

use serde::Serialize;

use crate::carousel::{QuoteEntry, Transition};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavLink {
    pub label: String,
    pub anchor: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hero {
    pub title: String,
    pub tagline: String,
    pub call_to_action: String,
    /// Entrance effects for the title, tagline and button.
    pub transitions: [Transition; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stat {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heading {
    pub anchor: Option<String>,
    pub title: String,
    pub subtitle: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct About {
    pub heading: Heading,
    pub vision: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct House {
    pub name: String,
    /// Sigil colour as `#rrggbb`.
    pub sigil: String,
}

impl House {
    pub fn initial(&self) -> char {
        self.name
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('?')
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardTier {
    pub title: String,
    pub amount_usd: u32,
    pub perks: Vec<String>,
    pub featured: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Testimonial {
    pub quote: String,
    pub name: String,
    pub house: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Footer {
    pub brand: String,
    pub blurb: String,
    pub navigate: Vec<NavLink>,
    pub legal: Vec<String>,
    pub newsletter: String,
    pub copyright: String,
    pub credits: String,
}

/// Every block of static text on the page, in display order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageContent {
    pub brand: String,
    pub nav: Vec<NavLink>,
    pub join_label: String,
    pub hero: Hero,
    pub progress: Heading,
    /// Stats row without the funded share, which is derived at render time.
    pub stats: Vec<Stat>,
    pub about: About,
    pub houses: Heading,
    pub house_list: Vec<House>,
    pub houses_note: String,
    pub rewards: Heading,
    pub tiers: Vec<RewardTier>,
    pub testimonials: Heading,
    pub voices: Vec<Testimonial>,
    pub faq: Heading,
    pub questions: Vec<FaqItem>,
    pub closing: Heading,
    pub closing_action: String,
    pub footer: Footer,
}

fn s(text: &str) -> String {
    text.to_string()
}

fn link(label: &str, anchor: &str) -> NavLink {
    NavLink {
        label: s(label),
        anchor: s(anchor),
    }
}

fn heading(anchor: Option<&str>, title: &str, subtitle: &str) -> Heading {
    Heading {
        anchor: anchor.map(s),
        title: s(title),
        subtitle: s(subtitle),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().copied().map(s).collect()
}

impl Default for PageContent {
    fn default() -> Self {
        Self {
            brand: s("X GOLD DRAGON X"),
            nav: vec![
                link("About", "#about"),
                link("Houses", "#houses"),
                link("Incentives", "#rewards"),
                link("FAQ", "#faq"),
            ],
            join_label: s("Join us"),
            hero: Hero {
                title: s("HELP US TO SPANK WANG"),
                tagline: s(
                    "Join the great houses of DRG#50 in our quest to spank wang and experience the satisfaction.",
                ),
                call_to_action: s("Pledge Your Loyalty"),
                transitions: [
                    Transition {
                        from_offset_y: -20.0,
                        ..Transition::fade_rise(0)
                    },
                    Transition {
                        from_offset_y: 0.0,
                        ..Transition::fade_rise(0).with_delay(500)
                    },
                    Transition::fade_rise(0).with_delay(1000),
                ],
            },
            progress: heading(
                None,
                "Our Fundraising Progress",
                "Help us reach our goal of {goal} Gold Dragons",
            ),
            stats: vec![
                Stat {
                    value: s("100"),
                    label: s("Backers"),
                },
                Stat {
                    value: s("4"),
                    label: s("Great Houses"),
                },
                Stat {
                    value: s("60"),
                    label: s("Days Remaining"),
                },
            ],
            about: About {
                heading: heading(
                    Some("about"),
                    "About The X Gold Dragon X",
                    "An ambitious cause to unite gamers across the servers and beyond to spank wang",
                ),
                vision: s(
                    "The DRG Alliance aims to create the most immersive Battle Field experience \
                     ever conceived. With your support, we will bring the rich world of DRG's to \
                     make wang miserable by winning duels and capitals, and create history over \
                     the servers.",
                ),
                role: s(
                    "By pledging your loyalty, you're not just funding to spank wang but you're \
                     joining an alliance of the devoted, committed to preserving and celebrating \
                     the legacy of Dragons. Each contributor will be recognized according to \
                     their house affiliation and level of support.",
                ),
            },
            houses: heading(
                Some("houses"),
                "Join Your House",
                "Pledge your allegiance and contribute to the glory of your chosen house",
            ),
            house_list: [
                ("DRG1", "#d1d5db"),
                ("DRG2", "#ef4444"),
                ("DRG3", "#171717"),
                ("DRG4", "#facc15"),
            ]
            .iter()
            .map(|(name, sigil)| House {
                name: s(name),
                sigil: s(sigil),
            })
            .collect(),
            houses_note: s(
                "The house with the most damage on wang will receive special recognition in the server.",
            ),
            rewards: heading(
                Some("rewards"),
                "Backer Rewards",
                "Choose your level of support and receive exclusive benefits",
            ),
            tiers: vec![
                RewardTier {
                    title: s("Basic Donation"),
                    amount_usd: 25,
                    perks: strings(&[
                        "Digital thank you scroll",
                        "Name in credits",
                        "Exclusive desktop wallpapers",
                    ]),
                    featured: false,
                },
                RewardTier {
                    title: s("Noble Donation"),
                    amount_usd: 100,
                    perks: strings(&[
                        "All Smallfolk rewards",
                        "Limited edition giveaway RSS",
                        "Early access to plans",
                        "Exclusive benefits on capital",
                    ]),
                    featured: true,
                },
                RewardTier {
                    title: s("Legendary Donation"),
                    amount_usd: 500,
                    perks: strings(&[
                        "All Noble House rewards",
                        "On spot capital buff",
                        "Your name engraved on the Townhalls",
                        "VIP invitation to the VC",
                    ]),
                    featured: false,
                },
            ],
            testimonials: heading(
                None,
                "Voices of the Dragons",
                "Hear from those who have already pledged their support",
            ),
            voices: vec![
                Testimonial {
                    quote: s(
                        "As a devoted Dragon loyalist, I couldn't pass up the chance to help. The \
                         exclusive updates alone have been worth every dragon!",
                    ),
                    name: s("Deanozaur"),
                    house: s("Dino"),
                },
                Testimonial {
                    quote: s("Spank wang at every chance I get and throw stones at all haters."),
                    name: s("Harley Quinn"),
                    house: s("Kerri"),
                },
                Testimonial {
                    quote: s(
                        "Fire and blood! This honors the legacy of my house while bringing \
                         something new to the table. I'm proud to contribute.",
                    ),
                    name: s("Ligmaballsu"),
                    house: s("Licky"),
                },
            ],
            faq: heading(
                Some("faq"),
                "Frequently Asked Questions",
                "Get answers to common inquiries about the Dragons",
            ),
            questions: vec![
                FaqItem {
                    question: s("When will the project be completed?"),
                    answer: s(
                        "We aim to complete the project within 3 months of reaching our funding \
                         goal. Regular updates will be provided to all backers.",
                    ),
                },
                FaqItem {
                    question: s("Can I change my house allegiance after pledging?"),
                    answer: s("No. We zero your watch tower if you do."),
                },
                FaqItem {
                    question: s("How will funds be used?"),
                    answer: s(
                        "Funds will be allocated to buy equipment, construction and buffs. \
                         Everything in our power to spank wang to zero.",
                    ),
                },
                FaqItem {
                    question: s("Will there be physical locations to visit?"),
                    answer: s(
                        "No! We meet on discord and if all goes well we meet once in real life.",
                    ),
                },
                FaqItem {
                    question: s("What happens if the funding goal isn't reached?"),
                    answer: s("Wang would laugh, so we try again until it's done."),
                },
            ],
            closing: heading(
                None,
                "WAR Is Coming",
                "The time to act is now. Join the Dragon Alliance and help us bring the Server to life before the dkk hits again.",
            ),
            closing_action: s("Support Us"),
            footer: Footer {
                brand: s("GOLD DRAGON"),
                blurb: s(
                    "A community-funded initiative to celebrate the successful spanking of wang.",
                ),
                navigate: vec![
                    link("About", "#about"),
                    link("Houses", "#houses"),
                    link("Rewards", "#rewards"),
                    link("FAQ", "#faq"),
                ],
                legal: strings(&[
                    "Terms of Service",
                    "Privacy Policy",
                    "Refund Policy",
                    "Copyright Notice",
                ]),
                newsletter: s("Subscribe to our Dragon Keeper for exclusive updates"),
                copyright: s("© 2025 Dragon Fundraiser."),
                credits: s(
                    "Created with passion for the SV#50. All donations support this to spank wang.",
                ),
            },
        }
    }
}

/// The rotating quotes, in display order.
pub fn default_quotes() -> Vec<QuoteEntry> {
    [
        ("I will make you miserable.", "Dean"),
        ("Wang, you cry like a baby.", "Ligmaballsu"),
        ("Papa Wang, we are coming for you.", "Ninu"),
        ("Wang, send money.", "House Stark"),
        ("Wang, visit us once and I'll destroy you.", "Harley Quinn"),
        ("Giggity", "Quagmire"),
    ]
    .iter()
    .map(|(text, author)| QuoteEntry::new(*text, *author))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_has_every_section() {
        let content = PageContent::default();
        assert_eq!(content.nav.len(), 4);
        assert_eq!(content.stats.len(), 3);
        assert_eq!(content.house_list.len(), 4);
        assert_eq!(content.tiers.iter().filter(|tier| tier.featured).count(), 1);
        assert_eq!(content.voices.len(), 3);
        assert_eq!(content.questions.len(), 5);
        assert_eq!(content.house_list[2].initial(), 'D');
    }

    #[test]
    fn six_quotes_in_order() {
        let quotes = default_quotes();
        assert_eq!(quotes.len(), 6);
        assert_eq!(quotes[0].author, "Dean");
        assert_eq!(quotes[5].text, "Giggity");
    }
}
