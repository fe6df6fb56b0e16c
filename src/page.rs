use std::rc::Rc;

use log::{info, warn};
use serde::Serialize;

use crate::assets::{AssetLoader, AssetState};
use crate::carousel::{MountedCarousel, QuoteCarousel, QuoteEntry, Transition};
use crate::composer::{SceneComposer, SceneGraph};
use crate::content::{default_quotes, PageContent};
use crate::progress::{format_count, ProgressView};
use crate::scene::SceneDescriptor;
use crate::timer::TimerHost;

pub const INITIAL_RAISED: f64 = 400.0;
pub const FUNDING_GOAL: f64 = 1000.0;

/// Funds raised so far against the campaign goal. Lives as long as the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FundingState {
    raised: f64,
    goal: f64,
}

impl Default for FundingState {
    fn default() -> Self {
        Self::new(INITIAL_RAISED, FUNDING_GOAL)
    }
}

impl FundingState {
    pub fn new(raised: f64, goal: f64) -> Self {
        Self { raised, goal }
    }

    pub fn raised(&self) -> f64 {
        self.raised
    }

    pub fn goal(&self) -> f64 {
        self.goal
    }

    pub fn progress(&self) -> ProgressView {
        ProgressView::new(self.raised, self.goal)
    }

    /// Adds a pledge. Returns `false` and leaves the state untouched for
    /// non-finite or non-positive amounts.
    pub fn record_pledge(&mut self, amount: f64) -> bool {
        if !amount.is_finite() || amount <= 0.0 {
            warn!("ignoring pledge of {amount}");
            return false;
        }
        self.raised += amount;
        info!(
            "pledge of {} recorded; raised {}",
            format_count(amount),
            format_count(self.raised)
        );
        true
    }
}

/// The page before it is mounted: content, funding, quotes and scene.
pub struct Page {
    content: PageContent,
    funding: FundingState,
    carousel: QuoteCarousel,
    composer: SceneComposer,
}

impl Page {
    pub fn new(scene: SceneDescriptor) -> Self {
        Self {
            content: PageContent::default(),
            funding: FundingState::default(),
            carousel: QuoteCarousel::new(default_quotes()),
            composer: SceneComposer::new(scene),
        }
    }

    pub fn with_funding(mut self, funding: FundingState) -> Self {
        self.funding = funding;
        self
    }

    pub fn with_carousel(mut self, carousel: QuoteCarousel) -> Self {
        self.carousel = carousel;
        self
    }

    pub fn content(&self) -> &PageContent {
        &self.content
    }

    pub fn funding(&self) -> &FundingState {
        &self.funding
    }

    pub fn composer(&self) -> &SceneComposer {
        &self.composer
    }

    /// Starts the model load and the quote rotation.
    pub fn mount(self, host: Rc<dyn TimerHost>, loader: &AssetLoader) -> MountedPage<'_> {
        self.composer.preload(loader);
        let carousel = self.carousel.mount(host);
        info!(
            "page mounted: {} of {} raised, {} quotes",
            format_count(self.funding.raised()),
            format_count(self.funding.goal()),
            self.carousel.len()
        );
        MountedPage {
            page: self,
            carousel,
            loader,
        }
    }
}

/// A live page. Dropping it stops the quote rotation.
pub struct MountedPage<'l> {
    page: Page,
    carousel: MountedCarousel,
    loader: &'l AssetLoader,
}

impl<'l> MountedPage<'l> {
    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn funding(&self) -> &FundingState {
        &self.page.funding
    }

    pub fn record_pledge(&mut self, amount: f64) -> bool {
        self.page.funding.record_pledge(amount)
    }

    pub fn carousel(&self) -> &MountedCarousel {
        &self.carousel
    }

    pub fn loader(&self) -> &'l AssetLoader {
        self.loader
    }

    /// Load state of the scene's model, or `None` when the scene has no model.
    pub fn asset_state(&self) -> Option<AssetState> {
        self.page
            .composer
            .model_path()
            .map(|path| self.loader.load(path))
    }

    /// Applies finished asset loads. Call once per frame.
    pub fn pump(&self) -> usize {
        self.loader.pump()
    }

    pub fn scene(&self) -> SceneGraph {
        self.page.composer.compose_from(self.loader)
    }

    pub fn view(&self) -> PageView<'_> {
        PageView {
            content: &self.page.content,
            funding: self.page.funding,
            progress: self.page.funding.progress(),
            quote: self.carousel.current(),
            quote_index: self.carousel.index(),
            quote_transition: self.carousel.transition(),
            scene: self.scene(),
        }
    }

    pub fn render<R: PageRenderer>(&self, renderer: &mut R) -> R::Output {
        renderer.render(&self.view())
    }

    pub fn unmount(self) {
        info!("page unmounted at quote {}", self.carousel.index());
    }
}

/// Snapshot of everything visible on the page.
pub struct PageView<'a> {
    pub content: &'a PageContent,
    pub funding: FundingState,
    pub progress: ProgressView,
    pub quote: Option<&'a QuoteEntry>,
    pub quote_index: usize,
    pub quote_transition: Transition,
    pub scene: SceneGraph,
}

/// Turns a page snapshot into some presentation.
pub trait PageRenderer {
    type Output;

    fn render(&mut self, view: &PageView<'_>) -> Self::Output;
}

/// Plain-text layout used by the command line.
#[derive(Debug, Clone)]
pub struct TextRenderer {
    pub bar_cells: usize,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self { bar_cells: 40 }
    }
}

fn line(out: &mut String, text: impl AsRef<str>) {
    out.push_str(text.as_ref());
    out.push('\n');
}

impl PageRenderer for TextRenderer {
    type Output = String;

    fn render(&mut self, view: &PageView<'_>) -> String {
        let content = view.content;
        let mut out = String::new();

        let nav: Vec<&str> = content.nav.iter().map(|link| link.label.as_str()).collect();
        line(
            &mut out,
            format!(
                "== {} ==  [{}]  ({})",
                content.brand,
                nav.join(" | "),
                content.join_label
            ),
        );
        line(&mut out, "");
        line(&mut out, &content.hero.title);
        line(&mut out, &content.hero.tagline);
        line(&mut out, format!("[ {} ]", content.hero.call_to_action));
        line(&mut out, "");

        let progress = &view.progress;
        line(&mut out, format!("## {}", content.progress.title));
        line(
            &mut out,
            content.progress.subtitle.replace("{goal}", &progress.goal_label),
        );
        let filled = progress.filled_cells(self.bar_cells).min(self.bar_cells);
        line(
            &mut out,
            format!(
                "[{}{}] {}",
                "#".repeat(filled),
                "-".repeat(self.bar_cells - filled),
                progress.bar_width
            ),
        );
        line(
            &mut out,
            format!("{} Dragons / {} Dragons", progress.current_label, progress.goal_label),
        );
        let mut stats: Vec<String> = content
            .stats
            .iter()
            .map(|stat| format!("{} {}", stat.value, stat.label))
            .collect();
        stats.push(format!("{} Funded", progress.funded_label));
        line(&mut out, stats.join(" · "));
        line(&mut out, "");

        line(&mut out, format!("## {}", content.about.heading.title));
        line(&mut out, &content.about.heading.subtitle);
        line(&mut out, format!("Our Vision: {}", content.about.vision));
        line(&mut out, format!("Your Role: {}", content.about.role));
        let scene = &view.scene;
        line(
            &mut out,
            format!(
                "Scene: environment {}, {} lights, model {}, {} stars",
                scene.environment.name(),
                scene.lights.len(),
                scene.slot.label(),
                scene.stars().map_or(0, |stars| stars.len())
            ),
        );
        line(&mut out, "");

        match view.quote {
            Some(quote) => {
                line(&mut out, format!("Quote {}: \"{}\"", view.quote_index + 1, quote.text));
                line(&mut out, format!("  - {}", quote.author));
            }
            None => line(&mut out, "Quote: (none)"),
        }
        line(&mut out, "");

        line(&mut out, format!("## {}", content.houses.title));
        let houses: Vec<String> = content
            .house_list
            .iter()
            .map(|house| format!("({}) {}", house.initial(), house.name))
            .collect();
        line(&mut out, houses.join("  "));
        line(&mut out, &content.houses_note);
        line(&mut out, "");

        line(&mut out, format!("## {}", content.rewards.title));
        for tier in &content.tiers {
            let marker = if tier.featured { " *" } else { "" };
            line(&mut out, format!("{} - {} USD{marker}", tier.title, tier.amount_usd));
            for perk in &tier.perks {
                line(&mut out, format!("  ◆ {perk}"));
            }
        }
        line(&mut out, "");

        line(&mut out, format!("## {}", content.testimonials.title));
        for voice in &content.voices {
            line(&mut out, format!("\"{}\" - {} ({})", voice.quote, voice.name, voice.house));
        }
        line(&mut out, "");

        line(&mut out, format!("## {}", content.faq.title));
        for item in &content.questions {
            line(&mut out, format!("Q: {}", item.question));
            line(&mut out, format!("A: {}", item.answer));
        }
        line(&mut out, "");

        line(&mut out, format!("## {}", content.closing.title));
        line(&mut out, &content.closing.subtitle);
        line(&mut out, format!("[ {} ]", content.closing_action));
        line(&mut out, "");
        line(&mut out, &content.footer.copyright);
        line(&mut out, &content.footer.credits);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{FetchMode, MemorySource, MODEL_PATH};
    use crate::carousel::ROTATION_INTERVAL_MS;
    use crate::composer::AssetSlot;
    use crate::stars::StarFieldConfig;
    use crate::timer::VirtualClock;

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    fn page() -> Page {
        Page::new(SceneDescriptor {
            stars: Some(StarFieldConfig {
                count: 8,
                ..StarFieldConfig::default()
            }),
            ..SceneDescriptor::default()
        })
    }

    fn loader() -> AssetLoader {
        AssetLoader::new(
            MemorySource::new().with_file(MODEL_PATH, TRIANGLE),
            FetchMode::Deferred,
        )
    }

    #[test]
    fn funding_starts_at_four_hundred_of_a_thousand() {
        let funding = FundingState::default();
        assert_eq!(funding.raised(), 400.0);
        assert_eq!(funding.goal(), 1000.0);
        assert_eq!(funding.progress().bar_width, "40%");
    }

    #[test]
    fn pledges_must_be_positive() {
        let mut funding = FundingState::default();
        assert!(!funding.record_pledge(0.0));
        assert!(!funding.record_pledge(-5.0));
        assert!(!funding.record_pledge(f64::NAN));
        assert!(funding.record_pledge(100.0));
        assert_eq!(funding.raised(), 500.0);
        assert_eq!(funding.progress().funded_label, "50%");
    }

    #[test]
    fn page_without_model_has_no_asset_state() {
        let clock = VirtualClock::new();
        let loader = loader();
        let mounted = Page::new(SceneDescriptor {
            model: None,
            stars: None,
            ..SceneDescriptor::default()
        })
        .mount(clock, &loader);

        assert!(mounted.asset_state().is_none());
        assert!(matches!(mounted.scene().slot, AssetSlot::None));
        assert_eq!(mounted.pump(), 0);
        assert_eq!(loader.fetch_count(), 0);
    }

    #[test]
    fn mount_preloads_and_rotates() {
        let clock = VirtualClock::new();
        let loader = loader();
        let mounted = page().mount(clock.clone(), &loader);

        assert!(mounted.asset_state().is_some_and(|state| state.is_pending()));
        assert!(matches!(mounted.scene().slot, AssetSlot::Fallback));
        assert_eq!(mounted.pump(), 1);
        assert!(matches!(mounted.scene().slot, AssetSlot::Inserted));
        assert_eq!(loader.fetch_count(), 1);

        clock.advance(2 * u64::from(ROTATION_INTERVAL_MS));
        assert_eq!(mounted.carousel().index(), 2);

        mounted.unmount();
        assert_eq!(clock.active_intervals(), 0);
    }

    #[test]
    fn text_page_shows_progress_and_quote() {
        let clock = VirtualClock::new();
        let loader = loader();
        let mut mounted = page().mount(clock.clone(), &loader);
        let text = mounted.render(&mut TextRenderer::default());

        assert!(text.contains("Help us reach our goal of 1,000 Gold Dragons"));
        assert!(text.contains("400 Dragons / 1,000 Dragons"));
        assert!(text.contains("40% Funded"));
        assert!(text.contains("Quote 1: \"I will make you miserable.\""));
        assert!(text.contains("model fallback"));
        assert!(text.contains(&format!("[{}{}] 40%", "#".repeat(16), "-".repeat(24))));

        assert!(mounted.record_pledge(600.0));
        let text = mounted.render(&mut TextRenderer::default());
        assert!(text.contains("1,000 Dragons / 1,000 Dragons"));
        assert!(text.contains("100% Funded"));
    }
}
