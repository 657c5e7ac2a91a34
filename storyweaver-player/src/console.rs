use std::time::Duration;

use storyweaver::error::{PlayerError, Result};
use storyweaver::format::Card;
use storyweaver::surface::{MemorySurface, NavigationState, PresentationSurface, Speaker};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Plays a story on the terminal.
///
/// The page itself is modelled by a [`MemorySurface`]; this type prints what
/// changes on it and sleeps through the pauses, scaled by `speed`.
pub struct ConsoleSurface {
    page: MemorySurface,
    speed: f64,
    answer: Option<bool>,
    input: Lines<BufReader<Stdin>>,
}

impl ConsoleSurface {
    pub fn new(speed: f64, answer: Option<bool>) -> Self {
        Self {
            page: MemorySurface::new(),
            speed,
            answer,
            input: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Next line typed by the user, `None` at end of input.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        Ok(self.input.next_line().await?)
    }

    pub fn print_outline(&self) {
        if self.page.branches().is_empty() {
            println!("  (the outline is empty)");
            return;
        }
        for branch in self.page.branches() {
            let indent = "  ".repeat(self.depth_of(&branch.id) + 1);
            match &branch.card {
                Some(card) => println!("{}- {} [{}]", indent, branch.text, card.title),
                None => println!("{}- {}", indent, branch.text),
            }
        }
    }

    fn depth_of(&self, id: &str) -> usize {
        let mut depth = 0;
        let mut current = self.page.branch(id).and_then(|b| b.parent.clone());
        while let Some(parent) = current {
            depth += 1;
            current = self.page.branch(&parent).and_then(|b| b.parent.clone());
        }
        depth
    }

    async fn sleep(&self, duration: Duration) {
        if self.speed <= 0.0 || duration.is_zero() {
            return;
        }
        match Duration::try_from_secs_f64(duration.as_secs_f64() / self.speed) {
            Ok(scaled) => tokio::time::sleep(scaled).await,
            Err(err) => log::warn!("Skipping pause of {:?}: {}", duration, err),
        }
    }
}

impl PresentationSurface for ConsoleSurface {
    async fn render_message(&mut self, text: &str, speaker: Speaker, progressive: bool) -> Result<()> {
        if progressive {
            self.sleep(Duration::from_millis(1200)).await;
        }
        self.page.render_message(text, speaker, progressive).await?;
        match speaker {
            Speaker::User => println!("you   > {}", text),
            Speaker::Agent => println!("agent > {}", text),
        }
        Ok(())
    }

    async fn render_confirmation_prompt(&mut self, text: &str) -> Result<bool> {
        println!("agent > {}", text);
        let answer = match self.answer {
            Some(answer) => {
                println!("        [y/n] {}", if answer { "y" } else { "n" });
                answer
            }
            None => loop {
                println!("        [y/n]");
                let Some(line) = self.read_line().await? else {
                    return Err(PlayerError::Io(std::io::ErrorKind::UnexpectedEof.into()));
                };
                match line.trim().to_ascii_lowercase().as_str() {
                    "y" | "yes" => break true,
                    "n" | "no" => break false,
                    _ => {}
                }
            },
        };
        self.page.queue_answer(answer);
        self.page.render_confirmation_prompt(text).await
    }

    async fn move_indicator_to(&mut self, target: &str) -> Result<()> {
        self.page.move_indicator_to(target).await?;
        self.sleep(Duration::from_millis(500)).await;
        Ok(())
    }

    async fn click_at(&mut self, target: &str) -> Result<()> {
        self.page.click_at(target).await?;
        println!("  * click {}", target);
        self.sleep(Duration::from_millis(200)).await;
        Ok(())
    }

    async fn type_into(&mut self, target: &str, text: &str, per_char: Duration) -> Result<()> {
        self.page.type_into(target, text, per_char).await?;
        self.sleep(per_char * text.chars().count() as u32).await;
        println!("  * typed \"{}\" into {}", text, target);
        Ok(())
    }

    fn clear_field(&mut self, target: &str) -> Result<()> {
        self.page.clear_field(target)
    }

    fn restore_field(&mut self, target: &str, text: &str) -> Result<()> {
        self.page.restore_field(target, text)
    }

    async fn pause(&mut self, duration: Duration) {
        self.sleep(duration).await;
    }

    fn create_branch(&mut self, id: &str, text: &str, parent: Option<&str>) -> Result<()> {
        self.page.create_branch(id, text, parent)?;
        let indent = "  ".repeat(self.depth_of(id) + 1);
        println!("{}+ {}", indent, text);
        Ok(())
    }

    fn remove_branch(&mut self, id: &str) -> Result<()> {
        self.page.remove_branch(id)?;
        log::debug!("Removed branch {}", id);
        Ok(())
    }

    async fn drag_card_to(&mut self, branch_id: &str, card: &Card) -> Result<()> {
        self.page.drag_card_to(branch_id, card).await?;
        self.sleep(Duration::from_millis(900)).await;
        Ok(())
    }

    fn embed_card(&mut self, branch_id: &str, card: &Card) -> Result<()> {
        self.page.embed_card(branch_id, card)?;
        println!("  * {} added to {}", card.title, branch_id);
        Ok(())
    }

    fn clear_card_slot(&mut self, branch_id: &str) -> Result<()> {
        self.page.clear_card_slot(branch_id)
    }

    fn reveal_result_list(&mut self, cards: &[Card], stagger: Duration) -> Result<()> {
        self.page.reveal_result_list(cards, stagger)?;
        for card in cards {
            let extra = card.extra_text();
            if extra.is_empty() {
                println!("  | {}: {}", card.title, card.description);
            } else {
                println!("  | {}: {} ({})", card.title, card.description, extra);
            }
        }
        Ok(())
    }

    fn clear_results(&mut self) -> Result<()> {
        self.page.clear_results()
    }

    fn show_thought(&mut self, role: &str, text: &str, anchor: Option<&str>) -> Result<()> {
        self.page.show_thought(role, text, anchor)?;
        println!("  ({} thinks: {})", role, text);
        Ok(())
    }

    fn hide_thought(&mut self) {
        self.page.hide_thought();
    }

    fn narrate(&mut self, text: &str) {
        self.page.narrate(text);
        println!("== {}", text);
    }

    fn update_navigation(&mut self, navigation: &NavigationState) {
        self.page.update_navigation(navigation);
    }

    fn reset_to_initial_state(&mut self) {
        self.page.reset_to_initial_state();
        println!("-- restarted --");
        if let Some(greeting) = self.page.messages().first() {
            println!("agent > {}", greeting.text);
        }
    }

    fn has_branch(&self, id: &str) -> bool {
        self.page.has_branch(id)
    }

    fn branch_text(&self, id: &str) -> Option<String> {
        self.page.branch_text(id)
    }

    fn last_branch(&self) -> Option<String> {
        self.page.last_branch()
    }

    fn card_slot(&self, branch_id: &str) -> Option<Card> {
        self.page.card_slot(branch_id)
    }

    fn field_text(&self, target: &str) -> Option<String> {
        self.page.field_text(target)
    }

    fn result_cards(&self) -> Vec<Card> {
        self.page.result_cards()
    }
}
