mod memory;

use std::future::Future;
use std::time::Duration;

pub use self::memory::{Branch, ChatMessage, MemorySurface, Thought};

use crate::error::Result;
use crate::format::Card;

/// Who a chat message is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Agent,
}

/// Enabled/disabled state of the playback controls.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NavigationState {
    /// Index of the last executed step, `None` before the first one
    pub position: Option<usize>,
    pub total: usize,
    pub executing: bool,
    pub complete: bool,
    pub can_advance: bool,
    pub can_retreat: bool,
    pub can_restart: bool,
}

/// The UI a story is played against.
///
/// Async operations must only resolve once their visible effect has fully
/// played out. Timing is owned by the surface: the player never sleeps on its
/// own, it asks the surface to `pause`.
pub trait PresentationSurface: Send {
    /// Append a chat message; `progressive` reveals it character by character
    fn render_message(
        &mut self,
        text: &str,
        speaker: Speaker,
        progressive: bool,
    ) -> impl Future<Output = Result<()>>;
    /// Show a prompt with fixed Yes / No buttons and wait for the choice
    fn render_confirmation_prompt(&mut self, text: &str) -> impl Future<Output = Result<bool>>;
    fn move_indicator_to(&mut self, target: &str) -> impl Future<Output = Result<()>>;
    /// Visual click on `target`, dispatching a real activation when it exists
    fn click_at(&mut self, target: &str) -> impl Future<Output = Result<()>>;
    fn type_into(
        &mut self,
        target: &str,
        text: &str,
        per_char: Duration,
    ) -> impl Future<Output = Result<()>>;
    fn clear_field(&mut self, target: &str) -> Result<()>;
    /// Put `text` back into a field at once, without typing it
    fn restore_field(&mut self, target: &str, text: &str) -> Result<()>;
    fn pause(&mut self, duration: Duration) -> impl Future<Output = ()>;

    /// Create an outline branch, nested under `parent` when given
    fn create_branch(&mut self, id: &str, text: &str, parent: Option<&str>) -> Result<()>;
    fn remove_branch(&mut self, id: &str) -> Result<()>;
    /// Drag-style transition of `card` from the results area into a branch's card slot
    fn drag_card_to(&mut self, branch_id: &str, card: &Card) -> impl Future<Output = Result<()>>;
    fn embed_card(&mut self, branch_id: &str, card: &Card) -> Result<()>;
    fn clear_card_slot(&mut self, branch_id: &str) -> Result<()>;

    /// Render the result cards, each entering `stagger` after the previous one
    fn reveal_result_list(&mut self, cards: &[Card], stagger: Duration) -> Result<()>;
    fn clear_results(&mut self) -> Result<()>;

    fn show_thought(&mut self, role: &str, text: &str, anchor: Option<&str>) -> Result<()>;
    fn hide_thought(&mut self);

    fn narrate(&mut self, text: &str);
    fn update_navigation(&mut self, navigation: &NavigationState);
    fn reset_to_initial_state(&mut self);

    fn has_branch(&self, id: &str) -> bool;
    fn branch_text(&self, id: &str) -> Option<String>;
    /// The most recently created branch still present
    fn last_branch(&self) -> Option<String>;
    fn card_slot(&self, branch_id: &str) -> Option<Card>;
    /// Text currently held by a field, `None` when it is empty
    fn field_text(&self, target: &str) -> Option<String>;
    /// Cards currently shown in the results area
    fn result_cards(&self) -> Vec<Card>;
}
