//! Interactions outside the scripted sequence.
//!
//! Clicking a branch's search icon or a card's export button works on its own
//! when no story is being played. These handlers drive the surface directly
//! and never touch the undo stack or the playback position.

use crate::data::DataBag;
use crate::format::Card;
use crate::player::Timings;
use crate::surface::{PresentationSurface, Speaker};

/// Data key holding the cards a free-play search shows
pub const SEARCH_RESULTS_KEY: &str = "activityResults";

const FOUND_MESSAGE: &str = "I found some excellent options! Here are my top recommendations:";

#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    /// The search icon of a branch was clicked
    Search { branch_id: String },
    /// A result card's export button was clicked; without a branch the card
    /// goes to the most recently created one
    Export {
        card: Card,
        branch_id: Option<String>,
    },
}

/// Returns whether the interaction had any effect.
pub(crate) async fn handle<S: PresentationSurface>(
    surface: &mut S,
    data: &DataBag,
    timings: &Timings,
    story_mode: bool,
    interaction: Interaction,
) -> bool {
    match interaction {
        Interaction::Search { branch_id } => {
            if story_mode {
                log::debug!("Ignoring search on {} while a story is playing", branch_id);
                return false;
            }
            let Some(text) = surface.branch_text(&branch_id) else {
                log::warn!("Search requested on missing branch {}", branch_id);
                return false;
            };
            let text = text.trim();
            if text.is_empty() {
                return false;
            }

            let thinking = format!(
                "Let me search for the best options for \"{}\". I'll analyze location data, reviews, and recommendations...",
                text
            );
            if let Err(err) = surface.render_message(&thinking, Speaker::Agent, true).await {
                log::warn!("Failed to show search message: {}", err);
                return false;
            }
            surface.pause(timings.free_play_search()).await;
            if let Err(err) = surface
                .render_message(FOUND_MESSAGE, Speaker::Agent, true)
                .await
            {
                log::warn!("Failed to show search message: {}", err);
            }

            let cards = data.result_list(SEARCH_RESULTS_KEY).unwrap_or_else(|err| {
                log::debug!("No free-play results: {}", err);
                Vec::new()
            });
            match surface.reveal_result_list(&cards, timings.result_stagger()) {
                Ok(()) => true,
                Err(err) => {
                    log::warn!("Failed to show search results: {}", err);
                    false
                }
            }
        }
        Interaction::Export { card, branch_id } => {
            let Some(branch_id) = branch_id.or_else(|| surface.last_branch()) else {
                log::warn!("No branch to export {} into", card.title);
                return false;
            };
            if let Err(err) = surface.drag_card_to(&branch_id, &card).await {
                log::warn!("Failed to drag card into {}: {}", branch_id, err);
            }
            match surface.embed_card(&branch_id, &card) {
                Ok(()) => true,
                Err(err) => {
                    log::warn!("Failed to export card into {}: {}", branch_id, err);
                    false
                }
            }
        }
    }
}
