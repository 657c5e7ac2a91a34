mod callback;
mod executor;
mod timing;
mod undo;

use std::sync::Arc;

use arc_swap::ArcSwapOption;

pub use self::callback::*;
pub use self::timing::Timings;
pub use self::undo::{UndoProcedure, UndoRecord, UndoStack};

use crate::data::DataBag;
use crate::format::{Action, Story};
use crate::freeplay::{self, Interaction};
use crate::surface::{NavigationState, PresentationSurface};

pub const WELCOME: &str = "Welcome! Click 'Next Step' to begin the demo.";
pub const THE_END: &str = "End of the demo. Click 'Restart' to watch again.";

/// Result of a call to [`Player::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Executed { index: usize, outcome: StepOutcome },
    /// Already at the last step; nothing was executed
    Finished,
}

/// A playback session: one story, its data bag, and the surface it plays on.
///
/// The position is `None` before the first step and otherwise the index of the
/// last executed step. The undo stack always holds one record per executed
/// step, so its depth equals the number of steps played.
pub struct Player<S: PresentationSurface> {
    story: Story,
    data: DataBag,
    /// Confirmation slot as it was handed in, restored on reset
    initial_confirmation: Option<bool>,
    position: Option<usize>,
    undo: UndoStack<S>,
    surface: S,
    timings: Timings,
    executing: bool,
    finished: bool,
    listener: Arc<ArcSwapOption<StepListener>>,
}

impl<S: PresentationSurface> Player<S> {
    pub fn new(story: Story, data: DataBag, surface: S) -> Self {
        log::info!(
            "Player initialized with story: {} ({} steps)",
            story.title,
            story.len()
        );
        let mut player = Self {
            initial_confirmation: data.last_confirmation(),
            story,
            data,
            position: None,
            undo: UndoStack::new(),
            surface,
            timings: Timings::default(),
            executing: false,
            finished: false,
            listener: Arc::new(ArcSwapOption::new(None)),
        };
        player.surface.narrate(WELCOME);
        player.publish_navigation();
        player
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    pub fn story(&self) -> &Story {
        &self.story
    }

    pub fn data(&self) -> &DataBag {
        &self.data
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn is_complete(&self) -> bool {
        self.navigation().complete
    }

    pub fn set_step_listener(&self, listener: StepListener) {
        self.listener.store(Some(Arc::new(listener)));
    }

    pub fn clear_step_listener(&self) {
        self.listener.store(None);
    }

    /// Shared slot of the step listener, for swapping it from elsewhere.
    pub fn step_listener(&self) -> Arc<ArcSwapOption<StepListener>> {
        self.listener.clone()
    }

    pub fn navigation(&self) -> NavigationState {
        let total = self.story.len();
        let at_end = match self.position {
            Some(position) => position + 1 >= total,
            None => total == 0,
        };
        let started = self.position.is_some();
        NavigationState {
            position: self.position,
            total,
            executing: self.executing,
            complete: self.finished || (started && at_end),
            can_advance: !self.executing && !at_end,
            can_retreat: started,
            can_restart: started,
        }
    }

    /// Execute the next step and wait until all of its effects have played out.
    ///
    /// At the last step this only marks the story complete.
    pub async fn advance(&mut self) -> Progress {
        if self.executing {
            log::warn!("The previous step was interrupted before it finished");
        }

        let index = self.position.map_or(0, |position| position + 1);
        if index >= self.story.len() {
            log::info!("End of story");
            self.finished = true;
            self.surface.narrate(THE_END);
            self.emit(&StepEvent::Completed);
            self.publish_navigation();
            return Progress::Finished;
        }

        self.executing = true;
        self.publish_navigation();

        let step = &self.story.steps[index];
        let action = step.action.name();
        log::info!("Executing step {}: {}", index + 1, action);
        self.emit(&StepEvent::Started { index, action });

        let execution = executor::execute_step(
            &mut self.surface,
            &mut self.data,
            &self.timings,
            index,
            step,
        )
        .await;
        let outcome = execution.outcome;

        // committed only once the step has settled
        self.undo.push(execution.record);
        self.position = Some(index);
        self.executing = false;
        self.check_depth();

        self.emit(&StepEvent::Finished {
            index,
            action,
            outcome,
        });
        self.publish_navigation();
        Progress::Executed { index, outcome }
    }

    /// Undo the last executed step. Returns `false` if nothing has been played.
    pub fn retreat(&mut self) -> bool {
        if self.executing {
            log::warn!("The previous step was interrupted before it finished");
            self.executing = false;
            self.publish_navigation();
        }
        let Some(position) = self.position else {
            return false;
        };

        self.undo.pop_and_run(&mut self.surface, &mut self.data);
        self.position = position.checked_sub(1);
        self.finished = false;
        self.check_depth();

        let narration = match self.position {
            Some(current) => match &self.story.steps[current].action {
                Action::Narrate { text } => self.data.interpolate(text),
                _ => format!("(Step {} completed)", current + 1),
            },
            None => WELCOME.to_string(),
        };
        self.surface.narrate(&narration);

        self.emit(&StepEvent::Retreated { index: position });
        self.publish_navigation();
        true
    }

    /// Go back to before the first step, whatever was played so far.
    pub fn reset(&mut self) {
        self.position = None;
        self.undo.clear();
        self.executing = false;
        self.finished = false;
        self.data.set_last_confirmation(self.initial_confirmation);

        self.surface.reset_to_initial_state();
        self.surface.narrate(WELCOME);

        log::info!("Story restarted");
        self.emit(&StepEvent::Reset);
        self.publish_navigation();
    }

    /// Handle a click outside the scripted sequence.
    ///
    /// Searches only run before the story is started; exports always do.
    pub async fn interact(&mut self, interaction: Interaction) -> bool {
        freeplay::handle(
            &mut self.surface,
            &self.data,
            &self.timings,
            self.position.is_some(),
            interaction,
        )
        .await
    }

    fn publish_navigation(&mut self) {
        let navigation = self.navigation();
        self.surface.update_navigation(&navigation);
    }

    fn emit(&self, event: &StepEvent) {
        if let Some(listener) = self.listener.load().as_ref() {
            listener(event);
        }
    }

    fn check_depth(&self) {
        debug_assert_eq!(
            self.undo.len(),
            self.position.map_or(0, |position| position + 1),
            "undo stack out of step with the playback position"
        );
    }
}
