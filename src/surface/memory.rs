use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Duration;

use crate::error::{PlayerError, Result};
use crate::format::Card;

use super::{NavigationState, PresentationSurface, Speaker};

pub const INITIAL_PROMPT: &str = "#initial-plan-prompt";
pub const GREETING: &str =
    "Hello! I'm here to help you plan your perfect getaway. What would you like to plan today?";

const CURSOR_TRAVEL: Duration = Duration::from_millis(500);
const CLICK: Duration = Duration::from_millis(200);
const TYPING_INDICATOR: Duration = Duration::from_millis(1200);
const AGENT_CHAR: Duration = Duration::from_millis(30);
const USER_MESSAGE: Duration = Duration::from_millis(100);
const CARD_DRAG: Duration = Duration::from_millis(900);

#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub id: String,
    pub parent: Option<String>,
    pub text: String,
    pub card: Option<Card>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub speaker: Speaker,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Thought {
    pub role: String,
    pub text: String,
    pub anchor: Option<String>,
}

/// The reversible part of the page: outline, typed fields, results, overlays.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub branches: Vec<Branch>,
    pub fields: BTreeMap<String, String>,
    pub results: Vec<Card>,
    pub thought: Option<Thought>,
    pub initial_prompt_visible: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            branches: Vec::new(),
            fields: BTreeMap::new(),
            results: Vec::new(),
            thought: None,
            initial_prompt_visible: true,
        }
    }
}

/// An in-memory model of the planning page.
///
/// Pauses and animations are accounted in [`MemorySurface::elapsed`] instead
/// of being slept, and confirmation prompts are answered from a queue.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    document: Document,
    targets: BTreeSet<String>,
    messages: Vec<ChatMessage>,
    clicks: Vec<String>,
    cursor: Option<String>,
    narration: String,
    navigation: NavigationState,
    answers: VecDeque<bool>,
    default_answer: bool,
    elapsed: Duration,
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySurface {
    pub fn new() -> Self {
        let targets = [INITIAL_PROMPT, "#chat-messages", "#branch-container"]
            .into_iter()
            .map(str::to_string)
            .collect();
        Self {
            document: Document::default(),
            targets,
            messages: vec![ChatMessage {
                speaker: Speaker::Agent,
                text: GREETING.to_string(),
            }],
            clicks: Vec::new(),
            cursor: None,
            narration: String::new(),
            navigation: NavigationState::default(),
            answers: VecDeque::new(),
            default_answer: true,
            elapsed: Duration::ZERO,
        }
    }

    /// Register an extra element that steps may target.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.targets.insert(target.into());
        self
    }

    /// Answer used once the queued answers run out.
    pub fn with_default_answer(mut self, answer: bool) -> Self {
        self.default_answer = answer;
        self
    }

    pub fn queue_answer(&mut self, answer: bool) {
        self.answers.push_back(answer);
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn branches(&self) -> &[Branch] {
        &self.document.branches
    }

    pub fn branch(&self, id: &str) -> Option<&Branch> {
        self.document.branches.iter().find(|b| b.id == id)
    }

    pub fn branch_ids(&self) -> Vec<&str> {
        self.document
            .branches
            .iter()
            .map(|b| b.id.as_str())
            .collect()
    }

    pub fn field(&self, target: &str) -> Option<&str> {
        self.document.fields.get(target).map(String::as_str)
    }

    pub fn results(&self) -> &[Card] {
        &self.document.results
    }

    pub fn thought(&self) -> Option<&Thought> {
        self.document.thought.as_ref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn clicks(&self) -> &[String] {
        &self.clicks
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn narration(&self) -> &str {
        &self.narration
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.navigation
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Whether `target` names an element currently on the page.
    ///
    /// Besides registered targets, `[data-branch-id='x'] ...` selectors resolve
    /// while branch `x` exists and `#results-sidebar ...` while results are shown.
    pub fn resolves(&self, target: &str) -> bool {
        if self.targets.contains(target) {
            return true;
        }
        if let Some(id) = branch_selector_id(target) {
            return self.has_branch(id);
        }
        if target.starts_with("#results-sidebar") {
            return !self.document.results.is_empty();
        }
        false
    }

    fn require_branch(&self, id: &str) -> Result<usize> {
        self.document
            .branches
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| PlayerError::MissingBranch(id.to_string()))
    }

    fn require_target(&self, target: &str) -> Result<()> {
        if self.resolves(target) {
            Ok(())
        } else {
            Err(PlayerError::MissingTarget(target.to_string()))
        }
    }
}

/// Extract `x` from selectors such as `[data-branch-id='x'] .branch-search-icon`.
fn branch_selector_id(target: &str) -> Option<&str> {
    let start = target.find("data-branch-id=")? + "data-branch-id=".len();
    let rest = &target[start..];
    let quote = rest.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let rest = &rest[1..];
    let end = rest.find(quote)?;
    Some(&rest[..end])
}

impl PresentationSurface for MemorySurface {
    async fn render_message(&mut self, text: &str, speaker: Speaker, progressive: bool) -> Result<()> {
        self.elapsed += if progressive {
            TYPING_INDICATOR + AGENT_CHAR * text.chars().count() as u32
        } else {
            USER_MESSAGE
        };
        self.messages.push(ChatMessage {
            speaker,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn render_confirmation_prompt(&mut self, text: &str) -> Result<bool> {
        self.messages.push(ChatMessage {
            speaker: Speaker::Agent,
            text: text.to_string(),
        });
        let answer = match self.answers.pop_front() {
            Some(answer) => answer,
            None => {
                log::warn!(
                    "No queued answer for confirmation prompt, using {}",
                    self.default_answer
                );
                self.default_answer
            }
        };
        Ok(answer)
    }

    async fn move_indicator_to(&mut self, target: &str) -> Result<()> {
        self.require_target(target)?;
        self.cursor = Some(target.to_string());
        self.elapsed += CURSOR_TRAVEL;
        Ok(())
    }

    async fn click_at(&mut self, target: &str) -> Result<()> {
        self.elapsed += CLICK;
        self.require_target(target)?;
        self.clicks.push(target.to_string());
        Ok(())
    }

    async fn type_into(&mut self, target: &str, text: &str, per_char: Duration) -> Result<()> {
        self.require_target(target)?;
        self.elapsed += per_char * text.chars().count() as u32;
        self.document
            .fields
            .insert(target.to_string(), text.to_string());
        Ok(())
    }

    fn clear_field(&mut self, target: &str) -> Result<()> {
        self.document.fields.remove(target);
        if target == INITIAL_PROMPT {
            self.document.initial_prompt_visible = true;
        }
        Ok(())
    }

    fn restore_field(&mut self, target: &str, text: &str) -> Result<()> {
        self.require_target(target)?;
        self.document
            .fields
            .insert(target.to_string(), text.to_string());
        Ok(())
    }

    async fn pause(&mut self, duration: Duration) {
        self.elapsed += duration;
    }

    fn create_branch(&mut self, id: &str, text: &str, parent: Option<&str>) -> Result<()> {
        if self.has_branch(id) {
            return Err(anyhow::anyhow!("Branch {} already exists", id).into());
        }
        match parent {
            Some(parent) => {
                self.require_branch(parent)?;
            }
            None => self.document.initial_prompt_visible = false,
        }
        self.document.branches.push(Branch {
            id: id.to_string(),
            parent: parent.map(str::to_string),
            text: text.to_string(),
            card: None,
        });
        Ok(())
    }

    fn remove_branch(&mut self, id: &str) -> Result<()> {
        self.require_branch(id)?;

        // a branch takes its nested branches with it
        let mut doomed = vec![id.to_string()];
        let mut index = 0;
        while index < doomed.len() {
            let parent = doomed[index].clone();
            doomed.extend(
                self.document
                    .branches
                    .iter()
                    .filter(|b| b.parent.as_deref() == Some(parent.as_str()))
                    .map(|b| b.id.clone()),
            );
            index += 1;
        }

        self.document.branches.retain(|b| !doomed.contains(&b.id));
        Ok(())
    }

    async fn drag_card_to(&mut self, branch_id: &str, _card: &Card) -> Result<()> {
        self.require_branch(branch_id)?;
        self.elapsed += CARD_DRAG;
        Ok(())
    }

    fn embed_card(&mut self, branch_id: &str, card: &Card) -> Result<()> {
        let index = self.require_branch(branch_id)?;
        self.document.branches[index].card = Some(card.clone());
        Ok(())
    }

    fn clear_card_slot(&mut self, branch_id: &str) -> Result<()> {
        let index = self.require_branch(branch_id)?;
        self.document.branches[index].card = None;
        Ok(())
    }

    fn reveal_result_list(&mut self, cards: &[Card], _stagger: Duration) -> Result<()> {
        self.document.results = cards.to_vec();
        Ok(())
    }

    fn clear_results(&mut self) -> Result<()> {
        self.document.results.clear();
        Ok(())
    }

    fn show_thought(&mut self, role: &str, text: &str, anchor: Option<&str>) -> Result<()> {
        self.document.thought = Some(Thought {
            role: role.to_string(),
            text: text.to_string(),
            anchor: anchor.map(str::to_string),
        });
        Ok(())
    }

    fn hide_thought(&mut self) {
        self.document.thought = None;
    }

    fn narrate(&mut self, text: &str) {
        self.narration = text.to_string();
    }

    fn update_navigation(&mut self, navigation: &NavigationState) {
        self.navigation = *navigation;
    }

    fn reset_to_initial_state(&mut self) {
        self.document = Document::default();
        self.messages = vec![ChatMessage {
            speaker: Speaker::Agent,
            text: GREETING.to_string(),
        }];
        self.clicks.clear();
        self.cursor = None;
    }

    fn has_branch(&self, id: &str) -> bool {
        self.document.branches.iter().any(|b| b.id == id)
    }

    fn branch_text(&self, id: &str) -> Option<String> {
        self.branch(id).map(|b| b.text.clone())
    }

    fn last_branch(&self) -> Option<String> {
        self.document.branches.last().map(|b| b.id.clone())
    }

    fn card_slot(&self, branch_id: &str) -> Option<Card> {
        self.branch(branch_id).and_then(|b| b.card.clone())
    }

    fn field_text(&self, target: &str) -> Option<String> {
        self.field(target).map(str::to_string)
    }

    fn result_cards(&self) -> Vec<Card> {
        self.document.results.clone()
    }
}
