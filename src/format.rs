use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The format represents a scripted walkthrough, commonly loaded from a single JSON file.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    #[serde(default)]
    pub story_id: String,
    #[serde(default)]
    pub title: String,
    /// Name of the data bag the steps reference
    #[serde(default)]
    pub data_key: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Story {
    pub fn new(story_id: impl Into<String>, title: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            story_id: story_id.into(),
            title: title.into(),
            data_key: String::new(),
            steps,
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// One atomic unit of scripted playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(flatten)]
    pub action: Action,
}

impl Step {
    pub fn new(action: Action) -> Self {
        Self {
            condition: None,
            action,
        }
    }

    /// Guard the step on the outcome of the most recent confirmation prompt.
    pub fn when_confirmed(mut self, value: bool) -> Self {
        self.condition = Some(Condition::Confirmation { value });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Action {
    AddChatMessage {
        message: String,
        #[serde(default)]
        is_user: bool,
        #[serde(default)]
        requires_confirmation: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confirmation_responses: Option<ConfirmationResponses>,
    },
    ShowAiThinking {
        text: String,
    },
    HideAiThinking,
    ShowConfirmationDialog {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confirmation_responses: Option<ConfirmationResponses>,
    },
    TypeInElement {
        target_selector: String,
        text_key: String,
        #[serde(default)]
        creates_branch: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch_id: Option<String>,
    },
    SimulateUserClick {
        target_selector: String,
    },
    /// Pause for `duration` milliseconds
    Wait {
        duration: u64,
    },
    ShowSidebarWithResults {
        results_data_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    EmbedCardInBranch {
        branch_id: String,
        card_data_key: String,
    },
    AgentGenerateTemplate {
        target_branch_id: String,
        template_data_key: String,
    },
    ShowTemplateGenerationEffect {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_branch_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    ShowThoughtBubble {
        #[serde(default = "default_thought_role")]
        role: String,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attach_to_selector: Option<String>,
    },
    HideThoughtBubble,
    Narrate {
        text: String,
    },
    /// Any action tag this player does not know about
    #[serde(other)]
    Unrecognized,
}

fn default_thought_role() -> String {
    "agent".to_string()
}

impl Action {
    /// The tag used for this action in story files.
    pub fn name(&self) -> &'static str {
        match self {
            Action::AddChatMessage { .. } => "addChatMessage",
            Action::ShowAiThinking { .. } => "showAiThinking",
            Action::HideAiThinking => "hideAiThinking",
            Action::ShowConfirmationDialog { .. } => "showConfirmationDialog",
            Action::TypeInElement { .. } => "typeInElement",
            Action::SimulateUserClick { .. } => "simulateUserClick",
            Action::Wait { .. } => "wait",
            Action::ShowSidebarWithResults { .. } => "showSidebarWithResults",
            Action::EmbedCardInBranch { .. } => "embedCardInBranch",
            Action::AgentGenerateTemplate { .. } => "agentGenerateTemplate",
            Action::ShowTemplateGenerationEffect { .. } => "showTemplateGenerationEffect",
            Action::ShowThoughtBubble { .. } => "showThoughtBubble",
            Action::HideThoughtBubble => "hideThoughtBubble",
            Action::Narrate { .. } => "narrate",
            Action::Unrecognized => "unrecognized",
        }
    }

    pub fn is_thought_bubble(&self) -> bool {
        matches!(self, Action::ShowThoughtBubble { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationResponses {
    pub yes: String,
    pub no: String,
}

impl Default for ConfirmationResponses {
    fn default() -> Self {
        Self {
            yes: "Perfect! Let me generate a detailed template for your mountain getaway plan."
                .to_string(),
            no: "No problem! Your current plan looks great as is.".to_string(),
        }
    }
}

impl ConfirmationResponses {
    pub fn for_choice(&self, confirmed: bool) -> &str {
        if confirmed {
            &self.yes
        } else {
            &self.no
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Condition {
    Confirmation {
        value: bool,
    },
    #[serde(other)]
    Unrecognized,
}

impl Condition {
    /// Whether a guarded step should run given the last recorded confirmation.
    pub fn is_met(&self, last_confirmation: Option<bool>) -> bool {
        match self {
            Condition::Confirmation { value } => last_confirmation == Some(*value),
            Condition::Unrecognized => false,
        }
    }
}

/// A result card, shown in the results area or embedded in a branch.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_info: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Card {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    /// The footer line of the card, `extraInfo` winning over `extra`.
    pub fn extra_text(&self) -> &str {
        self.extra_info
            .as_deref()
            .or(self.extra.as_deref())
            .unwrap_or("")
    }
}

/// A recursive outline template; children become nested branches.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TemplateNode>,
}

impl TemplateNode {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<TemplateNode>) -> Self {
        self.children = children;
        self
    }

    /// Number of nodes below this one, at any depth.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }
}
