use std::time::Duration;

use crate::data::DataBag;
use crate::error::{PlayerError, Result};
use crate::format::{Action, ConfirmationResponses, Step, TemplateNode};
use crate::surface::{PresentationSurface, Speaker};

use super::callback::StepOutcome;
use super::timing::Timings;
use super::undo::UndoRecord;

const RESULTS_MESSAGE: &str =
    "I found some great options for your mountain getaway! Here are the best activities I discovered:";
const GENERATION_MESSAGE: &str = "I'm analyzing your plan structure and generating comprehensive sub-branches with activities, logistics, and timing details...";

/// What executing one step left behind
pub(crate) struct Execution<S> {
    pub record: UndoRecord<S>,
    pub outcome: StepOutcome,
}

impl<S> Execution<S> {
    fn applied(record: UndoRecord<S>) -> Self {
        Self {
            record,
            outcome: StepOutcome::Applied,
        }
    }

    fn noop(index: usize, action: &'static str, outcome: StepOutcome) -> Self {
        Self {
            record: UndoRecord::noop(index, action),
            outcome,
        }
    }

    fn degraded(index: usize, action: &'static str, err: PlayerError) -> Self {
        log::warn!("Step {} ({}) did nothing: {}", index + 1, action, err);
        Self::noop(index, action, StepOutcome::Degraded)
    }
}

fn warn_on_err(result: Result<()>, what: &str) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            log::warn!("Failed to {}: {}", what, err);
            false
        }
    }
}

fn outcome_of(complete: bool) -> StepOutcome {
    if complete {
        StepOutcome::Applied
    } else {
        StepOutcome::Degraded
    }
}

/// Apply one step to the surface, returning only once all of its staged
/// effects have played out.
///
/// Exactly one undo record comes back on every path, so failures inside a
/// step never disturb the depth of the undo stack.
pub(crate) async fn execute_step<S: PresentationSurface>(
    surface: &mut S,
    data: &mut DataBag,
    timings: &Timings,
    index: usize,
    step: &Step,
) -> Execution<S> {
    let action = step.action.name();

    if let Some(condition) = &step.condition {
        if !condition.is_met(data.last_confirmation()) {
            log::debug!(
                "Skipping step {} ({}): {:?} does not match last confirmation {:?}",
                index + 1,
                action,
                condition,
                data.last_confirmation()
            );
            return Execution::noop(index, action, StepOutcome::Skipped);
        }
    }

    // thought bubbles never outlive the step after the one that showed them
    if !step.action.is_thought_bubble() && step.action != Action::Unrecognized {
        surface.hide_thought();
    }

    match &step.action {
        Action::AddChatMessage {
            message,
            is_user,
            requires_confirmation,
            confirmation_responses,
        } => {
            let text = data.interpolate(message);
            if *requires_confirmation {
                return confirm(
                    surface,
                    data,
                    index,
                    action,
                    &text,
                    confirmation_responses.as_ref(),
                )
                .await;
            }

            let speaker = if *is_user {
                Speaker::User
            } else {
                Speaker::Agent
            };
            match surface.render_message(&text, speaker, !is_user).await {
                Ok(()) => Execution::noop(index, action, StepOutcome::Applied),
                Err(err) => Execution::degraded(index, action, err),
            }
        }
        Action::ShowAiThinking { text } => {
            let text = data.interpolate(text);
            match surface.render_message(&text, Speaker::Agent, true).await {
                Ok(()) => Execution::noop(index, action, StepOutcome::Applied),
                Err(err) => Execution::degraded(index, action, err),
            }
        }
        Action::HideAiThinking => Execution::noop(index, action, StepOutcome::Applied),
        Action::ShowConfirmationDialog {
            message,
            confirmation_responses,
        } => {
            let text = data.interpolate(message);
            confirm(
                surface,
                data,
                index,
                action,
                &text,
                confirmation_responses.as_ref(),
            )
            .await
        }
        Action::TypeInElement {
            target_selector,
            text_key,
            creates_branch,
            branch_id,
        } => {
            let text = match data.text(text_key) {
                Ok(text) => text,
                Err(err) => return Execution::degraded(index, action, err),
            };
            let previous = surface.field_text(target_selector);
            if let Err(err) = surface
                .type_into(target_selector, &text, timings.type_char())
                .await
            {
                return Execution::degraded(index, action, err);
            }

            let mut complete = true;
            let mut created = None;
            if *creates_branch {
                match branch_id {
                    Some(id) => {
                        complete = warn_on_err(
                            surface.create_branch(id, &text, None),
                            &format!("create branch {}", id),
                        );
                        if complete {
                            created = Some(id.clone());
                        }
                    }
                    None => {
                        log::warn!("{}", PlayerError::MissingField(index + 1, "branchId"));
                        complete = false;
                    }
                }
            }

            let target = target_selector.clone();
            Execution {
                record: UndoRecord::new(index, action, move |surface: &mut S, _: &mut DataBag| {
                    if let Some(id) = created {
                        warn_on_err(surface.remove_branch(&id), &format!("remove branch {}", id));
                    }
                    let restored = match &previous {
                        Some(text) => surface.restore_field(&target, text),
                        None => surface.clear_field(&target),
                    };
                    warn_on_err(restored, &format!("restore {}", target));
                }),
                outcome: outcome_of(complete),
            }
        }
        Action::SimulateUserClick { target_selector } => {
            let moved = warn_on_err(
                surface.move_indicator_to(target_selector).await,
                &format!("move cursor to {}", target_selector),
            );
            let clicked = warn_on_err(
                surface.click_at(target_selector).await,
                &format!("click {}", target_selector),
            );
            Execution::noop(index, action, outcome_of(moved && clicked))
        }
        Action::Wait { duration } => {
            surface.pause(Duration::from_millis(*duration)).await;
            Execution::noop(index, action, StepOutcome::Applied)
        }
        Action::ShowSidebarWithResults {
            results_data_key,
            message,
        } => {
            let cards = match data.result_list(results_data_key) {
                Ok(cards) => cards,
                Err(err) => return Execution::degraded(index, action, err),
            };
            let text = data.interpolate(message.as_deref().unwrap_or(RESULTS_MESSAGE));
            let previous = surface.result_cards();
            let announced = warn_on_err(
                surface.render_message(&text, Speaker::Agent, true).await,
                "announce results",
            );
            if let Err(err) = surface.reveal_result_list(&cards, timings.result_stagger()) {
                return Execution::degraded(index, action, err);
            }
            surface
                .pause(timings.result_stagger() * cards.len() as u32)
                .await;

            Execution {
                record: UndoRecord::new(index, action, move |surface: &mut S, _: &mut DataBag| {
                    let restored = if previous.is_empty() {
                        surface.clear_results()
                    } else {
                        surface.reveal_result_list(&previous, Duration::ZERO)
                    };
                    warn_on_err(restored, "restore results");
                }),
                outcome: outcome_of(announced),
            }
        }
        Action::EmbedCardInBranch {
            branch_id,
            card_data_key,
        } => {
            let card = match data.card(card_data_key) {
                Ok(card) => card,
                Err(err) => return Execution::degraded(index, action, err),
            };
            if !surface.has_branch(branch_id) {
                return Execution::degraded(
                    index,
                    action,
                    PlayerError::MissingBranch(branch_id.clone()),
                );
            }

            let dragged = warn_on_err(
                surface.drag_card_to(branch_id, &card).await,
                &format!("drag card into {}", branch_id),
            );
            let previous = surface.card_slot(branch_id);
            if let Err(err) = surface.embed_card(branch_id, &card) {
                return Execution::degraded(index, action, err);
            }

            let branch_id = branch_id.clone();
            Execution {
                record: UndoRecord::new(index, action, move |surface: &mut S, _: &mut DataBag| {
                    let restored = match previous {
                        Some(card) => surface.embed_card(&branch_id, &card),
                        None => surface.clear_card_slot(&branch_id),
                    };
                    warn_on_err(restored, &format!("restore card slot of {}", branch_id));
                }),
                outcome: outcome_of(dragged),
            }
        }
        Action::AgentGenerateTemplate {
            target_branch_id,
            template_data_key,
        } => {
            let template = match data.template(template_data_key) {
                Ok(template) => template,
                Err(err) => return Execution::degraded(index, action, err),
            };
            if !surface.has_branch(target_branch_id) {
                return Execution::degraded(
                    index,
                    action,
                    PlayerError::MissingBranch(target_branch_id.clone()),
                );
            }

            let created = expand_template(surface, timings, target_branch_id, &template).await;
            log::info!(
                "Generated {} branches under {}",
                created.len(),
                target_branch_id
            );
            let complete = created.len() == template.descendant_count();

            Execution {
                record: UndoRecord::new(index, action, move |surface: &mut S, _: &mut DataBag| {
                    // deepest first, so no branch is removed along with its parent
                    for id in created.iter().rev() {
                        warn_on_err(surface.remove_branch(id), &format!("remove branch {}", id));
                    }
                }),
                outcome: outcome_of(complete),
            }
        }
        Action::ShowTemplateGenerationEffect { message, .. } => {
            let text = data.interpolate(message.as_deref().unwrap_or(GENERATION_MESSAGE));
            match surface.render_message(&text, Speaker::Agent, true).await {
                Ok(()) => Execution::noop(index, action, StepOutcome::Applied),
                Err(err) => Execution::degraded(index, action, err),
            }
        }
        Action::ShowThoughtBubble {
            role,
            text,
            attach_to_selector,
        } => {
            let text = data.interpolate(text);
            if let Err(err) = surface.show_thought(role, &text, attach_to_selector.as_deref()) {
                return Execution::degraded(index, action, err);
            }
            Execution::applied(UndoRecord::new(
                index,
                action,
                |surface: &mut S, _: &mut DataBag| surface.hide_thought(),
            ))
        }
        Action::HideThoughtBubble => {
            // the bubble was already hidden above; what it showed is not kept
            Execution::noop(index, action, StepOutcome::Applied)
        }
        Action::Narrate { text } => {
            surface.narrate(&data.interpolate(text));
            Execution::noop(index, action, StepOutcome::Applied)
        }
        Action::Unrecognized => {
            log::warn!("Step {} has an unknown action, ignoring it", index + 1);
            Execution::noop(index, action, StepOutcome::Unrecognized)
        }
    }
}

async fn confirm<S: PresentationSurface>(
    surface: &mut S,
    data: &mut DataBag,
    index: usize,
    action: &'static str,
    text: &str,
    responses: Option<&ConfirmationResponses>,
) -> Execution<S> {
    let confirmed = match surface.render_confirmation_prompt(text).await {
        Ok(confirmed) => confirmed,
        Err(err) => return Execution::degraded(index, action, err),
    };
    let previous = data.set_last_confirmation(Some(confirmed));
    log::info!("Step {} confirmation answered {}", index + 1, confirmed);

    let defaults = ConfirmationResponses::default();
    let reply = data.interpolate(responses.unwrap_or(&defaults).for_choice(confirmed));
    let replied = warn_on_err(
        surface.render_message(&reply, Speaker::Agent, true).await,
        "reply to confirmation",
    );

    Execution {
        record: UndoRecord::new(index, action, move |_: &mut S, data: &mut DataBag| {
            data.set_last_confirmation(previous);
        }),
        outcome: outcome_of(replied),
    }
}

struct PendingBranch<'a> {
    parent: Option<usize>,
    parent_id: String,
    node: &'a TemplateNode,
    depth: usize,
    at: Duration,
}

/// A generated branch and the moment it appears, measured from the start of the step
struct ScheduledBranch<'a> {
    id: String,
    /// Position of the parent in the schedule; `None` for the target itself
    parent: Option<usize>,
    parent_id: String,
    text: &'a str,
    at: Duration,
}

/// Lay out the children of `template` in depth-first order with their appearance times.
///
/// Top-level branches come one after another, each settling before the next
/// one's stagger starts. Nested branches are timed from their parent's appearance.
fn schedule_template<'a>(
    timings: &Timings,
    target: &str,
    template: &'a TemplateNode,
) -> Vec<ScheduledBranch<'a>> {
    let mut ready = Duration::ZERO;
    let mut roots = Vec::with_capacity(template.children.len());
    for (index, node) in template.children.iter().enumerate() {
        let at = ready + timings.template_delay(1, index);
        ready = at + timings.branch_settle();
        roots.push(PendingBranch {
            parent: None,
            parent_id: target.to_string(),
            node,
            depth: 1,
            at,
        });
    }

    let mut schedule: Vec<ScheduledBranch<'a>> = Vec::new();
    let mut pending: Vec<PendingBranch<'a>> = roots.into_iter().rev().collect();
    while let Some(branch) = pending.pop() {
        let id = format!("{}.{}", branch.parent_id, branch.node.id);
        let position = schedule.len();
        pending.extend(
            branch
                .node
                .children
                .iter()
                .enumerate()
                .rev()
                .map(|(index, child)| PendingBranch {
                    parent: Some(position),
                    parent_id: id.clone(),
                    node: child,
                    depth: branch.depth + 1,
                    at: branch.at + timings.template_delay(branch.depth + 1, index),
                }),
        );
        schedule.push(ScheduledBranch {
            id,
            parent: branch.parent,
            parent_id: branch.parent_id,
            text: &branch.node.text,
            at: branch.at,
        });
    }
    schedule
}

/// Materialize the children of `template` under `target` as a timed cascade.
///
/// Returns the ids of the branches actually created, in depth-first order. A
/// branch that fails to appear takes its subtree with it.
async fn expand_template<S: PresentationSurface>(
    surface: &mut S,
    timings: &Timings,
    target: &str,
    template: &TemplateNode,
) -> Vec<String> {
    let schedule = schedule_template(timings, target, template);

    // parents always precede their children: same or later time, later in the schedule
    let mut order: Vec<usize> = (0..schedule.len()).collect();
    order.sort_by_key(|&position| schedule[position].at);

    let mut created = vec![false; schedule.len()];
    let mut now = Duration::ZERO;
    let mut last_appeared = None;
    for position in order {
        let branch = &schedule[position];
        if let Some(parent) = branch.parent {
            if !created[parent] {
                log::debug!("Skipping {}: its parent was not generated", branch.id);
                continue;
            }
        }

        if branch.at > now {
            surface.pause(branch.at - now).await;
            now = branch.at;
        }
        created[position] = warn_on_err(
            surface.create_branch(&branch.id, branch.text, Some(branch.parent_id.as_str())),
            &format!("generate branch {}", branch.id),
        );
        if created[position] {
            last_appeared = Some(branch.at);
        }
    }

    if let Some(at) = last_appeared {
        let settled = at + timings.branch_settle();
        if settled > now {
            surface.pause(settled - now).await;
        }
    }

    schedule
        .into_iter()
        .zip(created)
        .filter(|(_, created)| *created)
        .map(|(branch, _)| branch.id)
        .collect()
}
