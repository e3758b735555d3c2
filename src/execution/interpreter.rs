//! Workflow Interpreter
//!
//! Drives one instance through its steps, strictly in document order:
//!
//! 1. Parse the definition document (a parse error fails the instance
//!    before anything is dispatched)
//! 2. For each step, set `current_step`, then
//!    - dispatch it (service call, schedule task, data processing,
//!      notification),
//!    - evaluate it locally (condition), or
//!    - log and skip it (unrecognized type)
//! 3. Mark the instance COMPLETED, or FAILED at the first error
//!
//! Already-dispatched steps are never rolled back.

use log::{error, info, warn};

use crate::dispatch::DispatchRouter;
use crate::error::EngineError;
use crate::monitoring::EventType;
use crate::workflow::{parse_definition, Context, Step, StepKind, WorkflowInstance};

/// Evaluates a condition expression.
///
/// The rule is a fixed heuristic: the expression is true if it contains
/// the text `true` or the digit `1`. Anything else is false; evaluation
/// never fails. The context is not consulted.
pub fn evaluate_condition(expression: &str) -> bool {
    expression.contains("true") || expression.contains('1')
}

/// Executes parsed steps against a single instance.
pub struct Interpreter<'a> {
    router: &'a DispatchRouter,
}

impl<'a> Interpreter<'a> {
    pub fn new(router: &'a DispatchRouter) -> Self {
        Self { router }
    }

    /// Runs a definition document to a terminal state.
    ///
    /// Never returns an error: every failure is recorded on the instance
    /// as FAILED with the error's message. A terminal instance is left
    /// untouched and nothing is dispatched for it.
    pub async fn run(&self, document: &str, instance: &mut WorkflowInstance, context: &Context) {
        if instance.is_terminal() {
            warn!(
                "Instance '{}' is already {}; not resuming",
                instance.instance_name, instance.status
            );
            return;
        }

        let outcome = match parse_definition(document) {
            Ok(steps) => self.run_steps(&steps, instance, context).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                instance.complete();
                info!("Workflow execution completed: {}", instance.instance_name);
            }
            Err(e) => {
                error!("Workflow execution failed: {}: {}", instance.instance_name, e);
                instance.fail(e.to_string());
            }
        }
    }

    /// Runs steps in order, stopping at the first error.
    ///
    /// Does nothing for a terminal instance.
    pub async fn run_steps(
        &self,
        steps: &[Step],
        instance: &mut WorkflowInstance,
        context: &Context,
    ) -> Result<(), EngineError> {
        if instance.is_terminal() {
            warn!(
                "Instance '{}' is already {}; skipping {} steps",
                instance.instance_name,
                instance.status,
                steps.len()
            );
            return Ok(());
        }

        for step in steps {
            info!("Executing step: {} of type: {}", step.name, step.type_tag());
            instance.enter_step(&step.name);

            match &step.kind {
                StepKind::Condition {
                    condition,
                    true_step,
                    false_step,
                } => {
                    info!("Evaluating condition: {}", condition);
                    let result = evaluate_condition(condition);
                    let branch = if result { true_step } else { false_step };

                    // Branch labels are advisory: execution continues with the next step
                    info!("Condition is {}, branch: {}", result, branch);
                    instance.timeline.add_event(
                        &step.name,
                        EventType::ConditionEvaluated {
                            result,
                            branch: branch.clone(),
                        },
                    );
                }
                StepKind::Unrecognized { type_tag } => {
                    warn!("Unknown step type: {}", type_tag);
                    instance.timeline.add_event(
                        &step.name,
                        EventType::Skipped {
                            type_tag: type_tag.clone(),
                        },
                    );
                }
                _ => match self.router.dispatch(step, context).await {
                    Ok(Some(topic)) => {
                        instance.timeline.add_event(
                            &step.name,
                            EventType::Dispatched {
                                topic: topic.to_string(),
                            },
                        );
                    }
                    Ok(None) => {}
                    Err(e) => {
                        instance.timeline.add_event(
                            &step.name,
                            EventType::Failed {
                                reason: e.to_string(),
                            },
                        );
                        return Err(e);
                    }
                },
            }
        }

        Ok(())
    }
}
