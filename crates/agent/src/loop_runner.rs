//! The reasoning loop — an explicit bounded state machine.
//!
//! One invocation handles one user message:
//!
//! 1. **Deciding** — present history plus the operation catalog to the
//!    model; it proposes an action or a final answer
//! 2. **Acting** — resolve the operation, pass mutating calls through the
//!    confirmation gate, execute through the remote client
//! 3. **Observing** — append the result to the conversation, loop back
//!
//! `Done` and `Aborted` are terminal. The cycle counter is the safety
//! valve: exceeding it produces an explanatory answer, never an unbounded
//! loop. Unknown operations and gate denials become observations the model
//! can recover from; only authorization failures and internal faults
//! propagate to the caller.

use crate::gate::{self, GateDecision};
use foliant_core::answer::OperationTrace;
use foliant_core::model::{Decision, ModelBackend, ModelRequest};
use foliant_core::operation::OperationRegistry;
use foliant_core::store::ConversationStore;
use foliant_core::turn::{ConversationId, ConversationState, Turn};
use foliant_core::{Error, OperationError, RegistryError, RemoteError};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Answer returned when the iteration ceiling is hit.
const ITERATION_LIMIT_ANSWER: &str =
    "I reached the operation limit for this request before I could finish. \
     The steps completed so far are recorded above — please narrow the \
     request or ask again.";

/// The loop's explicit states.
enum LoopState {
    Deciding,
    Acting { operation: String, arguments: Value },
    Observing { turn: Turn },
    Done { answer: String },
    Aborted,
}

/// What a completed loop invocation hands back to the caller.
#[derive(Debug, Clone)]
pub struct LoopResult {
    pub conversation_id: ConversationId,
    pub answer: String,
    /// One entry per executed observation, for the verifier.
    pub traces: Vec<OperationTrace>,
    /// Decide→act→observe cycles consumed.
    pub iterations: u32,
    /// True when the iteration ceiling forced the answer.
    pub aborted: bool,
}

/// The reasoning loop over a model backend, operation registry, and
/// conversation store.
pub struct AgentLoop {
    model: Arc<dyn ModelBackend>,
    registry: Arc<OperationRegistry>,
    store: Arc<dyn ConversationStore>,
    system_prompt: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_iterations: u32,
}

impl AgentLoop {
    pub fn new(
        model: Arc<dyn ModelBackend>,
        registry: Arc<OperationRegistry>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            model,
            registry,
            store,
            system_prompt: crate::SYSTEM_PROMPT.to_string(),
            temperature: 0.0,
            max_tokens: None,
            max_iterations: 10,
        }
    }

    /// Set the maximum decide→act→observe cycles per invocation.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the maximum tokens per model reply.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Replace the standing system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Process one user message and run the loop to a terminal state.
    pub async fn process(
        &self,
        conversation_id: &ConversationId,
        message: &str,
    ) -> Result<LoopResult, Error> {
        let mut state = self.store.get(conversation_id).await?;
        self.record(&mut state, Turn::user(message)).await?;

        info!(
            conversation_id = %conversation_id,
            turns = state.turns.len(),
            "Reasoning loop starting"
        );

        let mut traces: Vec<OperationTrace> = Vec::new();
        let mut cycles: u32 = 0;
        let mut machine = LoopState::Deciding;

        loop {
            machine = match machine {
                LoopState::Deciding => {
                    if cycles >= self.max_iterations {
                        warn!(
                            conversation_id = %conversation_id,
                            cycles,
                            "Iteration ceiling reached"
                        );
                        LoopState::Aborted
                    } else {
                        let request = ModelRequest {
                            system_prompt: self.system_prompt.clone(),
                            turns: state.turns.clone(),
                            operations: self.registry.descriptors(),
                            temperature: self.temperature,
                            max_tokens: self.max_tokens,
                        };
                        match self.model.propose(request).await? {
                            Decision::Answer { text } => LoopState::Done { answer: text },
                            Decision::Act {
                                operation,
                                arguments,
                            } => LoopState::Acting {
                                operation,
                                arguments,
                            },
                        }
                    }
                }

                LoopState::Acting {
                    operation,
                    arguments,
                } => {
                    let call_id = Uuid::new_v4().to_string();
                    debug!(conversation_id = %conversation_id, %operation, "Executing action");
                    self.record(
                        &mut state,
                        Turn::action(&call_id, &operation, arguments.clone()),
                    )
                    .await?;

                    let observation =
                        self.perform(&call_id, &operation, &arguments, &state).await?;
                    LoopState::Observing { turn: observation }
                }

                LoopState::Observing { turn } => {
                    if let Turn::Observation {
                        operation,
                        success,
                        output,
                        ..
                    } = &turn
                    {
                        traces.push(OperationTrace {
                            operation: operation.clone(),
                            turn: state.turns.len(),
                            success: *success,
                            output: output.clone(),
                        });
                    }
                    self.record(&mut state, turn).await?;
                    cycles += 1;
                    LoopState::Deciding
                }

                LoopState::Done { answer } => {
                    self.record(&mut state, Turn::answer(&answer)).await?;
                    info!(
                        conversation_id = %conversation_id,
                        cycles,
                        operations = traces.len(),
                        "Reasoning loop completed"
                    );
                    return Ok(LoopResult {
                        conversation_id: conversation_id.clone(),
                        answer,
                        traces,
                        iterations: cycles,
                        aborted: false,
                    });
                }

                LoopState::Aborted => {
                    self.record(&mut state, Turn::answer(ITERATION_LIMIT_ANSWER))
                        .await?;
                    return Ok(LoopResult {
                        conversation_id: conversation_id.clone(),
                        answer: ITERATION_LIMIT_ANSWER.to_string(),
                        traces,
                        iterations: cycles,
                        aborted: true,
                    });
                }
            };
        }
    }

    /// Append a turn to both the working state and the store.
    async fn record(&self, state: &mut ConversationState, turn: Turn) -> Result<(), Error> {
        self.store.append(&state.id, turn.clone()).await?;
        state.push(turn);
        Ok(())
    }

    /// Resolve and execute one action, producing its observation.
    ///
    /// Recoverable failures (unknown operation, gate denial, invalid
    /// arguments, non-retryable remote errors) come back as failed
    /// observations; `Unauthorized` propagates.
    async fn perform(
        &self,
        call_id: &str,
        operation: &str,
        arguments: &Value,
        state: &ConversationState,
    ) -> Result<Turn, Error> {
        let op = match self.registry.resolve(operation) {
            Ok(op) => op,
            Err(RegistryError::UnknownOperation(name)) => {
                debug!(operation = %name, "Model requested unknown operation");
                return Ok(Turn::failed_observation(
                    call_id,
                    operation,
                    format!(
                        "Unknown operation '{name}'. Available operations: {}",
                        self.registry.names().join(", ")
                    ),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let descriptor = op.descriptor();
        if descriptor.mutating
            && let GateDecision::Deny(denial) = gate::check(state, &descriptor, arguments)
        {
            warn!(
                operation = %descriptor.name,
                denial = ?denial,
                "Confirmation gate refused mutating call"
            );
            return Ok(Turn::failed_observation(
                call_id,
                operation,
                denial.guidance(operation),
            ));
        }

        match op.execute(arguments.clone()).await {
            Ok(result) => Ok(Turn::observation(
                call_id,
                operation,
                result.output,
                result.data,
            )),
            Err(OperationError::InvalidArguments(message)) => Ok(Turn::failed_observation(
                call_id,
                operation,
                format!("Error: {message}"),
            )),
            Err(OperationError::Remote(RemoteError::Unauthorized(message))) => {
                Err(RemoteError::Unauthorized(message).into())
            }
            Err(OperationError::Remote(error)) => {
                warn!(operation, %error, "Operation failed");
                Ok(Turn::failed_observation(
                    call_id,
                    operation,
                    format!("Error: {error}"),
                ))
            }
        }
    }
}
