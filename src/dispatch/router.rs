//! Dispatch Router
//!
//! Maps each dispatchable step to its downstream topic and builds the
//! canonical payload:
//!
//! ```json
//! { "<variant fields>": "...", "context": { }, "timestamp": "2024-05-01T12:00:00.000Z" }
//! ```
//!
//! | Step type         | Topic             | Fields                           |
//! |-------------------|-------------------|----------------------------------|
//! | `service_call`    | `service-calls`   | `service`, `endpoint`            |
//! | `schedule_task`   | `schedule-tasks`  | `task`, `cron`                   |
//! | `data_processing` | `data-processing` | `processingType`, `batchSize`    |
//! | `notification`    | `notifications`   | `notificationType`, `message`    |
//!
//! Conditions and unrecognized steps are never dispatched.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use serde::Serialize;
use serde_json::Value;

use super::publisher::MessagePublisher;
use crate::error::{EngineError, PublishError};
use crate::workflow::{Context, Step, StepKind};

pub const SERVICE_CALLS_TOPIC: &str = "service-calls";
pub const SCHEDULE_TASKS_TOPIC: &str = "schedule-tasks";
pub const DATA_PROCESSING_TOPIC: &str = "data-processing";
pub const NOTIFICATIONS_TOPIC: &str = "notifications";

/// Returns the topic a step kind is published to, if any.
pub fn topic_for(kind: &StepKind) -> Option<&'static str> {
    StepFields::route(kind).map(|(topic, _)| topic)
}

#[derive(Serialize)]
#[serde(untagged)]
enum StepFields<'a> {
    #[serde(rename_all = "camelCase")]
    ServiceCall { service: &'a str, endpoint: &'a str },
    #[serde(rename_all = "camelCase")]
    ScheduleTask { task: &'a str, cron: &'a str },
    #[serde(rename_all = "camelCase")]
    DataProcessing {
        processing_type: &'a str,
        batch_size: i64,
    },
    #[serde(rename_all = "camelCase")]
    Notification {
        notification_type: &'a str,
        message: &'a str,
    },
}

impl<'a> StepFields<'a> {
    /// Returns the topic and payload fields for a dispatchable kind.
    fn route(kind: &'a StepKind) -> Option<(&'static str, Self)> {
        let routed = match kind {
            StepKind::ServiceCall { service, endpoint } => {
                (SERVICE_CALLS_TOPIC, Self::ServiceCall { service, endpoint })
            }
            StepKind::ScheduleTask { task, cron } => {
                (SCHEDULE_TASKS_TOPIC, Self::ScheduleTask { task, cron })
            }
            StepKind::DataProcessing {
                processing_type,
                batch_size,
            } => (
                DATA_PROCESSING_TOPIC,
                Self::DataProcessing {
                    processing_type,
                    batch_size: *batch_size,
                },
            ),
            StepKind::Notification {
                notification_type,
                message,
            } => (
                NOTIFICATIONS_TOPIC,
                Self::Notification {
                    notification_type,
                    message,
                },
            ),
            StepKind::Condition { .. } | StepKind::Unrecognized { .. } => return None,
        };
        Some(routed)
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(flatten)]
    fields: StepFields<'a>,
    context: &'a Context,
    timestamp: String,
}

/// Builds the outbound payload for a step kind.
///
/// Returns `Ok(None)` for kinds that are not dispatched.
pub fn build_payload(
    kind: &StepKind,
    context: &Context,
    timestamp: DateTime<Utc>,
) -> Result<Option<Value>, serde_json::Error> {
    match StepFields::route(kind) {
        Some((_, fields)) => encode(fields, context, timestamp).map(Some),
        None => Ok(None),
    }
}

fn encode(
    fields: StepFields<'_>,
    context: &Context,
    timestamp: DateTime<Utc>,
) -> Result<Value, serde_json::Error> {
    serde_json::to_value(Envelope {
        fields,
        context,
        timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Routes steps to their topics through an injected publisher.
///
/// Cheap to share: the publisher sits behind an `Arc`, so one router (or
/// engine) can serve any number of concurrent instances.
#[derive(Clone)]
pub struct DispatchRouter {
    publisher: Arc<dyn MessagePublisher>,
}

impl DispatchRouter {
    /// Creates a router that publishes through `publisher`.
    pub fn new(publisher: Arc<dyn MessagePublisher>) -> Self {
        Self { publisher }
    }

    /// Publishes exactly one message for a dispatchable step.
    ///
    /// Returns the topic used, or `None` if the step kind is not
    /// dispatched. Delivery is fire-and-forget: nothing waits for the
    /// downstream subsystem.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DispatchFailure`] if the payload cannot be
    /// serialized or the publisher rejects it.
    pub async fn dispatch(
        &self,
        step: &Step,
        context: &Context,
    ) -> Result<Option<&'static str>, EngineError> {
        let Some((topic, fields)) = StepFields::route(&step.kind) else {
            return Ok(None);
        };

        let failure = |source: PublishError| EngineError::DispatchFailure {
            step: step.name.clone(),
            topic,
            source,
        };

        let payload = encode(fields, context, Utc::now()).map_err(|e| failure(e.into()))?;

        info!("Dispatching step '{}' to topic '{}'", step.name, topic);

        self.publisher
            .publish(topic, payload)
            .await
            .map_err(failure)?;

        Ok(Some(topic))
    }
}

impl std::fmt::Debug for DispatchRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchRouter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::MemoryPublisher;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::json;

    fn context() -> Context {
        json!({"orderId": 7, "tags": ["a", "b"]})
            .as_object()
            .cloned()
            .unwrap()
    }

    struct RejectingPublisher;

    #[async_trait]
    impl MessagePublisher for RejectingPublisher {
        async fn publish(&self, _topic: &str, _payload: Value) -> Result<(), PublishError> {
            Err(PublishError::Transport("broker unreachable".to_string()))
        }
    }

    #[test]
    fn test_topic_mapping() {
        assert_eq!(
            topic_for(&Step::service_call("s", "svc", "/x").kind),
            Some("service-calls")
        );
        assert_eq!(
            topic_for(&StepKind::ScheduleTask {
                task: "t".to_string(),
                cron: "* * * * *".to_string()
            }),
            Some("schedule-tasks")
        );
        assert_eq!(
            topic_for(&StepKind::DataProcessing {
                processing_type: "etl".to_string(),
                batch_size: 10
            }),
            Some("data-processing")
        );
        assert_eq!(
            topic_for(&Step::notification("n", "sms", "hi").kind),
            Some("notifications")
        );
        assert_eq!(topic_for(&Step::condition("c", "1", "a", "b").kind), None);
    }

    #[test]
    fn test_data_processing_payload_shape() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let kind = StepKind::DataProcessing {
            processing_type: "aggregate".to_string(),
            batch_size: 500,
        };

        let payload = build_payload(&kind, &context(), at).unwrap().unwrap();
        assert_eq!(
            payload,
            json!({
                "processingType": "aggregate",
                "batchSize": 500,
                "context": {"orderId": 7, "tags": ["a", "b"]},
                "timestamp": "2024-05-01T12:00:00.000Z"
            })
        );
    }

    #[test]
    fn test_schedule_task_payload_shape() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let kind = StepKind::ScheduleTask {
            task: "cleanup".to_string(),
            cron: "0 0 * * *".to_string(),
        };

        let payload = build_payload(&kind, &Context::new(), at).unwrap().unwrap();
        assert_eq!(payload["task"], "cleanup");
        assert_eq!(payload["cron"], "0 0 * * *");
        assert_eq!(payload["context"], json!({}));
    }

    #[test]
    fn test_condition_has_no_payload() {
        let kind = Step::condition("c", "true", "a", "b").kind;
        assert!(build_payload(&kind, &context(), Utc::now()).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_service_call_dispatch() {
        let publisher = Arc::new(MemoryPublisher::new());
        let router = DispatchRouter::new(publisher.clone());

        let step = Step::service_call("s1", "cbi-service", "/x");
        let topic = router.dispatch(&step, &context()).await.unwrap();
        assert_eq!(topic, Some("service-calls"));

        let messages = publisher.messages_for("service-calls");
        assert_eq!(messages.len(), 1);

        let payload = &messages[0].payload;
        assert_eq!(payload["service"], "cbi-service");
        assert_eq!(payload["endpoint"], "/x");
        assert_eq!(payload["context"], Value::Object(context()));
        assert!(payload["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_condition_not_dispatched() {
        let publisher = Arc::new(MemoryPublisher::new());
        let router = DispatchRouter::new(publisher.clone());

        let topic = router
            .dispatch(&Step::condition("c", "true", "a", "b"), &context())
            .await
            .unwrap();

        assert_eq!(topic, None);
        assert!(publisher.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_topic_agrees_with_topic_for() {
        let publisher = Arc::new(MemoryPublisher::new());
        let router = DispatchRouter::new(publisher.clone());

        let steps = vec![
            Step::service_call("s", "svc", "/x"),
            Step::new(
                "t",
                StepKind::ScheduleTask {
                    task: "t".to_string(),
                    cron: "* * * * *".to_string(),
                },
            ),
            Step::new(
                "d",
                StepKind::DataProcessing {
                    processing_type: "etl".to_string(),
                    batch_size: 1,
                },
            ),
            Step::notification("n", "sms", "hi"),
            Step::condition("c", "1", "a", "b"),
            Step::new(
                "u",
                StepKind::Unrecognized {
                    type_tag: "webhook".to_string(),
                },
            ),
        ];

        for step in &steps {
            let dispatched = router.dispatch(step, &context()).await.unwrap();
            assert_eq!(dispatched, topic_for(&step.kind), "step {}", step.name);
            assert_eq!(dispatched.is_some(), step.is_dispatchable());
        }
        assert_eq!(publisher.len(), 4);
    }

    #[tokio::test]
    async fn test_publish_failure_becomes_dispatch_failure() {
        let router = DispatchRouter::new(Arc::new(RejectingPublisher));

        let err = router
            .dispatch(&Step::notification("n", "email", "hello"), &context())
            .await
            .unwrap_err();

        match err {
            EngineError::DispatchFailure { step, topic, source } => {
                assert_eq!(step, "n");
                assert_eq!(topic, "notifications");
                assert!(matches!(source, PublishError::Transport(_)));
            }
            other => panic!("expected DispatchFailure, got {:?}", other),
        }
    }
}
