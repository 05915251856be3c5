//! The conversational turn loop.
//!
//! Each turn: extract form data from the raw message, call the model with
//! the portal functions, run whatever it asked for (merging remembered
//! data into the arguments), feed the results back for a final reply, and
//! persist both sides of the exchange.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use voterflow_core_types::{ChatMessage, ChatRole, RegistrationPayload, RememberedFields};
use voterflow_field_extract::{extract_fields, fast_path, normalize_date, normalize_gender, FastPath};
use voterflow_memory_center::SharedMemoryCenter;
use voterflow_portal_adapter::extract::{extract_application_id, extract_voter_id};
use voterflow_portal_adapter::SharedPortal;

use crate::errors::AgentError;
use crate::prompt::build_system_prompt;
use crate::provider::{FunctionCall, LlmProvider, LlmRequest, LlmResponse, Turn};

const FALLBACK_REPLY: &str = "I apologize, but I encountered an error processing your request.";
const FUNCTION_DONE_REPLY: &str = "Task completed successfully.";

pub struct ChatAgent {
    portal: SharedPortal,
    provider: Arc<dyn LlmProvider>,
    memory: SharedMemoryCenter,
}

impl ChatAgent {
    pub fn new(
        portal: SharedPortal,
        provider: Arc<dyn LlmProvider>,
        memory: SharedMemoryCenter,
    ) -> Self {
        Self {
            portal,
            provider,
            memory,
        }
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Run one conversational turn and return the assistant reply.
    pub async fn chat(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<String, AgentError> {
        self.absorb_message(user_id, message);

        let remembered = self.memory.memory(user_id).remembered;
        let system_prompt = build_system_prompt(&remembered);
        let mut turns: Vec<Turn> = self
            .memory
            .history(session_id)
            .iter()
            .map(|entry| match entry.role {
                ChatRole::User => Turn::user(&entry.content),
                _ => Turn::model_text(&entry.content),
            })
            .collect();
        turns.push(Turn::user(message));

        let request = LlmRequest {
            system_prompt: system_prompt.clone(),
            turns: turns.clone(),
            tools_enabled: true,
        };

        let (response, tools_enabled) = match self.provider.generate(&request).await {
            Ok(response) => (response, true),
            Err(err) => {
                warn!(error = %err, "model call failed, retrying without tools");
                let retry = LlmRequest {
                    tools_enabled: false,
                    ..request
                };
                (self.provider.generate(&retry).await?, false)
            }
        };

        let calls = if tools_enabled {
            response.calls.clone()
        } else {
            Vec::new()
        };
        let mut completed_task = None;
        let reply = if calls.is_empty() {
            non_empty(&response.text, FALLBACK_REPLY)
        } else {
            info!(count = calls.len(), "executing function calls");
            let (results, succeeded) = self.execute_calls(user_id, &calls).await;
            completed_task = succeeded;
            let mut follow_up = turns;
            follow_up.push(Turn::model_calls(calls.clone()));
            follow_up.push(Turn::user(&results));
            let follow = LlmRequest {
                system_prompt,
                turns: follow_up,
                tools_enabled: true,
            };
            match self.provider.generate(&follow).await {
                Ok(LlmResponse { text, .. }) => non_empty(&text, FUNCTION_DONE_REPLY),
                Err(err) => {
                    warn!(error = %err, "follow-up model call failed, using default reply");
                    FUNCTION_DONE_REPLY.to_string()
                }
            }
        };

        // Second extraction pass over the original message; cheap, and the
        // fast path above can miss prose-embedded values.
        let post = extract_fields(message);
        if !post.is_empty() {
            self.memory.update_memory(user_id, &post);
        }

        self.memory
            .append_message(session_id, user_id, ChatMessage::user(message));
        let mut assistant = ChatMessage::assistant(&reply);
        if let Some(first) = calls.first() {
            assistant = assistant.with_function(&first.name, first.args.clone());
        }
        self.memory.append_message(session_id, user_id, assistant);
        self.memory
            .record_interaction(user_id, completed_task.as_deref());

        Ok(reply)
    }

    /// Pull fields out of the raw message before the model sees it.
    fn absorb_message(&self, user_id: &str, message: &str) {
        let found = match fast_path(message) {
            Some(FastPath::Login {
                email,
                password,
                mobile,
            }) => RememberedFields {
                email: Some(email),
                password: Some(password),
                mobile: Some(mobile),
                ..Default::default()
            },
            Some(FastPath::Registration(fields)) => fields,
            None => extract_fields(message),
        };
        if !found.is_empty() {
            debug!(fields = found.set_count(), "absorbed fields from message");
            self.memory.update_memory(user_id, &found);
        }
    }

    /// Run each call in order; returns the joined result blocks and the
    /// name of the first call that reported success.
    async fn execute_calls(
        &self,
        user_id: &str,
        calls: &[FunctionCall],
    ) -> (String, Option<String>) {
        let mut blocks = Vec::with_capacity(calls.len());
        let mut succeeded = None;
        for call in calls {
            let result = self.dispatch(user_id, call).await;
            if succeeded.is_none() && result["success"].as_bool().unwrap_or(false) {
                succeeded = Some(call.name.clone());
            }
            blocks.push(
                serde_json::to_string_pretty(&result).unwrap_or_else(|_| "{}".to_string()),
            );
        }
        (blocks.join("\n\n"), succeeded)
    }

    async fn dispatch(&self, user_id: &str, call: &FunctionCall) -> Value {
        info!(function = %call.name, "dispatching function call");
        match call.name.as_str() {
            "autoSignupAndLogin" => self.run_login(user_id, &call.args).await,
            "submitVoterRegistration" => self.run_registration(user_id, &call.args).await,
            "checkApplicationStatus" => self.run_status_check(user_id, &call.args).await,
            "searchVoter" => self.run_search(user_id, &call.args).await,
            other => json!({ "success": false, "message": format!("Unknown function: {other}") }),
        }
    }

    async fn run_login(&self, user_id: &str, args: &Value) -> Value {
        let remembered = self.memory.memory(user_id).remembered;
        let email = arg_str(args, "email").or(remembered.email);
        let password = arg_str(args, "password").or(remembered.password);
        let mobile = arg_str(args, "mobile").or(remembered.mobile);

        let (Some(email), Some(mobile)) = (email, mobile) else {
            return json!({
                "success": false,
                "message": "Email and mobile number are required for login/signup. Please provide them."
            });
        };
        let Some(password) = password else {
            return json!({
                "success": false,
                "message": "Password is required. Please provide a password for account creation or login."
            });
        };

        let outcome = self.portal.login_or_signup(&email, &password, &mobile).await;
        self.memory.update_memory(
            user_id,
            &RememberedFields {
                email: Some(email),
                password: Some(password),
                mobile: Some(mobile),
                ..Default::default()
            },
        );

        if !outcome.success {
            return serde_json::to_value(&outcome).unwrap_or_default();
        }

        // With the portal session open, finish the job if every
        // registration field is already remembered.
        let remembered = self.memory.memory(user_id).remembered;
        match remembered.registration_payload() {
            Ok(payload) => {
                info!("all registration data on file, auto-submitting after login");
                let payload = normalize_payload(payload);
                let registration = self.portal.submit_registration(&payload).await;
                self.record_registration(user_id, &payload, &registration);
                let message = if registration.success {
                    format!(
                        "Logged in successfully. Registration also submitted successfully! {}",
                        registration.message
                    )
                } else {
                    format!(
                        "Logged in successfully. However, registration submission failed: {}",
                        registration.message
                    )
                };
                json!({ "success": true, "message": message })
            }
            Err(_) => serde_json::to_value(&outcome).unwrap_or_default(),
        }
    }

    async fn run_registration(&self, user_id: &str, args: &Value) -> Value {
        let remembered = self.memory.memory(user_id).remembered;
        // Explicit arguments win; memory fills the gaps.
        let payload = normalize_payload(RegistrationPayload {
            aadhaar: arg_str(args, "aadhaar")
                .or(remembered.aadhaar)
                .unwrap_or_default(),
            full_name: arg_str(args, "fullName")
                .or(remembered.full_name)
                .unwrap_or_default(),
            father_name: arg_str(args, "fatherName")
                .or(remembered.father_name)
                .unwrap_or_default(),
            dob: arg_str(args, "dob").or(remembered.dob).unwrap_or_default(),
            gender: arg_str(args, "gender")
                .or(remembered.gender)
                .unwrap_or_default(),
            mobile: arg_str(args, "mobile")
                .or(remembered.mobile)
                .unwrap_or_default(),
            email: arg_str(args, "email")
                .or(remembered.email)
                .unwrap_or_default(),
            address: arg_str(args, "address")
                .or(remembered.address)
                .unwrap_or_default(),
            state: arg_str(args, "state")
                .or(remembered.state)
                .unwrap_or_default(),
            district: arg_str(args, "district")
                .or(remembered.district)
                .unwrap_or_default(),
        });

        let outcome = self.portal.submit_registration(&payload).await;
        self.record_registration(user_id, &payload, &outcome);
        serde_json::to_value(&outcome).unwrap_or_default()
    }

    async fn run_status_check(&self, user_id: &str, args: &Value) -> Value {
        let remembered = self.memory.memory(user_id).remembered;
        let Some(application_id) = arg_str(args, "applicationId").or(remembered.last_application_id)
        else {
            return json!({
                "success": false,
                "message": "Application ID is required. Please provide it or check your previous registration."
            });
        };

        let outcome = self.portal.check_status(&application_id).await;
        if outcome.success {
            if let Some(data) = outcome.data.as_ref() {
                self.memory.update_memory(
                    user_id,
                    &RememberedFields {
                        last_application_id: Some(application_id),
                        registration_status: Some(data.status.clone()),
                        voter_id: data.voter_id.clone(),
                        ..Default::default()
                    },
                );
            }
        }
        serde_json::to_value(&outcome).unwrap_or_default()
    }

    async fn run_search(&self, user_id: &str, args: &Value) -> Value {
        let remembered = self.memory.memory(user_id).remembered;
        let Some(voter_id) = arg_str(args, "voterId").or(remembered.voter_id) else {
            return json!({
                "success": false,
                "message": "Voter ID is required. Please provide it or check your application status first to get your voter ID."
            });
        };

        let outcome = self.portal.search_voter(&voter_id).await;
        if outcome.success {
            self.memory.update_memory(
                user_id,
                &RememberedFields {
                    voter_id: Some(voter_id),
                    ..Default::default()
                },
            );
        }
        serde_json::to_value(&outcome).unwrap_or_default()
    }

    /// Persist the submitted payload and any ids the portal handed back.
    fn record_registration(
        &self,
        user_id: &str,
        payload: &RegistrationPayload,
        outcome: &voterflow_core_types::RegistrationOutcome,
    ) {
        let status = if outcome.success { "submitted" } else { "failed" };
        let updates = RememberedFields {
            aadhaar: Some(payload.aadhaar.clone()),
            full_name: Some(payload.full_name.clone()),
            father_name: Some(payload.father_name.clone()),
            dob: Some(payload.dob.clone()),
            gender: Some(payload.gender.clone()),
            mobile: Some(payload.mobile.clone()),
            email: Some(payload.email.clone()),
            address: Some(payload.address.clone()),
            state: Some(payload.state.clone()),
            district: Some(payload.district.clone()),
            registration_status: Some(status.to_string()),
            last_application_id: outcome
                .application_id
                .clone()
                .or_else(|| extract_application_id(&outcome.message)),
            voter_id: outcome
                .voter_id
                .clone()
                .or_else(|| extract_voter_id(&outcome.message)),
            ..Default::default()
        };
        self.memory.update_memory(user_id, &updates);
    }
}

fn arg_str(args: &Value, key: &str) -> Option<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn normalize_payload(mut payload: RegistrationPayload) -> RegistrationPayload {
    if let Some(dob) = normalize_date(&payload.dob) {
        payload.dob = dob;
    }
    if let Some(gender) = normalize_gender(&payload.gender) {
        payload.gender = gender.as_str().to_string();
    }
    payload
}

fn non_empty(text: &str, fallback: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use voterflow_core_types::{
        LoginOutcome, RegistrationOutcome, SearchOutcome, StatusData, StatusOutcome,
    };
    use voterflow_memory_center::MemoryCenter;
    use voterflow_portal_adapter::Portal;

    #[derive(Default)]
    struct RecordingPortal {
        logged_in: AtomicBool,
        ops: Mutex<Vec<String>>,
        registrations: Mutex<Vec<RegistrationPayload>>,
    }

    impl RecordingPortal {
        fn ops(&self) -> Vec<String> {
            self.ops.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Portal for RecordingPortal {
        async fn login_or_signup(&self, email: &str, _: &str, _: &str) -> LoginOutcome {
            self.ops.lock().unwrap().push(format!("login:{email}"));
            self.logged_in.store(true, Ordering::SeqCst);
            LoginOutcome::ok("Logged in successfully.")
        }

        async fn submit_registration(&self, payload: &RegistrationPayload) -> RegistrationOutcome {
            self.ops.lock().unwrap().push("register".to_string());
            self.registrations.lock().unwrap().push(payload.clone());
            RegistrationOutcome {
                success: true,
                message: "Registration submitted! Application ID: APP1755X4821. \
                          Your Voter ID is VOT123456"
                    .to_string(),
                application_id: Some("APP1755X4821".to_string()),
                voter_id: Some("VOT123456".to_string()),
            }
        }

        async fn check_status(&self, application_id: &str) -> StatusOutcome {
            self.ops
                .lock()
                .unwrap()
                .push(format!("status:{application_id}"));
            StatusOutcome {
                success: true,
                message: "Approved".to_string(),
                data: Some(StatusData {
                    application_id: application_id.to_string(),
                    status: "Approved".to_string(),
                    voter_id: Some("VOT123456".to_string()),
                    submitted_date: None,
                    remarks: "ok".to_string(),
                }),
            }
        }

        async fn search_voter(&self, voter_id: &str) -> SearchOutcome {
            self.ops.lock().unwrap().push(format!("search:{voter_id}"));
            SearchOutcome {
                success: true,
                message: "Found voter: Ravi Kumar".to_string(),
                data: Some(json!({ "voterId": voter_id, "fullName": "Ravi Kumar" })),
            }
        }

        async fn is_logged_in(&self) -> bool {
            self.logged_in.load(Ordering::SeqCst)
        }

        async fn close(&self) {}
    }

    struct ScriptedProvider {
        responses: Mutex<VecDeque<Result<LlmResponse, AgentError>>>,
        requests: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Result<LlmResponse, AgentError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn text(reply: &str) -> Result<LlmResponse, AgentError> {
            Ok(LlmResponse {
                text: reply.to_string(),
                calls: Vec::new(),
            })
        }

        fn call(name: &str, args: Value) -> Result<LlmResponse, AgentError> {
            Ok(LlmResponse {
                text: String::new(),
                calls: vec![FunctionCall {
                    name: name.to_string(),
                    args,
                }],
            })
        }

        fn requests(&self) -> Vec<LlmRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, AgentError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(AgentError::EmptyResponse))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn agent(
        portal: Arc<RecordingPortal>,
        provider: Arc<ScriptedProvider>,
    ) -> (ChatAgent, SharedMemoryCenter) {
        let memory = Arc::new(MemoryCenter::new());
        let agent = ChatAgent::new(portal, provider, Arc::clone(&memory));
        (agent, memory)
    }

    const REGISTRATION_MESSAGE: &str = "123456789012, Ravi Kumar, Suresh Kumar, feb 01 2005, \
        male, 9876543210, ravi@example.com, 12 Gandhi Nagar, Andhra Pradesh, Tirupati";

    #[tokio::test]
    async fn plain_text_turn_persists_transcript_and_memory() {
        let portal = Arc::new(RecordingPortal::default());
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::text("Got it!")]));
        let (agent, memory) = agent(Arc::clone(&portal), Arc::clone(&provider));

        let reply = agent
            .chat("u1", "s1", "my email is ravi@example.com and my mobile is 9876543210")
            .await
            .unwrap();

        assert_eq!(reply, "Got it!");
        let remembered = memory.memory("u1").remembered;
        assert_eq!(remembered.email.as_deref(), Some("ravi@example.com"));
        assert_eq!(remembered.mobile.as_deref(), Some("9876543210"));
        let history = memory.history("s1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[1].content, "Got it!");
        assert!(portal.ops().is_empty());
    }

    #[tokio::test]
    async fn login_call_chains_registration_when_memory_complete() {
        let portal = Arc::new(RecordingPortal::default());
        let provider = Arc::new(ScriptedProvider::new(vec![
            ScriptedProvider::text("Saved your details."),
            ScriptedProvider::call(
                "autoSignupAndLogin",
                json!({ "email": "ravi@example.com", "password": "secret123",
                        "mobile": "9876543210" }),
            ),
            ScriptedProvider::text("You're registered! Application APP1755X4821."),
        ]));
        let (agent, memory) = agent(Arc::clone(&portal), Arc::clone(&provider));

        agent.chat("u1", "s1", REGISTRATION_MESSAGE).await.unwrap();
        let reply = agent
            .chat("u1", "s1", "log me in with password secret123 and finish my registration")
            .await
            .unwrap();

        assert!(reply.contains("APP1755X4821"));
        assert_eq!(portal.ops(), vec!["login:ravi@example.com", "register"]);

        let submitted = portal.registrations.lock().unwrap().clone();
        assert_eq!(submitted[0].dob, "2005-02-01");
        assert_eq!(submitted[0].gender, "Male");

        let remembered = memory.memory("u1").remembered;
        assert_eq!(
            remembered.last_application_id.as_deref(),
            Some("APP1755X4821")
        );
        assert_eq!(remembered.voter_id.as_deref(), Some("VOT123456"));
        assert_eq!(remembered.registration_status.as_deref(), Some("submitted"));

        let interaction = memory.memory("u1").interaction;
        assert_eq!(interaction.total_conversations, 2);
        assert_eq!(
            interaction.completed_tasks,
            vec!["autoSignupAndLogin".to_string()]
        );

        // The follow-up turn carried both function outcomes to the model.
        let requests = provider.requests();
        let follow_up = &requests[2];
        let last = follow_up.turns.last().unwrap();
        match &last.parts[0] {
            crate::provider::TurnPart::Text(text) => {
                assert!(text.contains("Registration also submitted successfully"));
            }
            other => panic!("expected text turn, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_check_without_application_id_refuses_before_portal() {
        let portal = Arc::new(RecordingPortal::default());
        let provider = Arc::new(ScriptedProvider::new(vec![
            ScriptedProvider::call("checkApplicationStatus", json!({})),
            ScriptedProvider::text("Please share your application ID."),
        ]));
        let (agent, _memory) = agent(Arc::clone(&portal), Arc::clone(&provider));

        let reply = agent.chat("u1", "s1", "what's my application status?").await.unwrap();

        assert_eq!(reply, "Please share your application ID.");
        assert!(portal.ops().is_empty());
        let requests = provider.requests();
        let last = requests[1].turns.last().unwrap();
        match &last.parts[0] {
            crate::provider::TurnPart::Text(text) => {
                assert!(text.contains("Application ID is required"));
            }
            other => panic!("expected text turn, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_without_password_refuses_before_portal() {
        let portal = Arc::new(RecordingPortal::default());
        let provider = Arc::new(ScriptedProvider::new(vec![
            ScriptedProvider::call(
                "autoSignupAndLogin",
                json!({ "email": "ravi@example.com", "mobile": "9876543210" }),
            ),
            ScriptedProvider::text("I need a password to continue."),
        ]));
        let (agent, _memory) = agent(Arc::clone(&portal), Arc::clone(&provider));

        agent.chat("u1", "s1", "log me in").await.unwrap();

        assert!(portal.ops().is_empty());
        let requests = provider.requests();
        let last = requests[1].turns.last().unwrap();
        match &last.parts[0] {
            crate::provider::TurnPart::Text(text) => {
                assert!(text.contains("Password is required"));
            }
            other => panic!("expected text turn, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn registration_call_fills_arguments_from_memory() {
        let portal = Arc::new(RecordingPortal::default());
        let provider = Arc::new(ScriptedProvider::new(vec![
            ScriptedProvider::text("Saved."),
            ScriptedProvider::call("submitVoterRegistration", json!({})),
            ScriptedProvider::text("Done."),
        ]));
        let (agent, _memory) = agent(Arc::clone(&portal), Arc::clone(&provider));

        agent.chat("u1", "s1", REGISTRATION_MESSAGE).await.unwrap();
        agent.chat("u1", "s1", "submit my registration now").await.unwrap();

        let submitted = portal.registrations.lock().unwrap().clone();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].full_name, "Ravi Kumar");
        assert_eq!(submitted[0].aadhaar, "123456789012");
        assert_eq!(submitted[0].district, "Tirupati");
    }

    #[tokio::test]
    async fn model_failure_retries_once_without_tools() {
        let portal = Arc::new(RecordingPortal::default());
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(AgentError::upstream(Some(503), "overloaded", true)),
            ScriptedProvider::text("Back online, how can I help?"),
        ]));
        let (agent, _memory) = agent(Arc::clone(&portal), Arc::clone(&provider));

        let reply = agent.chat("u1", "s1", "hello").await.unwrap();

        assert_eq!(reply, "Back online, how can I help?");
        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].tools_enabled);
        assert!(!requests[1].tools_enabled);
    }

    #[tokio::test]
    async fn both_model_attempts_failing_surfaces_error() {
        let portal = Arc::new(RecordingPortal::default());
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(AgentError::upstream(Some(500), "boom", true)),
            Err(AgentError::upstream(Some(500), "boom again", true)),
        ]));
        let (agent, memory) = agent(Arc::clone(&portal), Arc::clone(&provider));

        let result = agent.chat("u1", "s1", "hello").await;
        assert!(result.is_err());
        // Nothing persisted for a failed turn.
        assert!(memory.history("s1").is_empty());
    }

    #[tokio::test]
    async fn search_uses_remembered_voter_id() {
        let portal = Arc::new(RecordingPortal::default());
        let provider = Arc::new(ScriptedProvider::new(vec![
            ScriptedProvider::call("searchVoter", json!({})),
            ScriptedProvider::text("You're on the rolls."),
        ]));
        let (agent, memory) = agent(Arc::clone(&portal), Arc::clone(&provider));
        memory.update_memory(
            "u1",
            &RememberedFields {
                voter_id: Some("VOT123456".into()),
                ..Default::default()
            },
        );

        agent.chat("u1", "s1", "check my name in the voterlist").await.unwrap();

        assert_eq!(portal.ops(), vec!["search:VOT123456"]);
    }
}
