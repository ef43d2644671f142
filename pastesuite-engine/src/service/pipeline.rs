//! Execution pipeline
//!
//! Turns an action into a lazy stream of text chunks. Validation runs up
//! front and fails with a [`PipelineError`] before any network call; once a
//! stream exists, provider failures only show up inside it as a final
//! `[Error: ...]` chunk. When the consumer drains the stream an
//! `ExecutionCompleted` event is published with redacted previews.

use pastesuite_core::domain::action::{Action, ActionMode, LocalTransformConfig, LocalTransformKind};
use pastesuite_core::domain::capability::Capability;
use pastesuite_core::domain::connection::Connection;
use pastesuite_core::domain::event::{DomainEvent, ExecutionCompleted, ExecutionStatus};
use pastesuite_core::domain::ids::{ActionId, ConnectionId};
use pastesuite_core::domain::settings::Settings;
use pastesuite_core::{PipelineError, PipelineResult};
use pastesuite_providers::{
    ChunkStream, DEFAULT_TEMPERATURE, Message, ProviderConfig, ProviderError, TextStreamer,
};
use pastesuite_providers::CapabilityRegistry;
use regex::{Captures, Regex};
use std::mem;
use std::sync::{Arc, LazyLock};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::input::InputCapture;
use super::secrets::{API_KEY, SecretStore};
use super::settings::SettingsStore;
use crate::event_bus::EventBus;
use crate::redact;

/// Prompt used when an action does not define one
pub const DEFAULT_PROMPT_TEMPLATE: &str = "{selected_text}";

const OCR_SLOT: &str = "{ocr_text}";

/// Values available to `{name}` placeholders
#[derive(Debug, Clone, Default)]
struct Gathered {
    selected_text: String,
    clipboard: String,
    ocr_text: Option<String>,
}

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(\w+)\}").expect("placeholder pattern is hardcoded and must be valid")
});

impl Gathered {
    /// Replaces known placeholders in one pass; unknown ones are left as
    /// written and substituted values are never expanded again
    fn substitute(&self, template: &str) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures| match self.value(&caps[1]) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    fn value(&self, name: &str) -> Option<&str> {
        match name {
            "selected_text" => Some(&self.selected_text),
            "clipboard" => Some(&self.clipboard),
            "ocr_text" => self.ocr_text.as_deref(),
            _ => None,
        }
    }

    /// Text a local transform works on
    fn source(&self) -> &str {
        if self.selected_text.is_empty() {
            &self.clipboard
        } else {
            &self.selected_text
        }
    }
}

/// How a validated execution produces its output
pub enum Target {
    /// Streams from a provider
    Provider {
        streamer: Box<dyn TextStreamer>,
        config: ProviderConfig,
        messages: Vec<Message>,
        connection: Connection,
    },
    /// Already computed locally
    Resolved(String),
}

/// Fully resolved state for one execution.
///
/// Built fresh by every call to [`ExecutionPipeline::validate`] and owned by
/// that execution alone.
pub struct PipelineContext {
    pub action: Action,
    /// Substituted prompt (for local modes, the local input)
    pub prompt: String,
    pub target: Target,
    pub started: Instant,
}

impl PipelineContext {
    pub fn connection(&self) -> Option<&Connection> {
        match &self.target {
            Target::Provider { connection, .. } => Some(connection),
            Target::Resolved(_) => None,
        }
    }
}

pub struct ExecutionPipeline {
    settings: Arc<SettingsStore>,
    registry: Arc<CapabilityRegistry>,
    secrets: Arc<dyn SecretStore>,
    input: Arc<dyn InputCapture>,
    bus: Arc<EventBus>,
}

impl ExecutionPipeline {
    pub fn new(
        settings: Arc<SettingsStore>,
        registry: Arc<CapabilityRegistry>,
        secrets: Arc<dyn SecretStore>,
        input: Arc<dyn InputCapture>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            settings,
            registry,
            secrets,
            input,
            bus,
        }
    }

    /// Validates `action` and opens a stream for it.
    ///
    /// Every call builds a new context and, for provider-backed actions,
    /// issues a new request on first pull.
    pub fn execute(&self, action: &Action) -> PipelineResult<ExecutionStream> {
        let context = self.validate(action)?;
        Ok(ExecutionStream::new(context, self.bus.clone()))
    }

    /// Runs the validation stage, stopping at the first failure
    pub fn validate(&self, action: &Action) -> PipelineResult<PipelineContext> {
        let started = Instant::now();
        let settings = self.settings.snapshot();

        let mut gathered = Gathered {
            selected_text: self.input.get_selected_text().unwrap_or_default(),
            clipboard: self.input.read_clipboard_text(),
            ocr_text: None,
        };

        let prompt_template = action
            .prompt_template
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_PROMPT_TEMPLATE);

        if action.mode == ActionMode::AiTransform && action.requires(Capability::Ocr) {
            let ocr_text = self.run_ocr(&settings)?;
            if !prompt_template.contains(OCR_SLOT) {
                gathered.selected_text = ocr_text.clone();
            }
            gathered.ocr_text = Some(ocr_text);
        }

        let local = match action.mode {
            ActionMode::AiTransform => None,
            ActionMode::LocalTransform => {
                let config = action.local_transform_config.as_ref().ok_or_else(|| {
                    PipelineError::missing_config("Local transform action has no transform configured")
                })?;
                Some((gathered.source().to_string(), apply_transform(config, gathered.source())?))
            }
            ActionMode::StaticTextPaste => {
                let template = action.static_text_template.as_deref().unwrap_or_default();
                Some((gathered.source().to_string(), gathered.substitute(template)))
            }
            ActionMode::PromptPrefillOnly => {
                let prompt = gathered.substitute(prompt_template);
                Some((prompt.clone(), prompt))
            }
        };

        if let Some((prompt, output)) = local {
            debug!("Action {} resolved locally ({:?})", action.id, action.mode);
            return Ok(PipelineContext {
                action: action.clone(),
                prompt,
                target: Target::Resolved(output),
                started,
            });
        }

        let connection = resolve_connection(action, &settings)?;

        for requirement in &action.capability_requirements {
            if !connection.supports(requirement.capability) {
                return Err(PipelineError::capability_mismatch(format!(
                    "Connection '{}' does not support required capability '{}'",
                    connection.connection_id, requirement.capability
                ))
                .with_connection(connection.connection_id.clone())
                .with_provider(connection.provider_id.clone()));
            }
        }

        let registration = self.registry.get(&connection.provider_id).ok_or_else(|| {
            PipelineError::missing_config(format!(
                "Provider '{}' is not available",
                connection.provider_id
            ))
            .with_connection(connection.connection_id.clone())
            .with_provider(connection.provider_id.clone())
        })?;

        let secret = match self.secrets.read(&connection.connection_id, API_KEY) {
            Ok(secret) => secret.filter(|s| !s.is_empty()),
            Err(e) => {
                warn!("Failed to read secret for {}: {}", connection.connection_id, e);
                None
            }
        };
        if secret.is_none() && registration.requires_auth {
            return Err(PipelineError::auth_missing("API key missing for this connection")
                .with_connection(connection.connection_id.clone())
                .with_provider(connection.provider_id.clone()));
        }

        let streamer = self
            .registry
            .create_streamer(&connection.provider_id)
            .map_err(|e| {
                PipelineError::capability_mismatch(e.to_string())
                    .with_connection(connection.connection_id.clone())
                    .with_provider(connection.provider_id.clone())
            })?;

        let config = ProviderConfig {
            model_id: connection.model_id.clone(),
            api_key: secret.unwrap_or_default(),
            endpoint_url: connection.endpoint_url.clone(),
            system_prompt: connection.system_prompt.clone(),
            temperature: DEFAULT_TEMPERATURE,
        };

        let prompt = gathered.substitute(prompt_template);
        if settings.diagnostics.debug_payload_logging {
            debug!("Prompt for {}: {}", action.id, redact::redact(&prompt));
        }

        info!(
            "Executing action {} via {} ({})",
            action.id, connection.provider_id, connection.model_id
        );

        Ok(PipelineContext {
            action: action.clone(),
            target: Target::Provider {
                streamer,
                config,
                messages: vec![Message::user(prompt.clone())],
                connection,
            },
            prompt,
            started,
        })
    }

    fn run_ocr(&self, settings: &Settings) -> PipelineResult<String> {
        let Some(image) = self.input.read_clipboard_image() else {
            return Err(PipelineError::missing_input(
                "OCR triggered but no image found in clipboard",
            ));
        };

        let provider_id = &settings.routing_defaults.ocr_provider_id;
        let engine = self.registry.create_ocr(provider_id).map_err(|e| {
            PipelineError::missing_config(e.to_string()).with_provider(provider_id.clone())
        })?;

        info!(
            "Running OCR with {} on {}x{} image",
            provider_id, image.width, image.height
        );
        Ok(engine.extract_text(&image))
    }
}

/// Picks the bound connection, else the routing default for the action's
/// primary capability
fn resolve_connection(action: &Action, settings: &Settings) -> PipelineResult<Connection> {
    let connection_id = action
        .connection_id
        .as_ref()
        .filter(|id| !id.is_empty())
        .or_else(|| settings.default_connection_for(action.primary_capability()))
        .ok_or_else(|| PipelineError::missing_config("No connection configured for this action"))?;

    settings.connection(connection_id).cloned().ok_or_else(|| {
        PipelineError::missing_config("Connection definition not found")
            .with_connection(connection_id.clone())
    })
}

fn apply_transform(config: &LocalTransformConfig, source: &str) -> PipelineResult<String> {
    let pattern = Regex::new(&config.pattern).map_err(|e| {
        PipelineError::missing_config(format!("Invalid transform pattern: {}", e))
    })?;

    let output = match config.kind {
        LocalTransformKind::Regex => pattern
            .replace_all(source, config.replacement.as_str())
            .into_owned(),
        LocalTransformKind::Sed => source
            .split('\n')
            .map(|line| pattern.replace(line, config.replacement.as_str()))
            .collect::<Vec<_>>()
            .join("\n"),
    };
    Ok(output)
}

enum StreamState {
    /// Provider request not sent yet
    Pending {
        streamer: Box<dyn TextStreamer>,
        messages: Vec<Message>,
        config: ProviderConfig,
    },
    Open(ChunkStream),
    Resolved(String),
    /// Last chunk handed out; completion is published on the next pull
    Closing,
    Finished,
}

/// Lazy, single-pass sequence of text chunks for one execution.
///
/// The provider request is sent on the first call to `next`. Once the
/// sequence returns `None` the `ExecutionCompleted` event has been
/// published; a stream dropped before that publishes nothing.
pub struct ExecutionStream {
    state: StreamState,
    action_id: ActionId,
    connection_id: ConnectionId,
    model_id: String,
    prompt: String,
    response: String,
    status: ExecutionStatus,
    started: Instant,
    bus: Arc<EventBus>,
}

impl ExecutionStream {
    fn new(context: PipelineContext, bus: Arc<EventBus>) -> Self {
        let PipelineContext {
            action,
            prompt,
            target,
            started,
        } = context;

        let (state, connection_id, model_id) = match target {
            Target::Provider {
                streamer,
                config,
                messages,
                connection,
            } => (
                StreamState::Pending {
                    streamer,
                    messages,
                    config,
                },
                connection.connection_id,
                connection.model_id,
            ),
            Target::Resolved(text) => (
                StreamState::Resolved(text),
                ConnectionId::new(""),
                String::new(),
            ),
        };

        Self {
            state,
            action_id: action.id,
            connection_id,
            model_id,
            prompt,
            response: String::new(),
            status: ExecutionStatus::Success,
            started,
            bus,
        }
    }

    pub fn action_id(&self) -> &ActionId {
        &self.action_id
    }

    /// Text received so far, without any error marker
    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    fn fail(&mut self, e: ProviderError) -> String {
        error!("Execution of {} failed: {}", self.action_id, e);
        self.status = ExecutionStatus::Error;
        self.state = StreamState::Closing;
        format!("\n[Error: {}]", e)
    }

    fn complete(&mut self) {
        self.state = StreamState::Finished;
        let completed = ExecutionCompleted {
            action_id: self.action_id.clone(),
            connection_id: self.connection_id.clone(),
            model_id: self.model_id.clone(),
            duration: self.started.elapsed(),
            input_preview: redact::preview(&self.prompt),
            output_preview: redact::preview(&self.response),
            status: self.status,
        };
        info!(
            "Action {} finished with {} in {:.2}s ({} chars)",
            self.action_id,
            self.status,
            completed.duration.as_secs_f64(),
            self.response.chars().count()
        );
        self.bus.publish(&DomainEvent::execution_completed(completed));
    }
}

impl Iterator for ExecutionStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            match mem::replace(&mut self.state, StreamState::Finished) {
                StreamState::Pending {
                    streamer,
                    messages,
                    config,
                } => match streamer.stream(messages, config) {
                    Ok(stream) => self.state = StreamState::Open(stream),
                    Err(e) => return Some(self.fail(e)),
                },
                StreamState::Open(mut stream) => match stream.next() {
                    Some(Ok(chunk)) if chunk.done => {
                        self.complete();
                        return None;
                    }
                    Some(Ok(chunk)) => {
                        self.state = StreamState::Open(stream);
                        if !chunk.content.is_empty() {
                            self.response.push_str(&chunk.content);
                            return Some(chunk.content);
                        }
                    }
                    Some(Err(e)) => return Some(self.fail(e)),
                    None => {
                        self.complete();
                        return None;
                    }
                },
                StreamState::Resolved(text) => {
                    self.response.push_str(&text);
                    self.state = StreamState::Closing;
                    return Some(text);
                }
                StreamState::Closing => {
                    self.complete();
                    return None;
                }
                StreamState::Finished => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::input::StaticCapture;
    use crate::service::secrets::InMemorySecretStore;
    use pastesuite_core::ErrorCategory;
    use pastesuite_core::domain::action::ActionKind;
    use pastesuite_core::domain::capability::CapabilityRequirement;
    use pastesuite_core::domain::event::EventKind;
    use pastesuite_core::domain::input::ClipboardImage;
    use pastesuite_providers::{OcrEngine, ProviderClass, ProviderRegistration, StreamChunk};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    /// Streams the user message back word by word
    struct EchoStreamer {
        calls: Arc<AtomicUsize>,
        seen: Arc<Mutex<Vec<ProviderConfig>>>,
    }

    impl TextStreamer for EchoStreamer {
        fn stream(
            &self,
            messages: Vec<Message>,
            config: ProviderConfig,
        ) -> Result<ChunkStream, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(config);
            let text = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            let words: Vec<String> = text.split_inclusive(' ').map(str::to_string).collect();
            let chunks = words
                .into_iter()
                .map(StreamChunk::text)
                .chain(std::iter::once(StreamChunk::done()))
                .map(|chunk| {
                    thread::sleep(Duration::from_millis(1));
                    Ok::<_, ProviderError>(chunk)
                });
            Ok(Box::new(chunks))
        }
    }

    /// One chunk, then a stream error
    struct FailingStreamer;

    impl TextStreamer for FailingStreamer {
        fn stream(&self, _: Vec<Message>, _: ProviderConfig) -> Result<ChunkStream, ProviderError> {
            let chunks = vec![
                Ok(StreamChunk::text("partial")),
                Err(ProviderError::Stream {
                    provider: "failing",
                    message: "overloaded".to_string(),
                }),
                Ok(StreamChunk::text("never")),
            ];
            Ok(Box::new(chunks.into_iter()))
        }
    }

    struct RejectingStreamer;

    impl TextStreamer for RejectingStreamer {
        fn stream(&self, _: Vec<Message>, _: ProviderConfig) -> Result<ChunkStream, ProviderError> {
            Err(ProviderError::Api {
                provider: "rejecting",
                status: 401,
                message: "bad key".to_string(),
            })
        }
    }

    struct FixedOcr;

    impl OcrEngine for FixedOcr {
        fn extract_text(&self, _: &ClipboardImage) -> String {
            "scanned text".to_string()
        }
    }

    struct Harness {
        pipeline: ExecutionPipeline,
        events: Arc<Mutex<Vec<ExecutionCompleted>>>,
        calls: Arc<AtomicUsize>,
        seen: Arc<Mutex<Vec<ProviderConfig>>>,
    }

    fn connection(id: &str, provider: &str, capabilities: Vec<Capability>) -> Connection {
        Connection::new(provider, format!("{}-model", provider), capabilities).with_id(id)
    }

    fn harness(input: StaticCapture, secrets: InMemorySecretStore) -> Harness {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut registry = CapabilityRegistry::new();
        let (c, s) = (calls.clone(), seen.clone());
        registry.register(ProviderRegistration::text(
            "echo",
            "Echo",
            ProviderClass::Local,
            false,
            move || {
                Box::new(EchoStreamer {
                    calls: c.clone(),
                    seen: s.clone(),
                })
            },
        ));
        let (c, s) = (calls.clone(), seen.clone());
        registry.register(ProviderRegistration::text(
            "cloud",
            "Cloud",
            ProviderClass::Cloud,
            true,
            move || {
                Box::new(EchoStreamer {
                    calls: c.clone(),
                    seen: s.clone(),
                })
            },
        ));
        registry.register(ProviderRegistration::text(
            "failing",
            "Failing",
            ProviderClass::Local,
            false,
            || Box::new(FailingStreamer),
        ));
        registry.register(ProviderRegistration::text(
            "rejecting",
            "Rejecting",
            ProviderClass::Local,
            false,
            || Box::new(RejectingStreamer),
        ));
        registry.register(ProviderRegistration::ocr(
            "tesseract",
            "Fixed OCR",
            ProviderClass::Local,
            false,
            || Box::new(FixedOcr),
        ));

        let mut settings = Settings::default();
        settings.connections = vec![
            connection("local", "echo", vec![Capability::Llm, Capability::Ocr]),
            connection("cloud", "cloud", vec![Capability::Llm]),
            connection("failing", "failing", vec![Capability::Llm]),
            connection("rejecting", "rejecting", vec![Capability::Llm]),
            connection("ghost", "unregistered", vec![Capability::Llm]),
        ];
        settings.routing_defaults.default_llm_connection_id = Some(ConnectionId::new("local"));

        let bus = Arc::new(EventBus::new());
        let events = Arc::new(Mutex::new(Vec::new()));
        let e = events.clone();
        bus.subscribe(EventKind::ExecutionCompleted, move |event| {
            if let Some(completed) = event.as_execution_completed() {
                e.lock().unwrap().push(completed.clone());
            }
            Ok(())
        });

        let secrets: Arc<dyn SecretStore> = Arc::new(secrets);
        let store = Arc::new(SettingsStore::with_settings(
            "settings.json",
            settings,
            bus.clone(),
            secrets.clone(),
        ));
        let pipeline =
            ExecutionPipeline::new(store, Arc::new(registry), secrets, Arc::new(input), bus);

        Harness {
            pipeline,
            events,
            calls,
            seen,
        }
    }

    fn selection(text: &str) -> Harness {
        harness(StaticCapture::new().with_selection(text), InMemorySecretStore::new())
    }

    fn ai_action(id: &str, connection: Option<&str>) -> Action {
        let mut action = Action::new(id, ActionKind::UserDefined, ActionMode::AiTransform);
        action.enabled = true;
        action.connection_id = connection.map(ConnectionId::new);
        action
    }

    fn local_action(kind: LocalTransformKind, pattern: &str, replacement: &str) -> Action {
        let mut action = Action::new("local", ActionKind::UserDefined, ActionMode::LocalTransform);
        action.local_transform_config = Some(LocalTransformConfig {
            kind,
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
        });
        action
    }

    fn category(result: PipelineResult<ExecutionStream>) -> ErrorCategory {
        match result {
            Ok(_) => panic!("expected a validation error"),
            Err(e) => e.category,
        }
    }

    #[test]
    fn test_identity_regex_yields_selection() {
        let h = selection("Hello");
        let action = local_action(LocalTransformKind::Regex, ".*", "$0");

        let chunks: Vec<String> = h.pipeline.execute(&action).unwrap().collect();
        assert_eq!(chunks, vec!["Hello"]);

        let events = h.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].connection_id.is_empty());
        assert_eq!(events[0].output_preview, "Hello");
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_local_transform_falls_back_to_clipboard() {
        let h = harness(StaticCapture::new().with_clipboard("a-b-c"), InMemorySecretStore::new());
        let action = local_action(LocalTransformKind::Regex, "-", " ");
        let chunks: Vec<String> = h.pipeline.execute(&action).unwrap().collect();
        assert_eq!(chunks, vec!["a b c"]);
    }

    #[test]
    fn test_sed_replaces_first_match_per_line() {
        let h = selection("a a\nb a");
        let action = local_action(LocalTransformKind::Sed, "a", "x");
        let chunks: Vec<String> = h.pipeline.execute(&action).unwrap().collect();
        assert_eq!(chunks, vec!["x a\nb x"]);
    }

    #[test]
    fn test_invalid_pattern_is_missing_config() {
        let h = selection("Hello");
        let action = local_action(LocalTransformKind::Regex, "(", "");
        assert_eq!(category(h.pipeline.execute(&action)), ErrorCategory::MissingConfig);
        assert!(h.events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_static_and_prefill_modes() {
        let h = selection("World");

        let mut static_paste = Action::new("sig", ActionKind::UserDefined, ActionMode::StaticTextPaste);
        static_paste.static_text_template = Some("Hi {selected_text}, {unknown}".to_string());
        let chunks: Vec<String> = h.pipeline.execute(&static_paste).unwrap().collect();
        assert_eq!(chunks, vec!["Hi World, {unknown}"]);

        let mut prefill = Action::new("pre", ActionKind::UserDefined, ActionMode::PromptPrefillOnly);
        prefill.prompt_template = Some("Translate: {selected_text}".to_string());
        let chunks: Vec<String> = h.pipeline.execute(&prefill).unwrap().collect();
        assert_eq!(chunks, vec!["Translate: World"]);

        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.events.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_substituted_values_are_not_expanded_again() {
        let gathered = Gathered {
            selected_text: "see {clipboard} and {ocr_text}".to_string(),
            clipboard: "secret".to_string(),
            ocr_text: Some("scan".to_string()),
        };
        assert_eq!(
            gathered.substitute("{selected_text} | {clipboard} | {ocr_text} | {other}"),
            "see {clipboard} and {ocr_text} | secret | scan | {other}"
        );

        let without_ocr = Gathered::default();
        assert_eq!(without_ocr.substitute("[{ocr_text}]"), "[{ocr_text}]");
    }

    #[test]
    fn test_ocr_without_image_is_missing_input() {
        let h = selection("ignored");
        let mut action = ai_action("ocr_paste", Some("local"));
        action
            .capability_requirements
            .push(CapabilityRequirement::new(Capability::Ocr));

        assert_eq!(category(h.pipeline.execute(&action)), ErrorCategory::MissingInput);
        assert!(h.events.lock().unwrap().is_empty());
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_ocr_text_replaces_selection() {
        let image = ClipboardImage::new(1, 1, vec![0, 0, 0, 255]);
        let h = harness(
            StaticCapture::new().with_selection("old").with_image(image.clone()),
            InMemorySecretStore::new(),
        );
        let mut action = ai_action("ocr_paste", Some("local"));
        action
            .capability_requirements
            .push(CapabilityRequirement::new(Capability::Ocr));

        let output: String = h.pipeline.execute(&action).unwrap().collect();
        assert_eq!(output, "scanned text");

        // an explicit slot keeps the selection intact
        let h = harness(
            StaticCapture::new().with_selection("old").with_image(image),
            InMemorySecretStore::new(),
        );
        action.prompt_template = Some("{selected_text} / {ocr_text}".to_string());
        let output: String = h.pipeline.execute(&action).unwrap().collect();
        assert_eq!(output, "old / scanned text");
    }

    #[test]
    fn test_unresolved_connection_is_missing_config() {
        let h = selection("Hello");

        let err = h.pipeline.validate(&ai_action("a", Some("nope"))).err().unwrap();
        assert_eq!(err.category, ErrorCategory::MissingConfig);
        assert_eq!(err.connection_id, Some(ConnectionId::new("nope")));

        // stt has no routing default
        let mut action = ai_action("b", None);
        action
            .capability_requirements
            .push(CapabilityRequirement::new(Capability::Stt));
        assert_eq!(category(h.pipeline.execute(&action)), ErrorCategory::MissingConfig);

        let err = h.pipeline.validate(&ai_action("c", Some("ghost"))).err().unwrap();
        assert_eq!(err.category, ErrorCategory::MissingConfig);
        assert_eq!(err.provider_id.unwrap().as_str(), "unregistered");
    }

    #[test]
    fn test_missing_capability_names_connection() {
        let mut action = ai_action("ocr", Some("cloud"));
        action
            .capability_requirements
            .push(CapabilityRequirement::new(Capability::Ocr));
        let h = harness(
            StaticCapture::new().with_image(ClipboardImage::new(1, 1, vec![1, 2, 3, 4])),
            InMemorySecretStore::new(),
        );

        let err = h.pipeline.validate(&action).err().unwrap();
        assert_eq!(err.category, ErrorCategory::CapabilityMismatch);
        assert_eq!(err.connection_id, Some(ConnectionId::new("cloud")));
        assert_eq!(err.provider_id.unwrap().as_str(), "cloud");
        assert!(err.message.contains("cloud"));
        assert!(h.events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_auth_required_without_secret() {
        let h = selection("Hello");
        let err = h.pipeline.validate(&ai_action("a", Some("cloud"))).err().unwrap();
        assert_eq!(err.category, ErrorCategory::AuthMissing);
        assert_eq!(err.connection_id, Some(ConnectionId::new("cloud")));

        let secrets = InMemorySecretStore::new().with_api_key(&ConnectionId::new("cloud"), "sk-live");
        let h = harness(StaticCapture::new().with_selection("Hello"), secrets);
        let output: String = h.pipeline.execute(&ai_action("a", Some("cloud"))).unwrap().collect();
        assert_eq!(output, "Hello");
        assert_eq!(h.seen.lock().unwrap()[0].api_key, "sk-live");
    }

    #[test]
    fn test_local_provider_gets_empty_secret_and_defaults() {
        let h = selection("Hello there");
        let output: String = h.pipeline.execute(&ai_action("a", None)).unwrap().collect();
        assert_eq!(output, "Hello there");

        let seen = h.seen.lock().unwrap();
        assert_eq!(seen[0].api_key, "");
        assert_eq!(seen[0].model_id, "echo-model");
        assert_eq!(seen[0].temperature, DEFAULT_TEMPERATURE);

        let events = h.events.lock().unwrap();
        assert_eq!(events[0].connection_id.as_str(), "local");
        assert_eq!(events[0].model_id, "echo-model");
        assert_eq!(events[0].status, ExecutionStatus::Success);
    }

    #[test]
    fn test_stream_is_lazy_and_fresh_per_execute() {
        let h = selection("Hello");
        let action = ai_action("a", Some("local"));

        let stream = h.pipeline.execute(&action).unwrap();
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
        drop(stream);
        // abandoned before the first pull
        assert!(h.events.lock().unwrap().is_empty());

        let _: Vec<String> = h.pipeline.execute(&action).unwrap().collect();
        let _: Vec<String> = h.pipeline.execute(&action).unwrap().collect();
        assert_eq!(h.calls.load(Ordering::SeqCst), 2);
        assert_eq!(h.events.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_mid_stream_error_becomes_marker_chunk() {
        let h = selection("Hello");
        let mut stream = h.pipeline.execute(&ai_action("a", Some("failing"))).unwrap();

        assert_eq!(stream.next().as_deref(), Some("partial"));
        let marker = stream.next().unwrap();
        assert!(marker.starts_with("\n[Error: "));
        assert!(marker.contains("overloaded"));
        assert_eq!(stream.next(), None);
        assert_eq!(stream.next(), None);
        assert_eq!(stream.status(), ExecutionStatus::Error);
        assert_eq!(stream.response(), "partial");

        let events = h.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, ExecutionStatus::Error);
        assert_eq!(events[0].output_preview, "partial");
    }

    #[test]
    fn test_open_error_becomes_marker_chunk() {
        let h = selection("Hello");
        let chunks: Vec<String> = h
            .pipeline
            .execute(&ai_action("a", Some("rejecting")))
            .unwrap()
            .collect();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("bad key"));
        assert_eq!(h.events.lock().unwrap()[0].status, ExecutionStatus::Error);
    }

    #[test]
    fn test_previews_are_redacted() {
        let h = selection("my api_key: sk-aaaaaaaaaaaaaaaaaaaaaaaaaaa");
        let _: Vec<String> = h.pipeline.execute(&ai_action("a", Some("local"))).unwrap().collect();

        let events = h.events.lock().unwrap();
        assert_eq!(events[0].input_preview, "my [REDACTED]");
        assert!(!events[0].input_preview.contains("sk-"));
        assert!(!events[0].output_preview.contains("aaaa"));

        // the provider still sees the original text
        let seen = h.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_concurrent_executions_stay_separate() {
        let capture = StaticCapture::new().with_selection("shared input text");
        let h = Arc::new(harness(capture, InMemorySecretStore::new()));

        let mut first = ai_action("first", Some("local"));
        first.prompt_template = Some("one {selected_text} one".to_string());
        let mut second = ai_action("second", Some("local"));
        second.prompt_template = Some("two {selected_text} two".to_string());

        let workers: Vec<_> = [first, second]
            .into_iter()
            .map(|action| {
                let h = h.clone();
                thread::spawn(move || h.pipeline.execute(&action).unwrap().collect::<String>())
            })
            .collect();
        let outputs: Vec<String> = workers.into_iter().map(|w| w.join().unwrap()).collect();
        assert_eq!(outputs[0], "one shared input text one");
        assert_eq!(outputs[1], "two shared input text two");

        let events = h.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        for event in events.iter() {
            let tag = if event.action_id.as_str() == "first" { "one" } else { "two" };
            let expected = format!("{tag} shared input text {tag}");
            assert_eq!(event.input_preview, expected);
            assert_eq!(event.output_preview, expected);
        }
    }
}
