/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level command modules:

- `chat`: Interactive chat session
- `ask`: Send a single question and print the answer
- `models`: List the provider's models

The handlers are thin: conversation state and request handling live in
[`crate::chat`], the backend in [`crate::providers`].
*/

use crate::chat::{ModelSelection, RequestController, RequestOptions, SharedStore};
use crate::chat::{ConversationId, ConversationStore};
use crate::config::Config;
use crate::error::Result;
use crate::providers::{self, CompletionService};
use std::sync::Arc;

// Special commands parser for the interactive session
pub mod special_commands;

// Model management commands
pub mod models;

/// Build a request controller over a fresh store
///
/// The store uses the configured title length; `temporary` starts the
/// session with a temporary conversation.
fn build_controller(
    config: &Config,
    service: Arc<dyn CompletionService>,
    temporary: bool,
) -> RequestController {
    let mut store = ConversationStore::with_title_max_chars(config.chat.title_max_chars);
    if temporary {
        store.set_temporary_mode(true);
    }

    RequestController::new(
        SharedStore::new(store),
        service,
        ModelSelection::new(config.provider.gemini.model.clone()),
        RequestOptions::from_config(&config.chat),
    )
}

/// Text of the last message in a conversation, if it still exists
fn last_message(controller: &RequestController, id: ConversationId) -> Option<String> {
    controller
        .store()
        .read()
        .get(id)
        .and_then(|c| c.messages().last())
        .map(|m| m.content().to_string())
}

// Chat command handler
pub mod chat {
    //! Interactive chat session handler.
    //!
    //! Creates the completion service and the request controller, then runs
    //! a readline-based loop. Plain input is sent to the model; input
    //! starting with `/` is a special command.

    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use crate::chat::{relative_label, Conversation, Role, SubmitOutcome};
    use crate::error::ChatError;
    use chrono::{DateTime, Local};
    use colored::Colorize;
    use prettytable::{cell, row, Table};
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// What the loop should do after handling a line
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Flow {
        Continue,
        Exit,
    }

    /// One interactive session: a controller plus the provider it talks to
    pub struct ChatSession {
        controller: RequestController,
        provider_type: String,
    }

    impl ChatSession {
        /// Create a session over `service`
        pub fn new(config: &Config, service: Arc<dyn CompletionService>, temporary: bool) -> Self {
            Self {
                controller: build_controller(config, service, temporary),
                provider_type: config.provider.provider_type.clone(),
            }
        }

        pub fn controller(&self) -> &RequestController {
            &self.controller
        }

        /// Handle one line of input
        ///
        /// Command errors are printed and do not end the session.
        pub async fn handle_line(&self, line: &str) -> Flow {
            match parse_special_command(line) {
                Ok(SpecialCommand::None) => {
                    self.send(line).await;
                    Flow::Continue
                }
                Ok(command) => match self.handle_command(command).await {
                    Ok(flow) => flow,
                    Err(e) => {
                        eprintln!("{}", format!("Error: {}", e).red());
                        Flow::Continue
                    }
                },
                Err(e) => {
                    eprintln!("{}", e.to_string().red());
                    Flow::Continue
                }
            }
        }

        /// Execute a special command
        ///
        /// # Errors
        ///
        /// Returns error if the command cannot be carried out, e.g. an edit
        /// that is not allowed or a model listing that failed
        pub async fn handle_command(&self, command: SpecialCommand) -> Result<Flow> {
            match command {
                SpecialCommand::NewChat => {
                    self.controller.store().write().create_conversation(false);
                    println!("Started a new conversation\n");
                }
                SpecialCommand::Temporary(enabled) => {
                    let enabled = enabled.unwrap_or(!self.is_temporary());
                    self.controller
                        .store()
                        .write()
                        .set_temporary_mode(enabled);
                    if enabled {
                        println!("{}\n", "Temporary mode on".yellow());
                    } else {
                        println!("Temporary mode off, temporary conversations discarded\n");
                    }
                }
                SpecialCommand::ListConversations => {
                    let store = self.controller.store().read();
                    if store.is_empty() {
                        println!("No conversations yet\n");
                    } else {
                        conversation_table(
                            store.conversations(),
                            store.current_id(),
                            Local::now(),
                        )
                        .printstd();
                        println!();
                    }
                }
                SpecialCommand::Select(position) => {
                    let id = self.conversation_at(position)?;
                    self.controller.store().write().select_conversation(id);
                    self.print_transcript();
                }
                SpecialCommand::Delete(position) => {
                    let id = self.conversation_at(position)?;
                    self.controller.store().write().delete_conversation(id);
                    println!("Deleted conversation {}\n", position);
                }
                SpecialCommand::Edit(None) => match self.editable_message() {
                    Some(text) => {
                        println!("Latest message: {}", text);
                        println!("Use '/edit <text>' to replace it and resend\n");
                    }
                    None => println!("Nothing to edit\n"),
                },
                SpecialCommand::Edit(Some(text)) => {
                    let index = self.controller.editable_index().ok_or_else(|| {
                        ChatError::EditNotAllowed {
                            index: self.message_count(),
                            reason: "there is no user message to edit".to_string(),
                        }
                    })?;
                    self.controller.begin_edit(index)?;
                    let outcome = self.controller.save_edit(text).await;
                    self.print_outcome(&outcome);
                }
                SpecialCommand::ShowModel => {
                    println!("Model: {}\n", self.controller.model().get().cyan());
                }
                SpecialCommand::SwitchModel(model) => {
                    self.controller.model().set(model.clone());
                    println!("Switched to model {}\n", model.cyan());
                }
                SpecialCommand::ListModels => {
                    models::print_models(
                        self.controller.service().as_ref(),
                        &self.provider_type,
                        false,
                    )
                    .await?;
                }
                SpecialCommand::ShowTranscript => self.print_transcript(),
                SpecialCommand::ShowStatus => self.print_status(),
                SpecialCommand::Help => print_help(),
                SpecialCommand::Exit => return Ok(Flow::Exit),
                SpecialCommand::None => {}
            }
            Ok(Flow::Continue)
        }

        /// Send a message to the model and print the reply
        pub async fn send(&self, text: &str) -> SubmitOutcome {
            let outcome = self.controller.send(text).await;
            self.print_outcome(&outcome);
            outcome
        }

        /// True if the current conversation is temporary
        pub fn is_temporary(&self) -> bool {
            self.controller
                .store()
                .read()
                .current()
                .is_some_and(Conversation::is_temporary)
        }

        /// Prompt string for the readline loop
        pub fn prompt(&self) -> String {
            if self.is_temporary() {
                format!("{} >> ", "[TEMP]".yellow())
            } else {
                ">> ".to_string()
            }
        }

        /// Id of the conversation at 1-based `position` in the listing
        fn conversation_at(&self, position: usize) -> Result<ConversationId> {
            let store = self.controller.store().read();
            store
                .conversations()
                .get(position.saturating_sub(1))
                .map(Conversation::id)
                .ok_or_else(|| {
                    ChatError::Config(format!(
                        "No conversation at position {} ({} available)",
                        position,
                        store.len()
                    ))
                    .into()
                })
        }

        fn editable_message(&self) -> Option<String> {
            let store = self.controller.store().read();
            let conversation = store.current()?;
            let index = conversation.editable_index()?;
            Some(conversation.messages()[index].content().to_string())
        }

        fn message_count(&self) -> usize {
            self.controller
                .store()
                .read()
                .current()
                .map_or(0, |conversation| conversation.messages().len())
        }

        fn print_outcome(&self, outcome: &SubmitOutcome) {
            match outcome {
                SubmitOutcome::Replied { reply, .. } => println!("\n{}\n", reply),
                SubmitOutcome::Fallback {
                    conversation_id, ..
                } => {
                    if let Some(text) = last_message(&self.controller, *conversation_id) {
                        println!("\n{}\n", text.yellow());
                    }
                }
                SubmitOutcome::Dropped { .. } => {
                    println!("{}\n", "Conversation was deleted, reply discarded".dimmed());
                }
                SubmitOutcome::Ignored(reason) => {
                    tracing::debug!("Submission ignored: {:?}", reason);
                }
            }
        }

        fn print_transcript(&self) {
            let store = self.controller.store().read();
            match store.current() {
                Some(conversation) => {
                    println!("\n{}\n", conversation.title().bold());
                    println!("{}", format_transcript(conversation));
                }
                None => println!("No conversation selected\n"),
            }
        }

        /// Display detailed status information about the current session
        fn print_status(&self) {
            let store = self.controller.store().read();
            let (title, message_count) = store
                .current()
                .map(|c| (c.title().to_string(), c.len()))
                .unwrap_or_else(|| ("(none)".to_string(), 0));

            println!("\n╔══════════════════════════════════════════════════════════════╗");
            println!("║                    chatshell Session Status                  ║");
            println!("╚══════════════════════════════════════════════════════════════╝\n");
            println!("Provider:          {}", self.provider_type);
            println!("Model:             {}", self.controller.model().get().cyan());
            println!("Conversations:     {}", store.len());
            println!("Current:           {}", title);
            println!("Conversation Size: {} messages", message_count);
            println!(
                "Temporary:         {}",
                if store.current().is_some_and(Conversation::is_temporary) {
                    "yes".yellow()
                } else {
                    "no".normal()
                }
            );
            println!();
        }
    }

    /// Start an interactive chat session
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `temporary` - Start with a temporary conversation
    ///
    /// # Errors
    ///
    /// Returns error if the provider cannot be created or the terminal
    /// cannot be initialized
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use chatshell::commands::chat;
    /// use chatshell::config::Config;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// chat::run_chat(Config::default(), false).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run_chat(config: Config, temporary: bool) -> Result<()> {
        tracing::info!("Starting interactive chat session");

        let service: Arc<dyn CompletionService> =
            Arc::from(providers::create_service(&config.provider)?);
        let session = ChatSession::new(&config, service, temporary);

        let mut rl = DefaultEditor::new()?;

        print_welcome_banner(&session.controller().model().get(), temporary);

        loop {
            match rl.readline(&session.prompt()) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(trimmed)?;

                    if session.handle_line(&line).await == Flow::Exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Display welcome banner at the start of the session
    fn print_welcome_banner(model: &str, temporary: bool) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║              chatshell Interactive Chat - Welcome!           ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Model: {}", model.cyan());
        if temporary {
            println!("{}", "Temporary mode: conversations are discarded by /temp off".yellow());
        }
        println!("\nType '/help' for available commands, 'exit' to quit\n");
    }

    /// Render a conversation's messages, one block per message
    pub fn format_transcript(conversation: &Conversation) -> String {
        if conversation.is_empty() {
            return "(no messages)\n".to_string();
        }

        conversation
            .messages()
            .iter()
            .map(|message| {
                let speaker = match message.role() {
                    Role::User => "You".green().bold(),
                    Role::Assistant => "Model".blue().bold(),
                };
                format!("{}: {}\n", speaker, message.content())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Build the conversation listing, newest first
    ///
    /// Creation times are shown relative to `now` in local time.
    pub fn conversation_table(
        conversations: &[Conversation],
        current: Option<ConversationId>,
        now: DateTime<Local>,
    ) -> Table {
        let mut table = Table::new();
        table.add_row(row!["#", "Title", "Created", "Messages", ""]);

        for (position, conversation) in conversations.iter().enumerate() {
            let created = conversation.created_at().with_timezone(&Local);
            let mut marker = String::new();
            if current == Some(conversation.id()) {
                marker.push('*');
            }
            if conversation.is_temporary() {
                marker.push_str(" temp");
            }

            table.add_row(row![
                position + 1,
                conversation.title(),
                relative_label(&created, &now),
                conversation.len(),
                marker.trim()
            ]);
        }

        table
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::chat::Message;
        use crate::error::ChatError;
        use crate::providers::MockCompletionService;

        fn echo_service() -> MockCompletionService {
            let mut mock = MockCompletionService::new();
            mock.expect_single_turn_complete()
                .returning(|prompt, _| Ok(format!("re:{}", prompt)));
            mock.expect_chat_complete().returning(|history, _| {
                Ok(format!(
                    "re:{}",
                    history.last().map(|t| t.text.clone()).unwrap_or_default()
                ))
            });
            mock
        }

        fn session_with(service: MockCompletionService, temporary: bool) -> ChatSession {
            ChatSession::new(&Config::default(), Arc::new(service), temporary)
        }

        fn current_contents(session: &ChatSession) -> Vec<String> {
            session
                .controller()
                .store()
                .read()
                .current()
                .map(|c| c.messages().iter().map(|m| m.content().to_string()).collect())
                .unwrap_or_default()
        }

        #[tokio::test]
        async fn test_run_chat_unknown_provider() {
            let mut cfg = Config::default();
            cfg.provider.provider_type = "invalid_provider".to_string();

            let res = run_chat(cfg, false).await;
            assert!(res.is_err());
        }

        #[tokio::test]
        async fn test_plain_line_is_sent() {
            let session = session_with(echo_service(), false);
            assert_eq!(session.handle_line("hello").await, Flow::Continue);
            assert_eq!(current_contents(&session), vec!["hello", "re:hello"]);
        }

        #[tokio::test]
        async fn test_exit_command() {
            let session = session_with(MockCompletionService::new(), false);
            assert_eq!(session.handle_line("exit").await, Flow::Exit);
            assert_eq!(session.handle_line("/quit").await, Flow::Exit);
        }

        #[tokio::test]
        async fn test_unknown_command_keeps_session() {
            let session = session_with(MockCompletionService::new(), false);
            assert_eq!(session.handle_line("/bogus").await, Flow::Continue);
            assert!(session.controller().store().read().is_empty());
        }

        #[tokio::test]
        async fn test_new_chat_creates_conversation() {
            let session = session_with(MockCompletionService::new(), false);
            session.handle_command(SpecialCommand::NewChat).await.unwrap();
            session.handle_command(SpecialCommand::NewChat).await.unwrap();
            assert_eq!(session.controller().store().read().len(), 2);
        }

        #[tokio::test]
        async fn test_temporary_toggle() {
            let session = session_with(echo_service(), false);
            session.send("keep me").await;
            assert!(!session.is_temporary());

            session
                .handle_command(SpecialCommand::Temporary(None))
                .await
                .unwrap();
            assert!(session.is_temporary());
            assert!(session.prompt().contains("[TEMP]"));
            session.send("forget me").await;

            session
                .handle_command(SpecialCommand::Temporary(None))
                .await
                .unwrap();
            assert!(!session.is_temporary());

            let store = session.controller().store().read();
            assert_eq!(store.len(), 2);
            assert!(store.conversations().iter().all(|c| !c.is_temporary()));
        }

        #[tokio::test]
        async fn test_session_starts_temporary() {
            let session = session_with(MockCompletionService::new(), true);
            assert!(session.is_temporary());
        }

        #[tokio::test]
        async fn test_select_and_delete_by_position() {
            let session = session_with(echo_service(), false);
            session.send("first").await;
            session.handle_command(SpecialCommand::NewChat).await.unwrap();
            session.send("second").await;

            // Listing is newest first, so position 2 is "first"
            session
                .handle_command(SpecialCommand::Select(2))
                .await
                .unwrap();
            assert_eq!(current_contents(&session), vec!["first", "re:first"]);

            session
                .handle_command(SpecialCommand::Delete(2))
                .await
                .unwrap();
            let store = session.controller().store().read();
            assert_eq!(store.len(), 1);
            assert!(store.current().is_none());
        }

        #[tokio::test]
        async fn test_select_out_of_range_errors() {
            let session = session_with(MockCompletionService::new(), false);
            let err = session
                .handle_command(SpecialCommand::Select(3))
                .await
                .unwrap_err();
            assert!(err.to_string().contains("No conversation at position 3"));
        }

        #[tokio::test]
        async fn test_edit_truncates_and_resends() {
            let session = session_with(echo_service(), false);
            session.send("u1").await;
            session.send("u2").await;
            assert_eq!(current_contents(&session), vec!["u1", "re:u1", "u2", "re:u2"]);

            session
                .handle_command(SpecialCommand::Edit(Some("u2 edited".to_string())))
                .await
                .unwrap();
            assert_eq!(
                current_contents(&session),
                vec!["u1", "re:u1", "u2 edited", "re:u2 edited"]
            );
        }

        #[tokio::test]
        async fn test_edit_without_messages_errors() {
            let session = session_with(MockCompletionService::new(), false);
            let err = session
                .handle_command(SpecialCommand::Edit(Some("x".to_string())))
                .await
                .unwrap_err();
            assert!(matches!(
                err.downcast_ref::<ChatError>(),
                Some(ChatError::EditNotAllowed { index: 0, .. })
            ));
            assert!(err.to_string().contains("no user message to edit"));
        }

        #[tokio::test]
        async fn test_switch_model() {
            let session = session_with(MockCompletionService::new(), false);
            session
                .handle_command(SpecialCommand::SwitchModel("gemini-2.5-pro".to_string()))
                .await
                .unwrap();
            assert_eq!(session.controller().model().get(), "gemini-2.5-pro");
        }

        #[tokio::test]
        async fn test_list_models_error_propagates() {
            let mut mock = MockCompletionService::new();
            mock.expect_list_models()
                .returning(|| Err(ChatError::Provider("offline".to_string()).into()));
            let session = session_with(mock, false);

            let result = session.handle_command(SpecialCommand::ListModels).await;
            assert!(result.is_err());
            assert_eq!(
                session.handle_line("/models").await,
                Flow::Continue
            );
        }

        #[tokio::test]
        async fn test_failed_request_prints_fallback() {
            let mut mock = MockCompletionService::new();
            mock.expect_single_turn_complete()
                .returning(|_, _| Err(ChatError::CompletionFailure("boom".to_string()).into()));
            let session = session_with(mock, false);

            let outcome = session.send("hi").await;
            assert!(matches!(outcome, SubmitOutcome::Fallback { .. }));
            assert_eq!(
                current_contents(&session),
                vec!["hi".to_string(), Config::default().chat.fallback_reply]
            );
        }

        #[test]
        fn test_format_transcript() {
            let conversation = Conversation::with_messages(
                false,
                vec![Message::user("ping"), Message::assistant("pong")],
            );
            let text = format_transcript(&conversation);
            assert!(text.contains("ping"));
            assert!(text.contains("pong"));
            assert!(text.contains("You"));
            assert!(text.contains("Model"));
        }

        #[test]
        fn test_format_transcript_empty() {
            let conversation = Conversation::new(false);
            assert_eq!(format_transcript(&conversation), "(no messages)\n");
        }

        #[test]
        fn test_conversation_table_marks_current_and_temporary() {
            let regular = Conversation::with_messages(false, vec![Message::user("Rust traits")]);
            let temporary = Conversation::new(true);
            let current = temporary.id();

            let table = conversation_table(&[temporary, regular], Some(current), Local::now());
            assert_eq!(table.len(), 3);

            let rendered = table.to_string();
            assert!(rendered.contains("* temp"));
            assert!(rendered.contains("Rust traits"));
            assert!(rendered.contains("Temporary chat"));
        }
    }
}

// Ask command handler
pub mod ask {
    //! One-shot question handler.
    //!
    //! Sends a single prompt through the same request path as the chat
    //! session, so cleaning and the fallback reply apply here too.

    use super::*;
    use crate::chat::SubmitOutcome;
    use crate::error::ChatError;

    /// Ask a single question and print the answer
    ///
    /// # Errors
    ///
    /// Returns error if the prompt is empty or the provider cannot be created
    pub async fn run_ask(config: Config, prompt: String) -> Result<()> {
        tracing::info!("Sending one-shot prompt");

        let service: Arc<dyn CompletionService> =
            Arc::from(providers::create_service(&config.provider)?);
        let answer = ask_with_service(&config, service, &prompt).await?;
        println!("{}", answer);
        Ok(())
    }

    /// Send `prompt` through `service` and return the answer text
    ///
    /// A failed request yields the configured fallback reply.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Config` if the prompt is empty
    pub async fn ask_with_service(
        config: &Config,
        service: Arc<dyn CompletionService>,
        prompt: &str,
    ) -> Result<String> {
        let controller = build_controller(config, service, true);

        match controller.send(prompt).await {
            SubmitOutcome::Replied { reply, .. } => Ok(reply),
            outcome @ (SubmitOutcome::Fallback { .. } | SubmitOutcome::Dropped { .. }) => {
                Ok(outcome
                    .conversation_id()
                    .and_then(|id| last_message(&controller, id))
                    .unwrap_or_else(|| config.chat.fallback_reply.clone()))
            }
            SubmitOutcome::Ignored(_) => {
                Err(ChatError::Config("Prompt must not be empty".to_string()).into())
            }
        }
    }

}
