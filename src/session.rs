//! Conversation Session
//!
//! The state machine that drives a whole conversation: build the schema
//! prompt, then loop {generate, extract, execute, summarize, ask the
//! human} until a quit token or a fatal error. The session is the sole
//! owner of the message history and only ever appends to it.
//!
//! Control returns to the human at the end of every turn. There is no
//! iteration bound and no mid-call cancellation.

use tracing::info;

use crate::db::Database;
use crate::error::{Result, TabletalkError};
use crate::executor;
use crate::extract::extract_statements;
use crate::llm::client::{CompletionClient, CompletionOutcome};
use crate::llm::ChatMessage;
use crate::schema;

/// Reserved token that ends the session at either prompt
pub const QUIT_TOKEN: &str = "q";

/// Fixed system prompt, first in every history
const SYSTEM_PROMPT: &str = "You are a helpful assistant that writes SQL queries \
    in order to answer questions about a database.";

const QUESTION_PROMPT: &str = "What is the initial question? (q to quit)";

const REPLY_PROMPT: &str = "How would you like to respond? Any query results will \
    be automatically sent with your response. (q to quit)";

/// Where the session currently is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Introspecting the schema and building the opening messages
    Initializing,
    /// Waiting for the initial question
    AwaitingQuestion,
    /// Completion call in flight
    Generating,
    /// Pulling statements out of the assistant text
    Extracting,
    /// Running extracted statements
    Executing,
    /// Waiting for the next human line
    AwaitingReply,
    /// Session over; the caller releases the connection
    Terminated,
}

/// Terminal input/output seam
///
/// Synchronous on purpose: prompting blocks the single thread of control,
/// which is exactly the session's suspension model.
pub trait Console {
    /// Ask the human for one line of text
    fn prompt_line(&self, message: &str) -> Result<String>;

    /// Show content to the human
    fn print(&self, content: &str);
}

/// Interactive console over `dialoguer`
pub struct TerminalConsole;

impl Console for TerminalConsole {
    fn prompt_line(&self, message: &str) -> Result<String> {
        dialoguer::Input::<String>::new()
            .with_prompt(message)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| TabletalkError::prompt_failed(format!("Failed to read input: {e}")))
    }

    fn print(&self, content: &str) {
        println!("{content}");
    }
}

/// One conversation over one database connection
pub struct Session<'a> {
    db: &'a dyn Database,
    client: CompletionClient,
    console: &'a dyn Console,
    annotate: bool,
    messages: Vec<ChatMessage>,
    state: SessionState,
}

impl<'a> Session<'a> {
    /// Create a session; nothing happens until [`run`](Self::run)
    pub fn new(
        db: &'a dyn Database,
        client: CompletionClient,
        console: &'a dyn Console,
        annotate: bool,
    ) -> Self {
        Self {
            db,
            client,
            console,
            annotate,
            messages: Vec::new(),
            state: SessionState::Initializing,
        }
    }

    /// Current state-machine value
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The message history so far (system message first)
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Drive the session to termination
    ///
    /// `Ok(())` means the human quit normally. Any `Err` is fatal; the
    /// caller reports it, releases the connection, and exits non-zero.
    pub async fn run(&mut self) -> Result<()> {
        self.state = SessionState::Initializing;
        let description = schema::describe(self.db, self.annotate).await?;
        let schema_text = description.render();

        self.state = SessionState::AwaitingQuestion;
        let question = self.console.prompt_line(QUESTION_PROMPT)?;
        if question == QUIT_TOKEN {
            self.state = SessionState::Terminated;
            return Ok(());
        }

        self.messages.push(ChatMessage::system(SYSTEM_PROMPT));
        self.messages
            .push(ChatMessage::user(initial_prompt(&schema_text, &question)));

        loop {
            self.state = SessionState::Generating;
            self.console.print("Calling the model...");

            let completion = match self.client.complete(&self.messages).await {
                CompletionOutcome::Success(completion) => completion,
                CompletionOutcome::ExhaustedRetries {
                    attempts,
                    last_error,
                } => {
                    self.state = SessionState::Terminated;
                    return Err(TabletalkError::completion_failed(format!(
                        "Gave up after {attempts} attempts: {last_error}"
                    )));
                }
            };

            self.messages
                .push(ChatMessage::assistant(completion.content.clone()));
            self.console
                .print(&format!("\nASSISTANT:\n\n{}\n", completion.content));

            self.state = SessionState::Extracting;
            let statements = extract_statements(&completion.content);
            info!(statements = statements.len(), "statements extracted");

            self.state = SessionState::Executing;
            let outcomes = executor::run_all(self.db, &statements).await;
            for outcome in &outcomes {
                self.console.print(&outcome.summary());
            }
            let result_text = executor::combined_summary(&outcomes);

            self.state = SessionState::AwaitingReply;
            let reply = self.console.prompt_line(REPLY_PROMPT)?;
            if reply == QUIT_TOKEN {
                self.state = SessionState::Terminated;
                return Ok(());
            }

            self.messages
                .push(ChatMessage::user(continuation_message(&reply, &result_text)));
        }
    }
}

/// First user message: preamble, schema, instructions, quoted question
fn initial_prompt(schema_text: &str, question: &str) -> String {
    format!(
        "Hello, I have a database with the following schema:\n\n\
         {schema_text}\n\n\
         I'd like to work with you to answer a question I have. I can run \
         several queries to get the answer, and tell you the results along \
         the way.\n\
         I'd like to use the fewest queries possible, so use joins where you \
         can. If you're not sure what to do, you can ask me questions about \
         the database or run intermediate queries to learn more about the \
         data.\n\n\
         The question I have is:\n\n\
         \"{question}\""
    )
}

/// Continuation message: human text merged with the prior turn's results
///
/// Results ride inside the same user message, never as their own role.
fn continuation_message(reply: &str, result_text: &str) -> String {
    if result_text.is_empty() {
        reply.to_string()
    } else {
        format!("{reply}\n\n{result_text}")
    }
}
