//! Ask command handler.

use clap::Args;
use handbook_core::{config::AppConfig, AppError, AppResult};
use handbook_knowledge::build_answer_queue;

/// Ask a question as an employee with a given role
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Requester role; unknown or missing roles see only general documents
    #[arg(short, long)]
    pub role: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!(role = ?self.role, "Executing ask command");

        config.validate_answering()?;
        let queue = build_answer_queue(config)?;

        let handle = queue.submit(self.question.clone(), self.role.clone());
        let answer = tokio::select! {
            answer = handle.wait() => answer?,
            _ = tokio::signal::ctrl_c() => {
                queue.shutdown();
                return Err(AppError::Cancelled);
            }
        };

        if self.json {
            let output = serde_json::json!({
                "question": self.question,
                "role": self.role,
                "answer": answer,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", answer);
        }

        Ok(())
    }
}
