//! CLI command definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::ContentRequest;

/// Curricula - CP/ATP generation engine
#[derive(Parser)]
#[command(name = "cg", about = "Curriculum content generation engine", version)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one generation session end to end and print the artifacts
    Demo {
        #[command(flatten)]
        request: RequestArgs,

        /// Accept the first result without interactive validation
        #[arg(long)]
        auto_approve: bool,
    },

    /// Analyze a request and print the strategy decision without generating
    Score {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// Print the effective configuration
    Config,
}

/// Request fields shared by demo and score
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Teacher name
    #[arg(long, default_value = "Guru")]
    pub teacher: String,

    /// School name
    #[arg(long, default_value = "Sekolah")]
    pub school: String,

    /// Subject, e.g. matematika
    #[arg(long)]
    pub subject: String,

    /// Grade level (1-12)
    #[arg(long)]
    pub grade: u8,

    /// Curriculum phase, e.g. E
    #[arg(long, default_value = "")]
    pub phase: String,

    /// Topic to cover
    #[arg(long)]
    pub topic: String,

    /// Optional sub-topic
    #[arg(long, default_value = "")]
    pub sub_topic: String,

    /// Time allocation in minutes
    #[arg(long, default_value = "90")]
    pub time_allocation: u32,

    /// Generator model override
    #[arg(long, default_value = "")]
    pub model: String,
}

impl RequestArgs {
    pub fn into_request(self) -> ContentRequest {
        ContentRequest {
            teacher: self.teacher,
            school: self.school,
            subject: self.subject,
            grade: self.grade,
            phase: self.phase,
            topic: self.topic,
            sub_topic: self.sub_topic,
            time_allocation: self.time_allocation,
            model: self.model,
            primary: None,
            secondary: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_score_command() {
        let cli = Cli::parse_from([
            "cg",
            "score",
            "--subject",
            "matematika",
            "--grade",
            "10",
            "--topic",
            "aljabar linear",
        ]);
        match cli.command {
            Command::Score { request } => {
                let request = request.into_request();
                assert_eq!(request.subject, "matematika");
                assert_eq!(request.grade, 10);
                assert_eq!(request.time_allocation, 90);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_demo_with_auto_approve() {
        let cli = Cli::parse_from([
            "cg",
            "demo",
            "--subject",
            "fisika",
            "--grade",
            "8",
            "--topic",
            "gaya",
            "--auto-approve",
        ]);
        match cli.command {
            Command::Demo { auto_approve, .. } => assert!(auto_approve),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
