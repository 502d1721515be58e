//! Command-line surface: argument parsing and the interactive clarification loop.

use std::io::{BufRead, Write};

use clap::Parser;
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::error::Result;
use crate::service::{Solve, SolveResponse};

pub const BANNER: &str = "Savant: An intelligent optimization problem solver";

#[derive(Parser, Debug)]
#[command(name = "savant", version)]
#[command(about = "Savant CLI - An intelligent optimization problem solver.")]
#[command(long_about = "Savant CLI - An intelligent optimization problem solver.

Examples:
  savant -p \"Minimize x+y subject to x>=0, y>=0, x+y<=10\"
  savant --web
  savant --mcp")]
pub struct Cli {
    /// Optimization problem description
    #[arg(short, long)]
    pub problem: Option<String>,

    /// Run web interface
    #[arg(short, long)]
    pub web: bool,

    /// Run as Model Context Protocol server
    #[arg(short, long)]
    pub mcp: bool,

    /// Port for web interface (defaults to SAVANT_PORT or 8000)
    #[arg(long)]
    pub port: Option<u16>,

    /// Print the assembled ASP program after the solution
    #[arg(long)]
    pub show_program: bool,
}

/// Which front end to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Mcp,
    Web { port: Option<u16> },
    Solve { problem: String, show_program: bool },
    Banner,
}

impl Cli {
    /// `--mcp` wins over `--web`, which wins over `--problem`
    pub fn mode(&self) -> Mode {
        if self.mcp {
            Mode::Mcp
        } else if self.web {
            Mode::Web { port: self.port }
        } else if let Some(problem) = self.problem.clone() {
            Mode::Solve {
                problem,
                show_program: self.show_program,
            }
        } else {
            Mode::Banner
        }
    }
}

pub fn print_banner<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "{}", BANNER)?;
    writeln!(out, "Use --help for more information")?;
    Ok(())
}

/// Read one non-empty answer; `None` on end of input
fn prompt_answer<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<Option<String>> {
    loop {
        write!(out, "Please provide the missing information: ")?;
        out.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let answer = line.trim();
        if !answer.is_empty() {
            return Ok(Some(answer.to_string()));
        }
    }
}

/// Run blocking terminal I/O without stalling other tasks on a multi-threaded runtime
fn blocking_io<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Solve a problem from the command line, asking the user for missing information.
///
/// Answers accumulate across rounds. Returns the process exit code.
pub async fn run_interactive<S, R, W, E>(
    solver: &S,
    problem: &str,
    max_rounds: u32,
    show_program: bool,
    input: &mut R,
    out: &mut W,
    err: &mut E,
) -> Result<i32>
where
    S: Solve + ?Sized,
    R: BufRead,
    W: Write,
    E: Write,
{
    let mut answers: Vec<String> = Vec::new();
    let mut rounds = 0u32;

    loop {
        let additional_info = answers.join("\n");
        match solver.solve(problem, &additional_info).await {
            SolveResponse::NeedsMoreInfo { questions } => {
                if rounds >= max_rounds {
                    writeln!(
                        err,
                        "Error: still missing information after {} clarification rounds",
                        rounds
                    )?;
                    return Ok(1);
                }
                rounds += 1;

                writeln!(out, "I need more information to solve this problem:")?;
                for (i, question) in questions.iter().enumerate() {
                    writeln!(out, "{}. {}", i + 1, question)?;
                }
                match blocking_io(|| prompt_answer(&mut *input, &mut *out))? {
                    Some(answer) => answers.push(answer),
                    None => {
                        writeln!(out)?;
                        writeln!(err, "Error: no answer provided")?;
                        return Ok(1);
                    }
                }
            }
            SolveResponse::Failed { error } => {
                writeln!(err, "Error: {}", error)?;
                return Ok(1);
            }
            SolveResponse::Solved { solution, program } => {
                writeln!(out, "Solution found:")?;
                writeln!(out, "{}", solution)?;
                if show_program {
                    writeln!(out)?;
                    writeln!(out, "ASP program:")?;
                    writeln!(out, "{}", program.trim_end())?;
                }
                return Ok(0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_select_mode() {
        let cli = Cli::parse_from(["savant", "-p", "knapsack", "--show-program"]);
        assert_eq!(
            cli.mode(),
            Mode::Solve {
                problem: "knapsack".into(),
                show_program: true
            }
        );

        let cli = Cli::parse_from(["savant", "--web", "--port", "9000", "-p", "x"]);
        assert_eq!(cli.mode(), Mode::Web { port: Some(9000) });

        let cli = Cli::parse_from(["savant", "-m", "-w"]);
        assert_eq!(cli.mode(), Mode::Mcp);

        let cli = Cli::parse_from(["savant"]);
        assert_eq!(cli.mode(), Mode::Banner);
    }

    #[test]
    fn help_mentions_examples() {
        use clap::CommandFactory;
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("Savant CLI"));
        assert!(help.contains("savant --mcp"));
    }

    #[test]
    fn banner_text() {
        let mut out = Vec::new();
        print_banner(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Savant:"));
        assert!(text.contains("--help"));
    }

    #[test]
    fn blank_answers_are_re_prompted() {
        let mut input = std::io::Cursor::new("\n  \ncapacity is 10\n");
        let mut out = Vec::new();
        let answer = prompt_answer(&mut input, &mut out).unwrap();
        assert_eq!(answer.as_deref(), Some("capacity is 10"));
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("Please provide").count(), 3);
    }
}
